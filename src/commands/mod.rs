pub(crate) mod cache;
pub(crate) mod cart;
pub(crate) mod catalog;
pub(crate) mod session;
pub(crate) mod shell;

use anyhow::{Context, Result};
use storefront::Storefront;
use storefront::config::Config;
use storefront::model::CartItem;

/// Opens the client, attaching the config location to any failure.
pub(crate) fn open(config: Config) -> Result<Storefront> {
    Storefront::open(config).context("Failed to open local storefront state")
}

/// Reads one line from stdin after printing `prompt`.
pub(crate) fn prompt_line(prompt: &str) -> Result<String> {
    use std::io::Write;

    print!("{prompt}");
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub(crate) fn print_cart(items: &[CartItem]) {
    if items.is_empty() {
        println!("El carrito está vacío");
        return;
    }
    for item in items {
        println!(
            "  {:>3} x {:<32} {:>10.2}",
            item.quantity,
            item.product.name,
            item.line_total()
        );
    }
    let subtotal: f64 = items.iter().map(CartItem::line_total).sum();
    println!("  {:>49.2}", subtotal);
}
