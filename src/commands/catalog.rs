//! Product listing through the offline cache.

use anyhow::{Context, Result};
use storefront::assistant::normalize;
use storefront::config::Config;

pub(crate) async fn execute(config: Config, filter: &[String], refresh: bool) -> Result<()> {
    let storefront = super::open(config)?;

    let products = if refresh {
        storefront.catalog().refresh_products().await
    } else {
        storefront.catalog().products().await
    }
    .context("Failed to load products")?;

    let words: Vec<String> = filter.iter().map(|w| normalize(w)).collect();
    let mut shown = 0usize;
    for product in &products {
        let name = normalize(&product.name);
        if !words.iter().all(|w| name.contains(w.as_str())) {
            continue;
        }
        shown += 1;
        let price = match product.discounted_price {
            Some(discounted) => format!("{discounted:.2} (antes {:.2})", product.price),
            None => format!("{:.2}", product.price),
        };
        println!("  #{:<5} {:<32} {price:>20}  stock {}", product.id, product.name, product.stock);
    }

    if shown == 0 {
        println!("No products found.");
    }
    Ok(())
}
