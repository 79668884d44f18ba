//! Cart commands.

use anyhow::{Context, Result};
use storefront::config::Config;

use crate::CartAction;

pub(crate) async fn execute(config: Config, action: CartAction) -> Result<()> {
    let storefront = super::open(config)?;

    match action {
        CartAction::Show => {
            super::print_cart(&storefront.cart().items());
        },
        CartAction::Clear => {
            storefront.cart().clear();
            // Otherwise the next login would adopt the non-empty server cart
            storefront
                .push_cart()
                .await
                .context("Cart cleared locally but the server cart could not be cleared")?;
            println!("Carrito vaciado");
        },
    }

    Ok(())
}

pub(crate) async fn checkout(config: Config) -> Result<()> {
    let storefront = super::open(config)?;
    let session = storefront
        .execute_checkout()
        .await
        .context("Failed to create checkout session")?;

    println!("Completa el pago en: {}", session.url);
    Ok(())
}
