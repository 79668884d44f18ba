//! Interactive cart assistant.
//!
//! One instruction per line. A bare number answers a pending "which one?"
//! question. Lines starting with `:` are shell commands.

use anyhow::{Context, Result};
use storefront::{Error, Storefront};
use storefront::assistant::{CommandInterpreter, Outcome};
use storefront::config::Config;
use storefront::model::Product;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

const HELP: &str = "\
Instrucciones:
  agregar <producto> [cantidad]   quitar <producto>
  vaciar carrito                  pagar
Comandos:
  :cart    muestra el carrito     :sync   estado de sincronización
  :reload  recarga el catálogo    :quit   salir";

pub(crate) async fn execute(config: Config) -> Result<()> {
    let storefront = super::open(config)?;

    if storefront.session().is_authenticated() && !storefront.revalidate_session().await {
        println!("La sesión expiró; continúas como invitado.");
    }
    if let Some(user) = storefront.session().user() {
        println!("Hola, {}.", user.username);
    }

    let sync = storefront.start_sync();
    let mut interpreter = storefront.interpreter()?;
    let mut catalog = load_catalog(&storefront, Vec::new()).await;

    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await.context("Failed to write prompt")?;
        stdout.flush().await.context("Failed to flush stdout")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            ":quit" | ":q" | ":salir" => break,
            ":help" | ":ayuda" => {
                println!("{HELP}");
                continue;
            },
            ":cart" | ":carrito" => {
                super::print_cart(&storefront.cart().items());
                continue;
            },
            ":sync" => {
                let stats = sync.stats();
                println!(
                    "{:?} (bootstraps {}, pushes {}, failed pushes {})",
                    sync.current_phase(),
                    stats.bootstraps,
                    stats.pushes,
                    stats.push_failures
                );
                continue;
            },
            ":reload" => {
                catalog = load_catalog(&storefront, catalog).await;
                println!("{} productos en el catálogo", catalog.len());
                continue;
            },
            _ => {},
        }

        let outcome = match selection(&interpreter, input) {
            Some(index) => interpreter.select(index),
            None => {
                catalog = load_catalog(&storefront, catalog).await;
                interpreter.interpret(input, &catalog)
            },
        };
        respond(&storefront, &interpreter, &outcome).await;
    }

    // Push the final cart ourselves; the debounce timer dies with the task.
    // Only after a completed bootstrap, so an unreconciled local cart never
    // overwrites the server's.
    let synced = sync.current_phase().is_synced();
    sync.shutdown().await;
    if synced && let Err(e) = storefront.push_cart().await {
        warn!(error = %e, "Final cart push failed");
        eprintln!("No se pudo sincronizar el carrito: {e}");
    }

    Ok(())
}

/// A bare number while a question is pending picks a candidate (1-based).
fn selection(interpreter: &CommandInterpreter, input: &str) -> Option<usize> {
    interpreter.pending()?;
    let n: usize = input.parse().ok()?;
    Some(n.checked_sub(1).unwrap_or(usize::MAX))
}

async fn respond(storefront: &Storefront, interpreter: &CommandInterpreter, outcome: &Outcome) {
    println!("{}", outcome.message());

    match outcome {
        Outcome::CheckoutRequested => match storefront.execute_checkout().await {
            Ok(session) => println!("Completa el pago en: {}", session.url),
            Err(Error::Unauthenticated) => {
                println!("Inicia sesión para pagar (storefront login <usuario>)");
            },
            Err(e) => println!("No se pudo iniciar el pago: {e}"),
        },
        Outcome::InvalidSelection { .. } if interpreter.pending().is_some() => {
            println!("(o escribe otra instrucción)");
        },
        _ => {},
    }
}

/// Fresh catalog through the cache, or `previous` when it cannot be loaded.
async fn load_catalog(storefront: &Storefront, previous: Vec<Product>) -> Vec<Product> {
    match storefront.catalog().products().await {
        Ok(products) => products,
        Err(e) => {
            warn!(error = %e, "Catalog unavailable, keeping last known products");
            if previous.is_empty() {
                println!("No se pudo cargar el catálogo: {e}");
            }
            previous
        },
    }
}
