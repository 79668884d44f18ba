//! Session commands: login, register, logout, whoami.

use anyhow::{Context, Result};
use storefront::config::Config;
use storefront::model::Registration;

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => super::prompt_line("Password: "),
    }
}

pub(crate) async fn login(config: Config, username: &str, password: Option<String>) -> Result<()> {
    let storefront = super::open(config)?;
    let password = password_or_prompt(password)?;

    let user = storefront
        .login(username, &password)
        .await
        .with_context(|| format!("Login failed for '{username}'"))?;

    println!("Logged in as {} (id {})", user.username, user.id);
    Ok(())
}

pub(crate) async fn register(
    config: Config,
    username: String,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let storefront = super::open(config)?;
    let password = password_or_prompt(password)?;

    let registration = Registration {
        username,
        email,
        password,
    };
    let user = storefront
        .register(&registration)
        .await
        .context("Registration failed")?;

    println!("Registered and logged in as {} (id {})", user.username, user.id);
    Ok(())
}

pub(crate) async fn logout(config: Config) -> Result<()> {
    let storefront = super::open(config)?;
    if !storefront.session().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    storefront.logout().await;
    println!("Logged out.");
    Ok(())
}

pub(crate) async fn whoami(config: Config) -> Result<()> {
    let storefront = super::open(config)?;
    if !storefront.session().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }

    if !storefront.revalidate_session().await {
        println!("Session expired; logged out.");
        return Ok(());
    }

    if let Some(user) = storefront.session().user() {
        println!("{} (id {})", user.username, user.id);
        if !user.email.is_empty() {
            println!("  Email: {}", user.email);
        }
        if let Some(role) = &user.role_name {
            println!("  Role:  {role}");
        }
        if !user.permissions.is_empty() {
            println!("  Permissions: {}", user.permissions.join(", "));
        }
    }
    Ok(())
}
