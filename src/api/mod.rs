//! Typed client for the external REST backend.
//!
//! The backend owns all durable state. This module defines one
//! `async_trait` per concern, so the stores and the sync process depend
//! on the narrow surface they use and tests substitute in-memory fakes:
//!
//! - [`AuthApi`] - login, registration, "who am I", logout
//! - [`CartApi`] - fetch and replace the authenticated user's cart
//! - [`CatalogApi`] - products, categories, discounts
//! - [`CheckoutApi`] - payment session creation
//! - [`AdminApi`] - users, roles, invoices, sales, operations log, reports
//!
//! [`HttpBackend`] implements all of them over [`ApiClient`].

mod client;
mod http;
mod report;

pub use client::ApiClient;
pub use http::HttpBackend;
pub use report::filename_from_content_disposition;

use crate::Result;
use crate::model::{
    AuthResponse, CartItem, CartLine, Category, CategoryDraft, CheckoutSession, Discount,
    DiscountDraft, Invoice, NewUser, OperationLog, Product, ProductDraft, ProductId,
    Registration, ReportOutput, ReportRequest, Role, RoleDraft, SalesPoint, User,
};
use async_trait::async_trait;

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse>;
    async fn register(&self, registration: &Registration) -> Result<AuthResponse>;
    /// Revalidates the current bearer token.
    async fn me(&self) -> Result<User>;
    async fn logout(&self) -> Result<()>;
}

#[async_trait]
pub trait CartApi: Send + Sync {
    /// The authenticated user's server cart.
    async fn fetch_cart(&self) -> Result<Vec<CartItem>>;
    /// Replaces the server cart and returns what the server accepted.
    async fn replace_cart(&self, lines: &[CartLine]) -> Result<Vec<CartItem>>;
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>>;
    async fn create_product(&self, draft: &ProductDraft) -> Result<Product>;
    async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<Product>;
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category>;
    async fn update_category(&self, id: i64, draft: &CategoryDraft) -> Result<Category>;
    async fn delete_category(&self, id: i64) -> Result<()>;

    async fn list_discounts(&self) -> Result<Vec<Discount>>;
    async fn create_discount(&self, draft: &DiscountDraft) -> Result<Discount>;
    async fn update_discount(&self, id: i64, draft: &DiscountDraft) -> Result<Discount>;
    async fn delete_discount(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait CheckoutApi: Send + Sync {
    async fn create_checkout_session(&self, lines: &[CartLine]) -> Result<CheckoutSession>;
}

#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, user: &NewUser) -> Result<User>;
    async fn list_roles(&self) -> Result<Vec<Role>>;
    async fn create_role(&self, role: &RoleDraft) -> Result<Role>;
    async fn list_invoices(&self) -> Result<Vec<Invoice>>;
    async fn sales_history(&self) -> Result<Vec<SalesPoint>>;
    async fn sales_predictions(&self) -> Result<Vec<SalesPoint>>;
    async fn retrain_model(&self) -> Result<()>;
    async fn operations_log(&self) -> Result<Vec<OperationLog>>;
    async fn request_report(&self, request: &ReportRequest) -> Result<ReportOutput>;
}
