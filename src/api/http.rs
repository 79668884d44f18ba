//! REST implementation of the backend traits.

use super::report::{default_filename, filename_from_content_disposition};
use super::{AdminApi, ApiClient, AuthApi, CartApi, CatalogApi, CheckoutApi};
use crate::Result;
use crate::model::{
    AuthResponse, CartItem, CartLine, Category, CategoryDraft, CheckoutSession, Discount,
    DiscountDraft, Invoice, NewUser, OperationLog, Product, ProductDraft, ProductId,
    Registration, ReportOutput, ReportRequest, Role, RoleDraft, SalesPoint, ServerCart, User,
};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Backend reached over HTTP through a shared [`ApiClient`].
#[derive(Clone)]
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.client
            .send_json(self.client.request(Method::GET, path))
            .await
    }

    async fn send_body<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        self.client
            .send_json(self.client.request(method, path).json(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.client
            .send(self.client.request(Method::DELETE, path))
            .await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CartBody<'a> {
    items: &'a [CartLine],
}

#[derive(Deserialize)]
struct SummaryBody {
    #[serde(alias = "result", alias = "text")]
    summary: String,
}

#[async_trait]
impl AuthApi for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        self.send_body(Method::POST, "/auth/login", &LoginBody { username, password })
            .await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
        self.send_body(Method::POST, "/auth/register", registration)
            .await
    }

    async fn me(&self) -> Result<User> {
        self.get("/auth/me").await
    }

    async fn logout(&self) -> Result<()> {
        self.client
            .send(self.client.request(Method::POST, "/auth/logout"))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartApi for HttpBackend {
    async fn fetch_cart(&self) -> Result<Vec<CartItem>> {
        let cart: ServerCart = self.get("/cart").await?;
        Ok(cart.items)
    }

    async fn replace_cart(&self, lines: &[CartLine]) -> Result<Vec<CartItem>> {
        let cart: ServerCart = self
            .send_body(Method::PUT, "/cart", &CartBody { items: lines })
            .await?;
        Ok(cart.items)
    }
}

#[async_trait]
impl CatalogApi for HttpBackend {
    async fn list_products(&self) -> Result<Vec<Product>> {
        self.get("/products").await
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        self.send_body(Method::POST, "/products", draft).await
    }

    async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<Product> {
        self.send_body(Method::PUT, &format!("/products/{id}"), draft)
            .await
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.delete(&format!("/products/{id}")).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get("/categories").await
    }

    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
        self.send_body(Method::POST, "/categories", draft).await
    }

    async fn update_category(&self, id: i64, draft: &CategoryDraft) -> Result<Category> {
        self.send_body(Method::PUT, &format!("/categories/{id}"), draft)
            .await
    }

    async fn delete_category(&self, id: i64) -> Result<()> {
        self.delete(&format!("/categories/{id}")).await
    }

    async fn list_discounts(&self) -> Result<Vec<Discount>> {
        self.get("/discounts").await
    }

    async fn create_discount(&self, draft: &DiscountDraft) -> Result<Discount> {
        self.send_body(Method::POST, "/discounts", draft).await
    }

    async fn update_discount(&self, id: i64, draft: &DiscountDraft) -> Result<Discount> {
        self.send_body(Method::PUT, &format!("/discounts/{id}"), draft)
            .await
    }

    async fn delete_discount(&self, id: i64) -> Result<()> {
        self.delete(&format!("/discounts/{id}")).await
    }
}

#[async_trait]
impl CheckoutApi for HttpBackend {
    async fn create_checkout_session(&self, lines: &[CartLine]) -> Result<CheckoutSession> {
        self.send_body(Method::POST, "/checkout/session", &CartBody { items: lines })
            .await
    }
}

#[async_trait]
impl AdminApi for HttpBackend {
    async fn list_users(&self) -> Result<Vec<User>> {
        self.get("/users").await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.send_body(Method::POST, "/users", user).await
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.get("/roles").await
    }

    async fn create_role(&self, role: &RoleDraft) -> Result<Role> {
        self.send_body(Method::POST, "/roles", role).await
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        self.get("/invoices").await
    }

    async fn sales_history(&self) -> Result<Vec<SalesPoint>> {
        self.get("/sales/history").await
    }

    async fn sales_predictions(&self) -> Result<Vec<SalesPoint>> {
        self.get("/sales/predictions").await
    }

    async fn retrain_model(&self) -> Result<()> {
        self.client
            .send(self.client.request(Method::POST, "/sales/retrain"))
            .await?;
        Ok(())
    }

    async fn operations_log(&self) -> Result<Vec<OperationLog>> {
        self.get("/logs").await
    }

    async fn request_report(&self, request: &ReportRequest) -> Result<ReportOutput> {
        let response = self
            .client
            .send(self.client.request(Method::POST, "/reports").json(request))
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if content_type.starts_with("application/json") {
            let body: SummaryBody = response.json().await?;
            return Ok(ReportOutput::Summary(body.summary));
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| default_filename(&content_type));
        let bytes = response.bytes().await?.to_vec();

        Ok(ReportOutput::File {
            filename,
            content_type,
            bytes,
        })
    }
}
