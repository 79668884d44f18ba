//! Catalog reads through the offline cache, with invalidation on writes.
//!
//! Reads are served by [`OfflineCache::fetch_with_cache`] so the storefront
//! keeps browsing offline or when the backend is down. Writes always go to
//! the backend and, on success, drop every cached listing they could have
//! changed. A category or discount edit changes the denormalized fields of
//! the product listing too.

use crate::Result;
use crate::api::{AdminApi, CatalogApi};
use crate::cache::{FetchOptions, OfflineCache};
use crate::model::{
    Category, CategoryDraft, Discount, DiscountDraft, Product, ProductDraft, ProductId, Role,
    RoleDraft, SalesPoint,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache keys, relative to the cache prefix.
pub mod keys {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const DISCOUNTS: &str = "discounts";
    pub const ROLES: &str = "roles";
    pub const SALES_HISTORY: &str = "sales_history";
}

#[derive(Clone)]
pub struct CatalogService {
    cache: OfflineCache,
    catalog: Arc<dyn CatalogApi>,
    admin: Arc<dyn AdminApi>,
    ttl: Duration,
}

impl CatalogService {
    /// Reads are cached for the cache's default ttl.
    pub fn new(cache: OfflineCache, catalog: Arc<dyn CatalogApi>, admin: Arc<dyn AdminApi>) -> Self {
        let ttl = cache.default_ttl();
        Self {
            cache,
            catalog,
            admin,
            ttl,
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub const fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    // =========================================================================
    // Cached reads
    // =========================================================================

    pub async fn products(&self) -> Result<Vec<Product>> {
        let api = Arc::clone(&self.catalog);
        self.cache
            .fetch_with_cache(
                keys::PRODUCTS,
                || async move { api.list_products().await },
                self.ttl,
                FetchOptions::default(),
            )
            .await
    }

    /// Product listing straight from the backend, refreshing the cache.
    pub async fn refresh_products(&self) -> Result<Vec<Product>> {
        let api = Arc::clone(&self.catalog);
        self.cache
            .fetch_with_cache(
                keys::PRODUCTS,
                || async move { api.list_products().await },
                self.ttl,
                FetchOptions::no_fallback(),
            )
            .await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let api = Arc::clone(&self.catalog);
        self.cache
            .fetch_with_cache(
                keys::CATEGORIES,
                || async move { api.list_categories().await },
                self.ttl,
                FetchOptions::default(),
            )
            .await
    }

    pub async fn discounts(&self) -> Result<Vec<Discount>> {
        let api = Arc::clone(&self.catalog);
        self.cache
            .fetch_with_cache(
                keys::DISCOUNTS,
                || async move { api.list_discounts().await },
                self.ttl,
                FetchOptions::default(),
            )
            .await
    }

    pub async fn roles(&self) -> Result<Vec<Role>> {
        let api = Arc::clone(&self.admin);
        self.cache
            .fetch_with_cache(
                keys::ROLES,
                || async move { api.list_roles().await },
                self.ttl,
                FetchOptions::default(),
            )
            .await
    }

    pub async fn sales_history(&self) -> Result<Vec<SalesPoint>> {
        let api = Arc::clone(&self.admin);
        self.cache
            .fetch_with_cache(
                keys::SALES_HISTORY,
                || async move { api.sales_history().await },
                self.ttl,
                FetchOptions::default(),
            )
            .await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        let product = self.catalog.create_product(draft).await?;
        self.invalidate(&[keys::PRODUCTS]);
        Ok(product)
    }

    pub async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<Product> {
        let product = self.catalog.update_product(id, draft).await?;
        self.invalidate(&[keys::PRODUCTS]);
        Ok(product)
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.catalog.delete_product(id).await?;
        self.invalidate(&[keys::PRODUCTS]);
        Ok(())
    }

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
        let category = self.catalog.create_category(draft).await?;
        self.invalidate(&[keys::CATEGORIES, keys::PRODUCTS]);
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, draft: &CategoryDraft) -> Result<Category> {
        let category = self.catalog.update_category(id, draft).await?;
        self.invalidate(&[keys::CATEGORIES, keys::PRODUCTS]);
        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.catalog.delete_category(id).await?;
        self.invalidate(&[keys::CATEGORIES, keys::PRODUCTS]);
        Ok(())
    }

    pub async fn create_discount(&self, draft: &DiscountDraft) -> Result<Discount> {
        let discount = self.catalog.create_discount(draft).await?;
        self.invalidate(&[keys::DISCOUNTS, keys::PRODUCTS]);
        Ok(discount)
    }

    pub async fn update_discount(&self, id: i64, draft: &DiscountDraft) -> Result<Discount> {
        let discount = self.catalog.update_discount(id, draft).await?;
        self.invalidate(&[keys::DISCOUNTS, keys::PRODUCTS]);
        Ok(discount)
    }

    pub async fn delete_discount(&self, id: i64) -> Result<()> {
        self.catalog.delete_discount(id).await?;
        self.invalidate(&[keys::DISCOUNTS, keys::PRODUCTS]);
        Ok(())
    }

    pub async fn create_role(&self, draft: &RoleDraft) -> Result<Role> {
        let role = self.admin.create_role(draft).await?;
        self.invalidate(&[keys::ROLES]);
        Ok(role)
    }

    fn invalidate(&self, keys: &[&str]) {
        debug!(?keys, "Invalidating cached listings");
        self.cache.invalidate_cache_keys(keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::clock::ManualClock;
    use crate::model::{
        Invoice, NewUser, OperationLog, ReportOutput, ReportRequest, User,
    };
    use crate::network::ManualNetwork;
    use crate::storage::MemoryBackend;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn product(id: ProductId, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            description: None,
            price: 50.0,
            discount_percentage: None,
            discounted_price: None,
            stock: 1,
            category_id: Some(1),
            category_name: Some("Computo".to_string()),
            image_url: None,
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        products: Mutex<Vec<Product>>,
        list_calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl FakeBackend {
        fn check(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::backend(503, "unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CatalogApi for FakeBackend {
        async fn list_products(&self) -> Result<Vec<Product>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.products.lock().clone())
        }

        async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
            self.check()?;
            let mut products = self.products.lock();
            let created = product(products.len() as i64 + 1, &draft.name);
            products.push(created.clone());
            Ok(created)
        }

        async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<Product> {
            self.check()?;
            Ok(product(id, &draft.name))
        }

        async fn delete_product(&self, id: ProductId) -> Result<()> {
            self.check()?;
            self.products.lock().retain(|p| p.id != id);
            Ok(())
        }

        async fn list_categories(&self) -> Result<Vec<Category>> {
            self.check()?;
            Ok(vec![Category {
                id: 1,
                name: "Computo".to_string(),
                description: None,
            }])
        }

        async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
            self.check()?;
            Ok(Category {
                id: 2,
                name: draft.name.clone(),
                description: None,
            })
        }

        async fn update_category(&self, id: i64, draft: &CategoryDraft) -> Result<Category> {
            self.check()?;
            Ok(Category {
                id,
                name: draft.name.clone(),
                description: None,
            })
        }

        async fn delete_category(&self, _id: i64) -> Result<()> {
            self.check()
        }

        async fn list_discounts(&self) -> Result<Vec<Discount>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn create_discount(&self, _draft: &DiscountDraft) -> Result<Discount> {
            Err(Error::backend(501, "not implemented"))
        }

        async fn update_discount(&self, _id: i64, _draft: &DiscountDraft) -> Result<Discount> {
            Err(Error::backend(501, "not implemented"))
        }

        async fn delete_discount(&self, _id: i64) -> Result<()> {
            self.check()
        }
    }

    #[async_trait]
    impl AdminApi for FakeBackend {
        async fn list_users(&self) -> Result<Vec<User>> {
            Ok(Vec::new())
        }

        async fn create_user(&self, _user: &NewUser) -> Result<User> {
            Err(Error::backend(501, "not implemented"))
        }

        async fn list_roles(&self) -> Result<Vec<Role>> {
            self.check()?;
            Ok(vec![Role {
                id: 1,
                name: "admin".to_string(),
                permissions: vec!["products:write".to_string()],
            }])
        }

        async fn create_role(&self, draft: &RoleDraft) -> Result<Role> {
            self.check()?;
            Ok(Role {
                id: 2,
                name: draft.name.clone(),
                permissions: draft.permissions.clone(),
            })
        }

        async fn list_invoices(&self) -> Result<Vec<Invoice>> {
            Ok(Vec::new())
        }

        async fn sales_history(&self) -> Result<Vec<SalesPoint>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn sales_predictions(&self) -> Result<Vec<SalesPoint>> {
            Ok(Vec::new())
        }

        async fn retrain_model(&self) -> Result<()> {
            Ok(())
        }

        async fn operations_log(&self) -> Result<Vec<OperationLog>> {
            Ok(Vec::new())
        }

        async fn request_report(&self, _request: &ReportRequest) -> Result<ReportOutput> {
            Err(Error::backend(501, "not implemented"))
        }
    }

    struct Fixture {
        backend: Arc<FakeBackend>,
        network: Arc<ManualNetwork>,
        clock: Arc<ManualClock>,
        service: CatalogService,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(FakeBackend::default());
        backend.products.lock().push(product(1, "Laptop"));
        let network = Arc::new(ManualNetwork::new(true));
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = OfflineCache::new(
            Arc::new(MemoryBackend::new()),
            clock.clone(),
            network.clone(),
            "offline_cache_",
            Duration::from_secs(600),
        );
        let service = CatalogService::new(cache, backend.clone(), backend.clone());
        Fixture {
            backend,
            network,
            clock,
            service,
        }
    }

    fn draft(name: &str) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: None,
            price: 10.0,
            stock: 3,
            category_id: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_products_served_offline_from_cache() {
        let f = fixture();
        assert_eq!(f.service.products().await.unwrap().len(), 1);

        f.network.set_online(false);
        let offline = f.service.products().await.unwrap();

        assert_eq!(offline[0].name, "Laptop");
        assert_eq!(f.backend.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_cache() {
        let f = fixture();
        f.service.products().await.unwrap();

        f.backend.fail.store(true, Ordering::SeqCst);
        let products = f.service.products().await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(f.backend.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_does_not_fall_back() {
        let f = fixture();
        f.service.products().await.unwrap();
        f.backend.fail.store(true, Ordering::SeqCst);

        let err = f.service.refresh_products().await.unwrap_err();
        assert!(matches!(err, Error::Backend { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_expired_listing_is_not_a_fallback() {
        let f = fixture();
        f.service.products().await.unwrap();
        f.clock.advance(Duration::from_secs(601));
        f.backend.fail.store(true, Ordering::SeqCst);

        assert!(f.service.products().await.is_err());
    }

    #[tokio::test]
    async fn test_product_mutation_invalidates_listing() {
        let f = fixture();
        f.service.products().await.unwrap();

        let created = f.service.create_product(&draft("Mouse")).await.unwrap();
        assert_eq!(created.id, 2);

        // Offline with no cached listing the fetcher still runs
        f.network.set_online(false);
        let products = f.service.products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(f.backend.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_category_mutation_invalidates_products_and_categories() {
        let f = fixture();
        f.service.products().await.unwrap();
        f.service.categories().await.unwrap();

        f.service
            .update_category(
                1,
                &CategoryDraft {
                    name: "Laptops".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        assert!(f.service.cache().read_cached::<Vec<Product>>(keys::PRODUCTS, Duration::from_secs(600)).is_none());
        assert!(f.service.cache().read_cached::<Vec<Category>>(keys::CATEGORIES, Duration::from_secs(600)).is_none());
    }

    #[tokio::test]
    async fn test_discount_mutation_invalidates_products_and_discounts() {
        let f = fixture();
        f.service.products().await.unwrap();
        f.service.discounts().await.unwrap();
        f.service.categories().await.unwrap();

        f.service.delete_discount(9).await.unwrap();

        let ttl = Duration::from_secs(600);
        assert!(f.service.cache().read_cached::<Vec<Product>>(keys::PRODUCTS, ttl).is_none());
        assert!(f.service.cache().read_cached::<Vec<Discount>>(keys::DISCOUNTS, ttl).is_none());
        assert!(f.service.cache().read_cached::<Vec<Category>>(keys::CATEGORIES, ttl).is_some());
    }

    #[tokio::test]
    async fn test_failed_mutation_propagates_and_keeps_cache() {
        let f = fixture();
        f.service.products().await.unwrap();
        f.backend.fail.store(true, Ordering::SeqCst);

        let err = f.service.delete_product(1).await.unwrap_err();
        assert!(err.is_retryable());

        let ttl = Duration::from_secs(600);
        assert!(f.service.cache().read_cached::<Vec<Product>>(keys::PRODUCTS, ttl).is_some());
    }

    #[tokio::test]
    async fn test_roles_cached_and_invalidated() {
        let f = fixture();
        assert_eq!(f.service.roles().await.unwrap().len(), 1);

        f.service
            .create_role(&RoleDraft {
                name: "vendedor".to_string(),
                permissions: Vec::new(),
            })
            .await
            .unwrap();

        let ttl = Duration::from_secs(600);
        assert!(f.service.cache().read_cached::<Vec<Role>>(keys::ROLES, ttl).is_none());
    }

    #[tokio::test]
    async fn test_custom_ttl_applies_to_reads() {
        let f = fixture();
        let service = f.service.clone().with_ttl(Duration::from_secs(30));
        service.products().await.unwrap();

        f.clock.advance(Duration::from_secs(31));
        f.backend.fail.store(true, Ordering::SeqCst);
        assert!(service.products().await.is_err());
    }
}
