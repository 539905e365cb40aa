//! Product service - Listing management and browsing.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Actor, NewProduct, Product, ProductPatch};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{ProductFilter, UnitOfWork};
use crate::types::{Paginated, PaginationParams};
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductService: Send + Sync {
    /// List a new product. A plain user becomes an owner.
    async fn create(&self, actor: Actor, fields: NewProduct) -> AppResult<Product>;

    /// Get an active product
    async fn get(&self, id: Uuid) -> AppResult<Product>;

    /// Browse active products, newest first
    async fn search(
        &self,
        filter: ProductFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<Product>>;

    /// Active products of one owner
    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Product>>;

    /// Edit a listing. Owner or admin only.
    async fn update(&self, actor: Actor, id: Uuid, patch: ProductPatch) -> AppResult<Product>;

    /// Open or close a listing for new requests. Owner or admin only.
    async fn set_availability(&self, actor: Actor, id: Uuid, available: bool)
        -> AppResult<Product>;

    /// Soft delete a listing without open rentals. Owner or admin only.
    async fn delete(&self, actor: Actor, id: Uuid) -> AppResult<()>;
}

pub struct ProductManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ProductManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> ProductService for ProductManager<U> {
    async fn create(&self, actor: Actor, fields: NewProduct) -> AppResult<Product> {
        let product = Product::new(actor.id, fields)?;

        let created = with_transaction!(self.uow, |tx| {
            let mut owner = tx.find_user(actor.id).await?.ok_or(AppError::Unauthorized)?;
            if owner.promote_to_owner() {
                tx.update_user(&owner).await?;
            }
            tx.insert_product(&product).await?;
            Ok(product)
        })?;

        tracing::info!(product_id = %created.id, owner_id = %actor.id, "Product listed");
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> AppResult<Product> {
        self.uow.products().find_by_id(id).await?.ok_or_not_found()
    }

    async fn search(
        &self,
        filter: ProductFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<Product>> {
        let (page_number, per_page) = (page.page.max(1), page.limit());
        let (data, total) = self.uow.products().search(filter, page).await?;
        Ok(Paginated::new(data, page_number, per_page, total))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Product>> {
        self.uow.products().list_by_owner(owner_id).await
    }

    async fn update(&self, actor: Actor, id: Uuid, patch: ProductPatch) -> AppResult<Product> {
        with_transaction!(self.uow, |tx| {
            let mut product = tx.find_product(id).await?.ok_or(AppError::NotFound)?;
            if !actor.can_manage(product.owner_id) {
                return Err(AppError::Forbidden);
            }
            product.apply(patch)?;
            tx.update_product(&product).await
        })
    }

    async fn set_availability(
        &self,
        actor: Actor,
        id: Uuid,
        available: bool,
    ) -> AppResult<Product> {
        with_transaction!(self.uow, |tx| {
            let mut product = tx.find_product(id).await?.ok_or(AppError::NotFound)?;
            if !actor.can_manage(product.owner_id) {
                return Err(AppError::Forbidden);
            }
            product.set_available(available);
            tx.update_product(&product).await
        })
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> AppResult<()> {
        with_transaction!(self.uow, |tx| {
            let mut product = tx.find_product(id).await?.ok_or(AppError::NotFound)?;
            if !actor.can_manage(product.owner_id) {
                return Err(AppError::Forbidden);
            }
            if tx.count_open_rentals(id).await? > 0 {
                return Err(AppError::conflict(
                    "Product has pending or approved rentals",
                ));
            }
            product.soft_delete();
            tx.update_product(&product).await?;
            Ok(())
        })?;

        tracing::info!(product_id = %id, actor_id = %actor.id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, RentalStatus, UserRole};
    use crate::infra::DocumentStore;
    use crate::services::fixtures;
    use rust_decimal::Decimal;

    fn setup() -> (Arc<DocumentStore>, ProductManager<DocumentStore>) {
        let store = Arc::new(DocumentStore::new());
        (store.clone(), ProductManager::new(store))
    }

    #[tokio::test]
    async fn test_first_listing_promotes_user_to_owner() {
        let (store, service) = setup();
        let user = fixtures::user(&store, UserRole::User).await;

        let product = service
            .create(user.actor(), fixtures::new_product(20))
            .await
            .unwrap();

        assert_eq!(product.owner_id, user.id);
        let reloaded = store.users().find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.role, UserRole::Owner);
    }

    #[tokio::test]
    async fn test_admin_keeps_role_when_listing() {
        let (store, service) = setup();
        let admin = fixtures::user(&store, UserRole::Admin).await;

        service
            .create(admin.actor(), fixtures::new_product(5))
            .await
            .unwrap();
        let reloaded = store.users().find_by_id(admin.id).await.unwrap().unwrap();
        assert_eq!(reloaded.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_invalid_listing_writes_nothing() {
        let (store, service) = setup();
        let user = fixtures::user(&store, UserRole::User).await;

        let result = service.create(user.actor(), fixtures::new_product(0)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let reloaded = store.users().find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_may_edit() {
        let (store, service) = setup();
        let owner = fixtures::user(&store, UserRole::Owner).await;
        let stranger = fixtures::user(&store, UserRole::User).await;
        let admin = fixtures::user(&store, UserRole::Admin).await;
        let product = fixtures::product(&store, &owner, 20).await;

        let patch = || ProductPatch {
            price: Some(Decimal::from(25)),
            ..Default::default()
        };

        assert!(matches!(
            service.update(stranger.actor(), product.id, patch()).await,
            Err(AppError::Forbidden)
        ));

        let updated = service.update(admin.actor(), product.id, patch()).await.unwrap();
        assert_eq!(updated.price, Decimal::from(25));
        assert_eq!(updated.version, product.version + 1);
    }

    #[tokio::test]
    async fn test_search_filters_and_paginates() {
        let (store, service) = setup();
        let owner = fixtures::user(&store, UserRole::Owner).await;
        for _ in 0..3 {
            fixtures::product(&store, &owner, 10).await;
        }
        let mut drill = fixtures::new_product(15);
        drill.name = "Hammer drill".into();
        drill.category = Category::ToolsEquipment;
        service.create(owner.actor(), drill).await.unwrap();

        let page = service
            .search(
                ProductFilter {
                    category: Some(Category::ToolsEquipment),
                    ..Default::default()
                },
                PaginationParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].name, "Hammer drill");

        let second = service
            .search(
                ProductFilter::default(),
                PaginationParams {
                    page: 2,
                    per_page: 3,
                },
            )
            .await
            .unwrap();
        assert_eq!(second.meta.total, 4);
        assert_eq!(second.meta.total_pages, 2);
        assert_eq!(second.data.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_open_rental() {
        let (store, service) = setup();
        let owner = fixtures::user(&store, UserRole::Owner).await;
        let renter = fixtures::user(&store, UserRole::User).await;
        let product = fixtures::product(&store, &owner, 20).await;
        let rental = fixtures::pending_rental(&store, &product, &renter).await;

        let blocked = service.delete(owner.actor(), product.id).await;
        assert!(matches!(blocked, Err(AppError::Conflict(_))));

        // Declining frees the product for deletion
        let mut declined = rental.clone();
        declined.transition(RentalStatus::Declined).unwrap();
        store
            .transaction(move |tx| {
                Box::pin(async move { tx.update_rental(&declined).await.map(|_| ()) })
            })
            .await
            .unwrap();

        service.delete(owner.actor(), product.id).await.unwrap();
        assert!(matches!(
            service.get(product.id).await,
            Err(AppError::NotFound)
        ));
        assert!(store.rentals().find_by_id(rental.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_availability() {
        let (store, service) = setup();
        let owner = fixtures::user(&store, UserRole::Owner).await;
        let product = fixtures::product(&store, &owner, 20).await;

        let closed = service
            .set_availability(owner.actor(), product.id, false)
            .await
            .unwrap();
        assert!(!closed.available);
        assert!(!closed.is_rentable());
    }
}
