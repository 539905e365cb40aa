//! Unit of Work pattern implementation.
//!
//! The Unit of Work:
//! - Centralizes access to all repositories
//! - Manages transactions (begin, commit, rollback)
//! - Makes multi-record writes all-or-nothing
//!
//! Writes to products and rentals are conditional on the `version` the
//! transaction read. A write that loses a race fails with `Conflict` and the
//! whole transaction is discarded.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, TransactionTrait,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::entities::{product, rental, review, user};
use super::repositories::{
    map_insert_err, ProductRepository, ProductStore, RentalRepository, RentalStore,
    ReviewRepository, ReviewStore, UserRepository, UserStore,
};
use crate::domain::{Product, Rental, RentalStatus, Review, User};
use crate::errors::{AppError, AppResult};

/// Future returned by a transaction body.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Provides centralized access to all repositories and transaction management.
/// Not mockable directly because of the generic `transaction` method; tests
/// run services against the in-process document store instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn products(&self) -> Arc<dyn ProductRepository>;

    fn rentals(&self) -> Arc<dyn RentalRepository>;

    fn reviews(&self) -> Arc<dyn ReviewRepository>;

    /// Execute a closure within a transaction.
    ///
    /// Committed when the closure returns `Ok`, rolled back otherwise. The
    /// closure must only capture owned data.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a mut dyn TransactionContext) -> TxFuture<'a, T> + Send,
        T: Send;

    /// Check the backing store is reachable.
    async fn ping(&self) -> AppResult<()>;
}

/// Repository access within one transaction.
///
/// Reads see the transaction's own writes. Nothing is visible to other
/// callers until the transaction commits.
#[async_trait]
pub trait TransactionContext: Send {
    /// Find an active user
    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>>;

    async fn update_user(&mut self, user: &User) -> AppResult<()>;

    /// Find an active product
    async fn find_product(&mut self, id: Uuid) -> AppResult<Option<Product>>;

    async fn insert_product(&mut self, product: &Product) -> AppResult<()>;

    /// Write `product` if its stored version still equals `product.version`.
    /// Returns the product with the bumped version.
    async fn update_product(&mut self, product: &Product) -> AppResult<Product>;

    async fn find_rental(&mut self, id: Uuid) -> AppResult<Option<Rental>>;

    async fn insert_rental(&mut self, rental: &Rental) -> AppResult<()>;

    /// Write `rental` if its stored version still equals `rental.version`.
    async fn update_rental(&mut self, rental: &Rental) -> AppResult<Rental>;

    /// Pending or approved rentals of a product
    async fn count_open_rentals(&mut self, product_id: Uuid) -> AppResult<u64>;

    /// A second review for the same rental is `AlreadyReviewed`.
    async fn insert_review(&mut self, review: &Review) -> AppResult<()>;
}

/// Relational Unit of Work over a SeaORM connection pool.
pub struct Persistence {
    db: DatabaseConnection,
    users: Arc<UserStore>,
    products: Arc<ProductStore>,
    rentals: Arc<RentalStore>,
    reviews: Arc<ReviewStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(UserStore::new(db.clone())),
            products: Arc::new(ProductStore::new(db.clone())),
            rentals: Arc::new(RentalStore::new(db.clone())),
            reviews: Arc::new(ReviewStore::new(db.clone())),
            db,
        }
    }

    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a mut dyn TransactionContext) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await?;

        let mut ctx = DbTransactionContext { txn: &txn };
        let outcome = f(&mut ctx).await;

        match outcome {
            Ok(result) => {
                txn.commit().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        self.products.clone()
    }

    fn rentals(&self) -> Arc<dyn RentalRepository> {
        self.rentals.clone()
    }

    fn reviews(&self) -> Arc<dyn ReviewRepository> {
        self.reviews.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a mut dyn TransactionContext) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        // Version predicates on every write make ReadCommitted sufficient
        self.execute_transaction(IsolationLevel::ReadCommitted, f).await
    }

    async fn ping(&self) -> AppResult<()> {
        self.db.ping().await.map_err(AppError::from)
    }
}

/// Transaction context backed by a borrowed SeaORM transaction.
struct DbTransactionContext<'t> {
    txn: &'t DatabaseTransaction,
}

#[async_trait]
impl TransactionContext for DbTransactionContext<'_> {
    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        user::Entity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(self.txn)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        user::ActiveModel::from(user)
            .update(self.txn)
            .await
            .map_err(|e| match e {
                sea_orm::DbErr::RecordNotUpdated => AppError::NotFound,
                other => AppError::from(other),
            })?;
        Ok(())
    }

    async fn find_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        product::Entity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(self.txn)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn insert_product(&mut self, product: &Product) -> AppResult<()> {
        product::ActiveModel::from(product).insert(self.txn).await?;
        Ok(())
    }

    async fn update_product(&mut self, current: &Product) -> AppResult<Product> {
        let mut next = current.clone();
        next.version += 1;

        let result = product::Entity::update_many()
            .set(product::ActiveModel::from(&next))
            .filter(product::Column::Id.eq(current.id))
            .filter(product::Column::Version.eq(current.version))
            .exec(self.txn)
            .await?;

        if result.rows_affected == 0 {
            tracing::debug!(product_id = %current.id, version = current.version, "Stale product write");
            return Err(AppError::conflict("Product was modified concurrently, please retry"));
        }
        Ok(next)
    }

    async fn find_rental(&mut self, id: Uuid) -> AppResult<Option<Rental>> {
        rental::Entity::find_by_id(id)
            .one(self.txn)
            .await?
            .map(Rental::try_from)
            .transpose()
    }

    async fn insert_rental(&mut self, rental: &Rental) -> AppResult<()> {
        rental::ActiveModel::from(rental).insert(self.txn).await?;
        Ok(())
    }

    async fn update_rental(&mut self, current: &Rental) -> AppResult<Rental> {
        let mut next = current.clone();
        next.version += 1;

        let result = rental::Entity::update_many()
            .set(rental::ActiveModel::from(&next))
            .filter(rental::Column::Id.eq(current.id))
            .filter(rental::Column::Version.eq(current.version))
            .exec(self.txn)
            .await?;

        if result.rows_affected == 0 {
            tracing::debug!(rental_id = %current.id, version = current.version, "Stale rental write");
            return Err(AppError::conflict("Rental was modified concurrently, please retry"));
        }
        Ok(next)
    }

    async fn count_open_rentals(&mut self, product_id: Uuid) -> AppResult<u64> {
        let open = [RentalStatus::Pending.as_str(), RentalStatus::Approved.as_str()];
        let count = rental::Entity::find()
            .filter(rental::Column::ProductId.eq(product_id))
            .filter(rental::Column::Status.is_in(open))
            .count(self.txn)
            .await?;
        Ok(count)
    }

    async fn insert_review(&mut self, review: &Review) -> AppResult<()> {
        review::ActiveModel::from(review)
            .insert(self.txn)
            .await
            .map_err(|e| map_insert_err(e, AppError::AlreadyReviewed))?;
        Ok(())
    }
}

/// Shorthand for running a transaction body.
///
/// The body sees the context as `$ctx` and must evaluate to an `AppResult`.
/// Everything it captures is moved in.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(move |$ctx| {
            Box::pin(async move {
                let outcome: $crate::errors::AppResult<_> = $body;
                outcome
            })
        })
        .await
    };
}
