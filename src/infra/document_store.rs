//! In-process document store.
//!
//! Each collection maps ids to JSON documents carrying a store-assigned
//! revision. A transaction reads through to committed documents, buffers
//! its writes, and commits them as one batch under the store's write lock.
//! Every buffered write carries a precondition (document absent, or still at
//! the revision the transaction observed). If any precondition fails the
//! whole batch is dropped with `Conflict`.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repositories::{
    ProductFilter, ProductRepository, RentalRepository, ReviewRepository, UserRepository,
};
use super::unit_of_work::{TransactionContext, TxFuture, UnitOfWork};
use super::HealthCheck;
use crate::domain::{Product, Rental, RentalStatus, Review, User};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

const USERS: &str = "users";
const PRODUCTS: &str = "products";
const RENTALS: &str = "rentals";
const REVIEWS: &str = "reviews";

#[derive(Debug, Clone)]
struct Document {
    revision: u64,
    body: Value,
}

type Collection = BTreeMap<Uuid, Document>;

struct Inner {
    collections: RwLock<HashMap<&'static str, Collection>>,
    /// Parks committing transactions until all parties arrive.
    #[cfg(test)]
    commit_barrier: std::sync::Mutex<Option<Arc<tokio::sync::Barrier>>>,
}

/// Cheaply cloneable handle to one shared document store.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<Inner>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        let collections = [USERS, PRODUCTS, RENTALS, REVIEWS]
            .into_iter()
            .map(|name| (name, Collection::new()))
            .collect();

        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(collections),
                #[cfg(test)]
                commit_barrier: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Make the next commits wait for each other, `parties` at a time.
    #[cfg(test)]
    pub(crate) fn hold_commits(&self, parties: usize) {
        if let Ok(mut slot) = self.inner.commit_barrier.lock() {
            *slot = Some(Arc::new(tokio::sync::Barrier::new(parties)));
        }
    }

    #[cfg(test)]
    pub(crate) fn release_commits(&self) {
        if let Ok(mut slot) = self.inner.commit_barrier.lock() {
            *slot = None;
        }
    }

    async fn get<T: DeserializeOwned>(&self, coll: &str, id: Uuid) -> AppResult<Option<T>> {
        let collections = self.inner.collections.read().await;
        collections
            .get(coll)
            .and_then(|c| c.get(&id))
            .map(|doc| decode(&doc.body))
            .transpose()
    }

    async fn scan<T, P>(&self, coll: &str, keep: P) -> AppResult<Vec<T>>
    where
        T: DeserializeOwned,
        P: Fn(&T) -> bool,
    {
        let collections = self.inner.collections.read().await;
        let mut out = Vec::new();
        for doc in collections.get(coll).into_iter().flat_map(|c| c.values()) {
            let item: T = decode(&doc.body)?;
            if keep(&item) {
                out.push(item);
            }
        }
        Ok(out)
    }

    async fn commit(&self, writes: Vec<Write>) -> AppResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        #[cfg(test)]
        {
            let barrier = self
                .inner
                .commit_barrier
                .lock()
                .ok()
                .and_then(|slot| slot.clone());
            if let Some(barrier) = barrier {
                barrier.wait().await;
            }
        }

        let mut collections = self.inner.collections.write().await;

        for write in &writes {
            let current = collections
                .get(write.coll)
                .and_then(|c| c.get(&write.id))
                .map(|doc| doc.revision);
            let satisfied = match write.expect {
                Expect::Absent => current.is_none(),
                Expect::Revision(rev) => current == Some(rev),
            };
            if !satisfied {
                tracing::debug!(collection = write.coll, id = %write.id, "Write precondition failed");
                return Err(AppError::conflict(format!(
                    "{} was modified concurrently, please retry",
                    entity_label(write.coll)
                )));
            }
        }

        for write in writes {
            let collection = collections.entry(write.coll).or_default();
            let revision = collection.get(&write.id).map_or(1, |doc| doc.revision + 1);
            collection.insert(
                write.id,
                Document {
                    revision,
                    body: write.body,
                },
            );
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(body: &Value) -> AppResult<T> {
    serde_json::from_value(body.clone())
        .map_err(|e| AppError::internal(format!("Corrupt document: {}", e)))
}

fn encode<T: Serialize>(item: &T) -> AppResult<Value> {
    serde_json::to_value(item).map_err(|e| AppError::internal(format!("Encode error: {}", e)))
}

fn entity_label(coll: &str) -> &'static str {
    match coll {
        USERS => "User",
        PRODUCTS => "Product",
        RENTALS => "Rental",
        _ => "Record",
    }
}

fn newest_first<T>(items: &mut [T], created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
}

// =============================================================================
// Repositories
// =============================================================================

#[async_trait]
impl UserRepository for DocumentStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.get::<User>(USERS, id).await?.filter(|u| !u.is_deleted()))
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        self.get(USERS, id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let found = self
            .scan::<User, _>(USERS, |u| u.email == email && !u.is_deleted())
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        let found = self.scan::<User, _>(USERS, |u| u.email == email).await?;
        Ok(found.into_iter().next())
    }

    async fn create(&self, user: User) -> AppResult<User> {
        let body = encode(&user)?;
        let mut collections = self.inner.collections.write().await;
        let users = collections.entry(USERS).or_default();

        for doc in users.values() {
            let existing: User = decode(&doc.body)?;
            if existing.email == user.email {
                return Err(AppError::conflict("Email is already registered"));
            }
        }
        users.insert(user.id, Document { revision: 1, body });
        Ok(user)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let body = encode(&user)?;
        let mut collections = self.inner.collections.write().await;
        let doc = collections
            .get_mut(USERS)
            .and_then(|c| c.get_mut(&user.id))
            .ok_or(AppError::NotFound)?;
        doc.revision += 1;
        doc.body = body;
        Ok(user)
    }

    async fn list(&self, include_deleted: bool) -> AppResult<Vec<User>> {
        let mut users = self
            .scan::<User, _>(USERS, |u| include_deleted || !u.is_deleted())
            .await?;
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

#[async_trait]
impl ProductRepository for DocumentStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self
            .get::<Product>(PRODUCTS, id)
            .await?
            .filter(|p| p.deleted_at.is_none()))
    }

    async fn search(
        &self,
        filter: ProductFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)> {
        let mut products = self
            .scan::<Product, _>(PRODUCTS, |p| filter.matches(p))
            .await?;
        filter.sort.sort(&mut products);

        let total = products.len() as u64;
        let data = products
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok((data, total))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Product>> {
        let mut products = self
            .scan::<Product, _>(PRODUCTS, |p| p.owner_id == owner_id && p.deleted_at.is_none())
            .await?;
        newest_first(&mut products, |p| p.created_at);
        Ok(products)
    }

    async fn list_all(&self, include_deleted: bool) -> AppResult<Vec<Product>> {
        let mut products = self
            .scan::<Product, _>(PRODUCTS, |p| include_deleted || p.deleted_at.is_none())
            .await?;
        newest_first(&mut products, |p| p.created_at);
        Ok(products)
    }
}

#[async_trait]
impl RentalRepository for DocumentStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>> {
        self.get(RENTALS, id).await
    }

    async fn list_by_renter(&self, renter_id: Uuid) -> AppResult<Vec<Rental>> {
        let mut rentals = self
            .scan::<Rental, _>(RENTALS, |r| r.renter_id == renter_id)
            .await?;
        newest_first(&mut rentals, |r| r.created_at);
        Ok(rentals)
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        status: Option<RentalStatus>,
    ) -> AppResult<Vec<Rental>> {
        let mut rentals = self
            .scan::<Rental, _>(RENTALS, |r| {
                r.owner_id == owner_id && status.map_or(true, |s| r.status == s)
            })
            .await?;
        newest_first(&mut rentals, |r| r.created_at);
        Ok(rentals)
    }
}

#[async_trait]
impl ReviewRepository for DocumentStore {
    async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<Review>> {
        let mut reviews = self
            .scan::<Review, _>(REVIEWS, |r| r.product_id == product_id)
            .await?;
        newest_first(&mut reviews, |r| r.created_at);
        Ok(reviews)
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

#[async_trait]
impl UnitOfWork for DocumentStore {
    fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(self.clone())
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        Arc::new(self.clone())
    }

    fn rentals(&self) -> Arc<dyn RentalRepository> {
        Arc::new(self.clone())
    }

    fn reviews(&self) -> Arc<dyn ReviewRepository> {
        Arc::new(self.clone())
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a mut dyn TransactionContext) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let mut tx = DocumentTransaction::new(self.clone());
        let result = f(&mut tx).await?;
        let writes = tx.into_writes();
        self.commit(writes).await?;
        Ok(result)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for DocumentStore {
    fn name(&self) -> &'static str {
        "document_store"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Expect {
    Absent,
    Revision(u64),
}

struct Write {
    coll: &'static str,
    id: Uuid,
    body: Value,
    expect: Expect,
}

/// Buffered writes plus the revisions this transaction has observed.
struct DocumentTransaction {
    store: DocumentStore,
    observed: HashMap<(&'static str, Uuid), u64>,
    writes: Vec<Write>,
}

impl DocumentTransaction {
    fn new(store: DocumentStore) -> Self {
        Self {
            store,
            observed: HashMap::new(),
            writes: Vec::new(),
        }
    }

    fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    fn pending(&self, coll: &str, id: Uuid) -> Option<&Write> {
        self.writes.iter().find(|w| w.coll == coll && w.id == id)
    }

    /// Read one document, preferring this transaction's own buffered write.
    async fn read<T: DeserializeOwned>(
        &mut self,
        coll: &'static str,
        id: Uuid,
    ) -> AppResult<Option<T>> {
        if let Some(write) = self.pending(coll, id) {
            return decode(&write.body).map(Some);
        }

        let collections = self.store.inner.collections.read().await;
        match collections.get(coll).and_then(|c| c.get(&id)) {
            Some(doc) => {
                self.observed.entry((coll, id)).or_insert(doc.revision);
                decode(&doc.body).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Committed documents of a collection overlaid with buffered writes.
    async fn read_all<T: DeserializeOwned>(&self, coll: &'static str) -> AppResult<Vec<T>> {
        let mut bodies: BTreeMap<Uuid, Value> = {
            let collections = self.store.inner.collections.read().await;
            collections
                .get(coll)
                .map(|c| c.iter().map(|(id, doc)| (*id, doc.body.clone())).collect())
                .unwrap_or_default()
        };
        for write in self.writes.iter().filter(|w| w.coll == coll) {
            bodies.insert(write.id, write.body.clone());
        }
        bodies.values().map(decode).collect()
    }

    fn insert<T: Serialize>(&mut self, coll: &'static str, id: Uuid, item: &T) -> AppResult<()> {
        if self.pending(coll, id).is_some() {
            return Err(AppError::conflict(format!("{} already exists", entity_label(coll))));
        }
        self.writes.push(Write {
            coll,
            id,
            body: encode(item)?,
            expect: Expect::Absent,
        });
        Ok(())
    }

    async fn replace<T: Serialize>(
        &mut self,
        coll: &'static str,
        id: Uuid,
        item: &T,
    ) -> AppResult<()> {
        let body = encode(item)?;
        if let Some(write) = self.writes.iter_mut().find(|w| w.coll == coll && w.id == id) {
            write.body = body;
            return Ok(());
        }

        let revision = match self.observed.get(&(coll, id)) {
            Some(rev) => *rev,
            None => {
                let collections = self.store.inner.collections.read().await;
                collections
                    .get(coll)
                    .and_then(|c| c.get(&id))
                    .map(|doc| doc.revision)
                    .ok_or(AppError::NotFound)?
            }
        };
        self.writes.push(Write {
            coll,
            id,
            body,
            expect: Expect::Revision(revision),
        });
        Ok(())
    }

    /// Fail early when the stored entity version moved past `version`.
    async fn check_version(&mut self, coll: &'static str, id: Uuid, version: i32) -> AppResult<()> {
        let stored: Option<Value> = self.read(coll, id).await?;
        let stored_version = stored
            .as_ref()
            .and_then(|body| body.get("version"))
            .and_then(Value::as_i64);
        match stored_version {
            Some(v) if v == i64::from(version) => Ok(()),
            Some(_) => Err(AppError::conflict(format!(
                "{} was modified concurrently, please retry",
                entity_label(coll)
            ))),
            None => Err(AppError::NotFound),
        }
    }
}

#[async_trait]
impl TransactionContext for DocumentTransaction {
    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.read::<User>(USERS, id).await?.filter(|u| !u.is_deleted()))
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        self.replace(USERS, user.id, user).await
    }

    async fn find_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self
            .read::<Product>(PRODUCTS, id)
            .await?
            .filter(|p| p.deleted_at.is_none()))
    }

    async fn insert_product(&mut self, product: &Product) -> AppResult<()> {
        self.insert(PRODUCTS, product.id, product)
    }

    async fn update_product(&mut self, current: &Product) -> AppResult<Product> {
        self.check_version(PRODUCTS, current.id, current.version).await?;
        let mut next = current.clone();
        next.version += 1;
        self.replace(PRODUCTS, next.id, &next).await?;
        Ok(next)
    }

    async fn find_rental(&mut self, id: Uuid) -> AppResult<Option<Rental>> {
        self.read(RENTALS, id).await
    }

    async fn insert_rental(&mut self, rental: &Rental) -> AppResult<()> {
        self.insert(RENTALS, rental.id, rental)
    }

    async fn update_rental(&mut self, current: &Rental) -> AppResult<Rental> {
        self.check_version(RENTALS, current.id, current.version).await?;
        let mut next = current.clone();
        next.version += 1;
        self.replace(RENTALS, next.id, &next).await?;
        Ok(next)
    }

    async fn count_open_rentals(&mut self, product_id: Uuid) -> AppResult<u64> {
        let rentals: Vec<Rental> = self.read_all(RENTALS).await?;
        Ok(rentals
            .iter()
            .filter(|r| r.product_id == product_id && r.status.is_open())
            .count() as u64)
    }

    async fn insert_review(&mut self, review: &Review) -> AppResult<()> {
        let reviews: Vec<Review> = self.read_all(REVIEWS).await?;
        if reviews.iter().any(|r| r.rental_id == review.rental_id) {
            return Err(AppError::AlreadyReviewed);
        }
        self.insert(REVIEWS, review.id, review)
    }
}
