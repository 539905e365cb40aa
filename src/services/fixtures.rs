//! Shared setup for service tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{Category, NewProduct, Password, Product, Rental, User, UserRole};
use crate::infra::{DocumentStore, UnitOfWork};

pub const PASSWORD: &str = "correct-horse";

pub fn config() -> Config {
    Config::with_secret("test-secret-that-is-at-least-32-characters-long").unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Insert a user whose password is `PASSWORD`.
pub async fn user(store: &Arc<DocumentStore>, role: UserRole) -> User {
    let email = format!("{}@example.com", Uuid::new_v4().simple());
    let hash = Password::new(PASSWORD).unwrap().into_string();
    store
        .users()
        .create(User::new(email, hash, "Test User".into(), role))
        .await
        .unwrap()
}

pub fn new_product(price: i64) -> NewProduct {
    NewProduct {
        name: "Camping tent".into(),
        description: "Sleeps four".into(),
        price: Decimal::from(price),
        category: Category::SportsOutdoors,
        available: true,
    }
}

/// Insert a product owned by `owner` straight into the store.
pub async fn product(store: &Arc<DocumentStore>, owner: &User, price: i64) -> Product {
    let product = Product::new(owner.id, new_product(price)).unwrap();
    let insert = product.clone();
    store
        .transaction(move |tx| Box::pin(async move { tx.insert_product(&insert).await }))
        .await
        .unwrap();
    product
}

/// Insert a pending rental from 2024-01-01 to 2024-01-04.
pub async fn pending_rental(store: &Arc<DocumentStore>, product: &Product, renter: &User) -> Rental {
    let rental = Rental::request(
        product.id,
        product.owner_id,
        renter.id,
        date(2024, 1, 1),
        date(2024, 1, 4),
        product.price,
        None,
    )
    .unwrap();
    let insert = rental.clone();
    store
        .transaction(move |tx| Box::pin(async move { tx.insert_rental(&insert).await }))
        .await
        .unwrap();
    rental
}
