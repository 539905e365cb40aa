//! Product listing entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::MAX_PRODUCT_NAME_LENGTH;
use crate::errors::{AppError, AppResult};

/// Fixed set of listing categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Electronics,
    HomeGarden,
    SportsOutdoors,
    ToolsEquipment,
    Vehicles,
    ClothingAccessories,
    ToysGames,
    BooksMedia,
    PartyEvents,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Electronics,
        Category::HomeGarden,
        Category::SportsOutdoors,
        Category::ToolsEquipment,
        Category::Vehicles,
        Category::ClothingAccessories,
        Category::ToysGames,
        Category::BooksMedia,
        Category::PartyEvents,
        Category::Other,
    ];

    /// Storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::HomeGarden => "home-garden",
            Category::SportsOutdoors => "sports-outdoors",
            Category::ToolsEquipment => "tools-equipment",
            Category::Vehicles => "vehicles",
            Category::ClothingAccessories => "clothing-accessories",
            Category::ToysGames => "toys-games",
            Category::BooksMedia => "books-media",
            Category::PartyEvents => "party-events",
            Category::Other => "other",
        }
    }

    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::HomeGarden => "Home & Garden",
            Category::SportsOutdoors => "Sports & Outdoors",
            Category::ToolsEquipment => "Tools & Equipment",
            Category::Vehicles => "Vehicles",
            Category::ClothingAccessories => "Clothing & Accessories",
            Category::ToysGames => "Toys & Games",
            Category::BooksMedia => "Books & Media",
            Category::PartyEvents => "Party & Events",
            Category::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown category '{}'", s)))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rentable product listed by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[schema(example = "Cordless drill")]
    pub name: String,
    pub description: String,
    /// Price per day
    #[schema(value_type = String, example = "20.00")]
    pub price: Decimal,
    pub category: Category,
    pub available: bool,
    pub is_rented: bool,
    pub total_rentals: i32,
    #[schema(value_type = String, example = "60.00")]
    pub total_revenue: Decimal,
    /// Optimistic concurrency token, bumped on every write
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields supplied when listing a product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: Category,
    pub available: bool,
}

/// Partial product update
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<Category>,
}

impl Product {
    /// Build a fresh listing owned by `owner_id`.
    pub fn new(owner_id: Uuid, fields: NewProduct) -> AppResult<Self> {
        validate_name(&fields.name)?;
        validate_price(fields.price)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            name: fields.name.trim().to_string(),
            description: fields.description,
            price: fields.price,
            category: fields.category,
            available: fields.available,
            is_rented: false,
            total_rentals: 0,
            total_revenue: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Available and not currently out on an approved rental.
    pub fn is_rentable(&self) -> bool {
        self.available && !self.is_rented && self.deleted_at.is_none()
    }

    pub fn apply(&mut self, patch: ProductPatch) -> AppResult<()> {
        if let Some(name) = patch.name {
            validate_name(&name)?;
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
            self.price = price;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
        self.updated_at = Utc::now();
    }

    /// Mark the product as out on rental.
    ///
    /// # Errors
    /// `Conflict` when the product is not rentable anymore.
    pub fn mark_rented(&mut self) -> AppResult<()> {
        if !self.is_rentable() {
            return Err(AppError::conflict("Product is no longer available for rent"));
        }
        self.is_rented = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Return the product and fold a finished rental into the aggregates.
    pub fn record_return(&mut self, rental_price: Decimal) {
        self.is_rented = false;
        self.total_rentals += 1;
        self.total_revenue += rental_price;
        self.updated_at = Utc::now();
    }

    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.available = false;
        self.updated_at = now;
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Product name is required"));
    }
    if name.chars().count() as u64 > MAX_PRODUCT_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "Product name must be at most {} characters",
            MAX_PRODUCT_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::validation("Price per day must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn listing(price: i64) -> AppResult<Product> {
        Product::new(
            Uuid::new_v4(),
            NewProduct {
                name: "  Tent ".into(),
                description: "Four person tent".into(),
                price: Decimal::from(price),
                category: Category::SportsOutdoors,
                available: true,
            },
        )
    }

    #[test]
    fn test_category_storage_keys_parse_back() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()).unwrap(), category);
        }
        assert_eq!(Category::HomeGarden.label(), "Home & Garden");
        assert!(Category::parse("weapons").is_err());
    }

    #[test]
    fn test_category_serde_matches_storage_key() {
        let json = serde_json::to_string(&Category::ToolsEquipment).unwrap();
        assert_eq!(json, "\"tools-equipment\"");
    }

    #[test]
    fn test_new_product_validation() {
        assert!(listing(0).is_err());
        assert!(listing(-5).is_err());

        let product = listing(20).unwrap();
        assert_eq!(product.name, "Tent");
        assert!(product.is_rentable());
        assert_eq!(product.total_rentals, 0);
    }

    #[test]
    fn test_mark_rented_twice_conflicts() {
        let mut product = listing(20).unwrap();
        product.mark_rented().unwrap();
        assert!(matches!(product.mark_rented(), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_unavailable_product_cannot_be_rented() {
        let mut product = listing(20).unwrap();
        product.set_available(false);
        assert!(product.mark_rented().is_err());
    }

    #[test]
    fn test_record_return_updates_aggregates_together() {
        let mut product = listing(20).unwrap();
        product.mark_rented().unwrap();
        product.record_return(Decimal::from(60));
        product.mark_rented().unwrap();
        product.record_return(Decimal::from_f64(12.5).unwrap());

        assert!(!product.is_rented);
        assert_eq!(product.total_rentals, 2);
        assert_eq!(product.total_revenue, Decimal::from_f64(72.5).unwrap());
    }

    #[test]
    fn test_patch_rejects_bad_price() {
        let mut product = listing(20).unwrap();
        let result = product.apply(ProductPatch {
            price: Some(Decimal::ZERO),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(product.price, Decimal::from(20));
    }
}
