//! Product repository: listing queries over active (non-deleted) products.

use async_trait::async_trait;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select,
};
use serde::Deserialize;
use std::cmp::Reverse;
use utoipa::ToSchema;
use uuid::Uuid;

use super::entities::product::{self, Entity as ProductEntity};
use crate::domain::{Category, Product};
use crate::errors::AppResult;
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Order of a browse page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    /// In-memory ordering, kept in line with `order`.
    pub fn sort(self, products: &mut [Product]) {
        match self {
            ProductSort::Newest => products.sort_by_key(|p| Reverse(p.created_at)),
            ProductSort::Oldest => products.sort_by_key(|p| p.created_at),
            ProductSort::PriceAsc => products.sort_by_key(|p| (p.price, Reverse(p.created_at))),
            ProductSort::PriceDesc => {
                products.sort_by_key(|p| (Reverse(p.price), Reverse(p.created_at)))
            }
        }
    }

    fn order(self, query: Select<ProductEntity>) -> Select<ProductEntity> {
        match self {
            ProductSort::Newest => query.order_by_desc(product::Column::CreatedAt),
            ProductSort::Oldest => query.order_by_asc(product::Column::CreatedAt),
            ProductSort::PriceAsc => query
                .order_by_asc(product::Column::Price)
                .order_by_desc(product::Column::CreatedAt),
            ProductSort::PriceDesc => query
                .order_by_desc(product::Column::Price)
                .order_by_desc(product::Column::CreatedAt),
        }
    }
}

/// Criteria for browsing listings. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<Category>,
    /// Only products that can be requested right now
    pub available_only: bool,
    pub owner_id: Option<Uuid>,
    /// Case-insensitive substring of the name or description
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Normalized search needle, `None` when blank.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// In-memory evaluation, kept in line with the SQL in `ProductStore`.
    pub fn matches(&self, product: &Product) -> bool {
        if product.deleted_at.is_some() {
            return false;
        }
        if self.category.is_some_and(|c| c != product.category) {
            return false;
        }
        if self.available_only && !product.is_rentable() {
            return false;
        }
        if self.owner_id.is_some_and(|o| o != product.owner_id) {
            return false;
        }
        match self.needle() {
            Some(needle) => {
                product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Find an active product
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;

    /// Filtered page of active products in `filter.sort` order, with the total count
    async fn search(
        &self,
        filter: ProductFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)>;

    /// Active products of one owner, newest first
    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Product>>;

    /// Every product for moderation, newest first
    async fn list_all(&self, include_deleted: bool) -> AppResult<Vec<Product>>;
}

pub struct ProductStore {
    db: DatabaseConnection,
}

impl ProductStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(models: Vec<product::Model>) -> AppResult<Vec<Product>> {
    models.into_iter().map(Product::try_from).collect()
}

fn filter_condition(filter: &ProductFilter) -> Condition {
    let mut cond = Condition::all().add(product::Column::DeletedAt.is_null());

    if let Some(category) = filter.category {
        cond = cond.add(product::Column::Category.eq(category.as_str()));
    }
    if filter.available_only {
        cond = cond
            .add(product::Column::Available.eq(true))
            .add(product::Column::IsRented.eq(false));
    }
    if let Some(owner_id) = filter.owner_id {
        cond = cond.add(product::Column::OwnerId.eq(owner_id));
    }
    if let Some(needle) = filter.needle() {
        let pattern = like_pattern(&needle);
        let lowered = |col: product::Column| {
            Expr::expr(Func::lower(Expr::col(col)))
                .like(LikeExpr::new(pattern.clone()).escape('\\'))
        };
        cond = cond.add(
            Condition::any()
                .add(lowered(product::Column::Name))
                .add(lowered(product::Column::Description)),
        );
    }
    cond
}

/// `%needle%` with LIKE wildcards in the needle taken literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        ProductEntity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn search(
        &self,
        filter: ProductFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)> {
        let query = ProductEntity::find().filter(filter_condition(&filter));
        let paginator = filter.sort.order(query).paginate(&self.db, page.limit());

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.page.saturating_sub(1)).await?;
        Ok((to_domain(models)?, total))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Product>> {
        let models = ProductEntity::find()
            .filter(product::Column::OwnerId.eq(owner_id))
            .filter(product::Column::DeletedAt.is_null())
            .order_by_desc(product::Column::CreatedAt)
            .all(&self.db)
            .await?;
        to_domain(models)
    }

    async fn list_all(&self, include_deleted: bool) -> AppResult<Vec<Product>> {
        let mut query = ProductEntity::find().order_by_desc(product::Column::CreatedAt);
        if !include_deleted {
            query = query.filter(product::Column::DeletedAt.is_null());
        }
        to_domain(query.all(&self.db).await?)
    }
}
