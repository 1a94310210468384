use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use validator::Validate;

use super::{locks::ProductLocks, validate_non_negative_price};
use crate::{
    config::{DeletePolicy, DEFAULT_LOW_STOCK_THRESHOLD},
    db::DbPool,
    entities::{
        product::{self, Column as ProductColumn, Entity as Product},
        sale::{self, Entity as Sale},
    },
    errors::ServiceError,
};

/// Input for adding a product
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    #[validate(custom = "validate_non_negative_price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "stock_quantity cannot be negative"))]
    pub stock_quantity: i32,
    pub category: String,
    /// Falls back to the catalog's default threshold when absent
    #[validate(range(min = 0, message = "low_stock_threshold cannot be negative"))]
    pub low_stock_threshold: Option<i32>,
}

/// Partial update; `None` fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "stock_quantity cannot be negative"))]
    pub stock_quantity: Option<i32>,
    pub category: Option<String>,
    #[validate(range(min = 0, message = "low_stock_threshold cannot be negative"))]
    pub low_stock_threshold: Option<i32>,
}

/// Service for managing product records
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    locks: ProductLocks,
    default_threshold: i32,
    delete_policy: DeletePolicy,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, locks: ProductLocks) -> Self {
        Self {
            db,
            locks,
            default_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            delete_policy: DeletePolicy::default(),
        }
    }

    pub fn with_default_threshold(mut self, threshold: i32) -> Self {
        self.default_threshold = threshold;
        self
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Add a new product and return the stored record
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let product = product::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            category: Set(input.category),
            price: Set(input.price),
            stock_quantity: Set(input.stock_quantity),
            low_stock_threshold: Set(input
                .low_stock_threshold
                .unwrap_or(self.default_threshold)),
            ..Default::default()
        };

        let created = product.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, "Failed to create product");
            ServiceError::db_error(e)
        })?;

        info!(product_id = created.id, "Product created");
        Ok(created)
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<Option<product::Model>, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(product_id = id, error = %e, "Database error when fetching product");
                ServiceError::db_error(e)
            })
    }

    /// Apply the supplied fields to a product. Returns `false` if no product
    /// has this id.
    #[instrument(skip(self, changes))]
    pub async fn edit(&self, id: i32, changes: ProductUpdate) -> Result<bool, ServiceError> {
        changes.validate()?;

        let guard = self.locks.acquire(id).await;

        let Some(existing) = self.get(id).await? else {
            drop(guard);
            self.locks.release_if_idle(id);
            return Ok(false);
        };

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(stock_quantity) = changes.stock_quantity {
            active.stock_quantity = Set(stock_quantity);
        }
        if let Some(category) = changes.category {
            active.category = Set(category);
        }
        if let Some(threshold) = changes.low_stock_threshold {
            active.low_stock_threshold = Set(threshold);
        }

        // before_save refreshes updated_at even when nothing else changed
        active.update(&*self.db).await.map_err(|e| {
            error!(product_id = id, error = %e, "Failed to update product");
            ServiceError::db_error(e)
        })?;

        info!(product_id = id, "Product updated");
        Ok(true)
    }

    /// Hard-delete a product. Returns `false` if no product has this id.
    ///
    /// Recorded sales are never removed. Under [`DeletePolicy::Restrict`] a
    /// product with sales is kept and `Conflict` is returned.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        let db = &*self.db;
        let guard = self.locks.acquire(id).await;

        if self.get(id).await?.is_none() {
            drop(guard);
            self.locks.release_if_idle(id);
            return Ok(false);
        }

        if self.delete_policy == DeletePolicy::Restrict {
            let sales = Sale::find()
                .filter(sale::Column::ProductId.eq(id))
                .count(db)
                .await
                .map_err(ServiceError::db_error)?;
            if sales > 0 {
                warn!(product_id = id, sales, "Refusing to delete product with sales");
                return Err(ServiceError::Conflict(format!(
                    "Product {} has {} recorded sale(s) and cannot be deleted",
                    id, sales
                )));
            }
        }

        let result = Product::delete_by_id(id).exec(db).await.map_err(|e| {
            error!(product_id = id, error = %e, "Failed to delete product");
            ServiceError::db_error(e)
        })?;

        drop(guard);
        self.locks.release_if_idle(id);

        if result.rows_affected > 0 {
            info!(product_id = id, "Product deleted");
        }
        Ok(result.rows_affected > 0)
    }

    /// All products ordered by name
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<product::Model>, ServiceError> {
        Product::find()
            .order_by_asc(ProductColumn::Name)
            .order_by_asc(ProductColumn::Id)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Products whose name, description or category contains `term`,
    /// ignoring ASCII case. Wildcard characters in `term` match literally.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<product::Model>, ServiceError> {
        let pattern = format!("%{}%", escape_like(&term.to_ascii_lowercase()));

        let condition = Condition::any()
            .add(lower_like(ProductColumn::Name, &pattern))
            .add(lower_like(ProductColumn::Description, &pattern))
            .add(lower_like(ProductColumn::Category, &pattern));

        Product::find()
            .filter(condition)
            .order_by_asc(ProductColumn::Name)
            .order_by_asc(ProductColumn::Id)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Products at or below their low-stock threshold
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        Product::find()
            .filter(
                Expr::col(ProductColumn::StockQuantity)
                    .lte(Expr::col(ProductColumn::LowStockThreshold)),
            )
            .order_by_asc(ProductColumn::Name)
            .order_by_asc(ProductColumn::Id)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

const LIKE_ESCAPE: char = '!';

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn lower_like(column: ProductColumn, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}
