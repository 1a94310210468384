use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key, assigned on insert
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub description: String,

    pub category: String,

    /// Unit price
    pub price: Decimal,

    /// Units on hand; never negative
    pub stock_quantity: i32,

    /// At or below this many units the product counts as low stock
    pub low_stock_threshold: i32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Refreshed on every edit and sale
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }
}

// Sales reference products by id only; the ledger queries them explicitly.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);

        if let ActiveValue::Set(quantity) = active_model.stock_quantity {
            if quantity < 0 {
                return Err(DbErr::Custom(format!(
                    "stock_quantity cannot be negative (got {})",
                    quantity
                )));
            }
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(stock: i32, threshold: i32) -> Model {
        Model {
            id: 1,
            name: "Widget".into(),
            description: "A widget".into(),
            category: "parts".into(),
            price: dec!(9.99),
            stock_quantity: stock,
            low_stock_threshold: threshold,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_includes_threshold_boundary() {
        assert!(product(9, 10).is_low_stock());
        assert!(product(10, 10).is_low_stock());
        assert!(!product(11, 10).is_low_stock());
        assert!(product(0, 0).is_low_stock());
    }
}
