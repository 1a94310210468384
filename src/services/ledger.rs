use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::{
    db::DbPool,
    entities::sale::{self, Column as SaleColumn, Entity as Sale},
    errors::ServiceError,
};

/// A sale about to be written to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub product_id: i32,
    pub quantity: i32,
    pub sale_price: Decimal,
}

/// Append-only store of sale records
#[derive(Debug, Clone)]
pub struct SalesLedgerService {
    db: Arc<DbPool>,
}

impl SalesLedgerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Record a sale on the service's own connection
    #[instrument(skip(self))]
    pub async fn append(&self, sale: NewSale) -> Result<sale::Model, ServiceError> {
        Self::append_in(&*self.db, sale).await
    }

    /// Record a sale on the given connection, typically an open transaction
    /// that also carries the matching stock deduction.
    pub async fn append_in<C>(conn: &C, sale: NewSale) -> Result<sale::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        let record = sale::ActiveModel {
            product_id: Set(sale.product_id),
            quantity: Set(sale.quantity),
            sale_price: Set(sale.sale_price),
            ..Default::default()
        };

        let created = record.insert(conn).await.map_err(|e| {
            error!(product_id = sale.product_id, error = %e, "Failed to append sale");
            ServiceError::db_error(e)
        })?;

        debug!(sale_id = created.id, product_id = created.product_id, "Sale appended");
        Ok(created)
    }

    /// Sales, most recent first; only `product_id`'s when given
    #[instrument(skip(self))]
    pub async fn history(&self, product_id: Option<i32>) -> Result<Vec<sale::Model>, ServiceError> {
        let mut query = Sale::find();

        if let Some(product_id) = product_id {
            query = query.filter(SaleColumn::ProductId.eq(product_id));
        }

        query
            .order_by_desc(SaleColumn::SaleDate)
            .order_by_desc(SaleColumn::Id)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}
