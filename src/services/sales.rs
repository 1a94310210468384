use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::{info, instrument, warn};

use super::{
    ledger::{NewSale, SalesLedgerService},
    locks::ProductLocks,
};
use crate::{
    db::{with_transaction, DbPool},
    entities::{
        product::{Column as ProductColumn, Entity as Product},
        sale,
    },
    errors::ServiceError,
};

/// Records sales: stock deduction and ledger entry commit together or not
/// at all.
#[derive(Debug, Clone)]
pub struct SalesService {
    db: Arc<DbPool>,
    locks: ProductLocks,
}

impl SalesService {
    pub fn new(db: Arc<DbPool>, locks: ProductLocks) -> Self {
        Self { db, locks }
    }

    /// Sell `quantity` units of a product.
    ///
    /// Charges `sale_price` per unit when given, otherwise the product's
    /// price at this instant. Fails with `NotFound` for an unknown product and
    /// `InsufficientStock` when fewer than `quantity` units are on hand; a
    /// failed sale changes nothing.
    #[instrument(skip(self))]
    pub async fn sell(
        &self,
        product_id: i32,
        quantity: i32,
        sale_price: Option<Decimal>,
    ) -> Result<sale::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "quantity must be positive (got {})",
                quantity
            )));
        }
        if let Some(price) = sale_price {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(ServiceError::ValidationError(format!(
                    "sale_price cannot be negative (got {})",
                    price
                )));
            }
        }

        let guard = self.locks.acquire(product_id).await;

        let result = with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let product = Product::find_by_id(product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::product_not_found(product_id))?;

                if quantity > product.stock_quantity {
                    return Err(ServiceError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available: product.stock_quantity,
                    });
                }

                let unit_price = sale_price.unwrap_or(product.price);

                // only deducts while stock still covers the quantity
                let deducted = Product::update_many()
                    .col_expr(
                        ProductColumn::StockQuantity,
                        Expr::col(ProductColumn::StockQuantity).sub(quantity),
                    )
                    .col_expr(ProductColumn::UpdatedAt, Expr::value(Utc::now()))
                    .filter(ProductColumn::Id.eq(product_id))
                    .filter(ProductColumn::StockQuantity.gte(quantity))
                    .exec(txn)
                    .await?;

                if deducted.rows_affected != 1 {
                    return Err(ServiceError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available: product.stock_quantity,
                    });
                }

                SalesLedgerService::append_in(
                    txn,
                    NewSale {
                        product_id,
                        quantity,
                        sale_price: unit_price,
                    },
                )
                .await
            })
        })
        .await;

        drop(guard);
        if matches!(result, Err(ServiceError::NotFound(_))) {
            self.locks.release_if_idle(product_id);
        }

        match &result {
            Ok(sale) => {
                counter!("stockroom_sales.recorded", 1);
                info!(
                    sale_id = sale.id,
                    product_id,
                    quantity,
                    sale_price = %sale.sale_price,
                    "Sale recorded"
                );
            }
            Err(e) if e.is_client_error() => {
                counter!("stockroom_sales.rejected", 1);
                warn!(product_id, quantity, error = %e, "Sale rejected");
            }
            Err(_) => {
                counter!("stockroom_sales.failed", 1);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection, run_migrations};

    async fn service() -> SalesService {
        let db = establish_connection("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        SalesService::new(Arc::new(db), ProductLocks::default())
    }

    #[tokio::test]
    async fn unknown_products_leave_no_lock_entries() {
        let svc = service().await;

        for id in 1000..1100 {
            let result = svc.sell(id, 1, None).await;
            assert!(matches!(result, Err(ServiceError::NotFound(_))));
        }

        assert_eq!(svc.locks.len(), 0);
    }
}
