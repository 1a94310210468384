//! Inventory services: the product catalog, the sales ledger, and the sale
//! transaction that spans both.

pub mod catalog;
pub mod ledger;
pub mod locks;
pub mod sales;

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::config::{AppConfig, DeletePolicy, DEFAULT_LOW_STOCK_THRESHOLD};
use crate::db::DbPool;

pub use catalog::{CatalogService, NewProduct, ProductUpdate};
pub use ledger::{NewSale, SalesLedgerService};
pub use locks::ProductLocks;
pub use sales::SalesService;

/// Every operation exposed to a front end, sharing one storage handle and
/// one set of per-product locks.
#[derive(Debug, Clone)]
pub struct InventoryServices {
    pub catalog: CatalogService,
    pub ledger: SalesLedgerService,
    pub sales: SalesService,
}

impl InventoryServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig) -> Self {
        Self::build(
            db,
            config.default_low_stock_threshold,
            config.product_delete_policy,
        )
    }

    /// Services with the built-in defaults (threshold 10, orphaning deletes).
    pub fn with_defaults(db: Arc<DbPool>) -> Self {
        Self::build(db, DEFAULT_LOW_STOCK_THRESHOLD, DeletePolicy::default())
    }

    fn build(db: Arc<DbPool>, default_threshold: i32, delete_policy: DeletePolicy) -> Self {
        let locks = ProductLocks::default();
        Self {
            catalog: CatalogService::new(db.clone(), locks.clone())
                .with_default_threshold(default_threshold)
                .with_delete_policy(delete_policy),
            ledger: SalesLedgerService::new(db.clone()),
            sales: SalesService::new(db, locks),
        }
    }
}

pub(crate) fn validate_non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("price");
        err.message = Some("price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}
