/*!
 * Transaction Helper Utilities
 *
 * Runs a closure inside a database transaction: commit when it returns `Ok`,
 * rollback when it returns `Err` (or panics, since the transaction is
 * dropped without a commit).
 */

use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction
///
/// Unlike a bare `DatabaseConnection::transaction`, the caller's error type
/// comes back unchanged so typed failures raised inside the boundary
/// (e.g. not found, insufficient stock) survive the rollback.
///
/// # Example
///
/// ```rust,ignore
/// let sale = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         let product = Product::find_by_id(id).one(txn).await?;
///         // ...
///         Ok(sale)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T, E>(db: &DatabaseConnection, f: F) -> Result<T, E>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, E>> + Send,
    T: Send,
    E: From<DbErr> + std::error::Error + Send,
{
    let start = std::time::Instant::now();
    counter!("stockroom_db.transaction.started", 1);

    let result = db.transaction(f).await;

    let elapsed = start.elapsed();
    histogram!("stockroom_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("stockroom_db.transaction.committed", 1);
            debug!("Transaction committed in {:?}", elapsed);
        }
        Err(e) => {
            counter!("stockroom_db.transaction.rolled_back", 1);
            warn!(error = %e, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result.map_err(|e| match e {
        TransactionError::Connection(db_err) => E::from(db_err),
        TransactionError::Transaction(err) => err,
    })
}
