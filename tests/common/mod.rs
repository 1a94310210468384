#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use stockroom::{
    config::{AppConfig, DeletePolicy},
    db::{self, DbPool},
    entities::ProductModel,
    services::{InventoryServices, NewProduct},
};

/// Services backed by a fresh in-memory SQLite database.
pub struct TestInventory {
    pub db: Arc<DbPool>,
    pub services: InventoryServices,
}

impl TestInventory {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_delete_policy(policy: DeletePolicy) -> Self {
        let mut cfg = test_config();
        cfg.product_delete_policy = policy;
        Self::with_config(cfg).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let services = InventoryServices::new(db.clone(), &cfg);
        Self { db, services }
    }

    pub async fn add(
        &self,
        name: &str,
        price: Decimal,
        stock: i32,
        threshold: Option<i32>,
    ) -> ProductModel {
        self.services
            .catalog
            .add(new_product(name, price, stock, threshold))
            .await
            .expect("failed to add product")
    }

    pub async fn stock_of(&self, id: i32) -> i32 {
        self.services
            .catalog
            .get(id)
            .await
            .expect("failed to load product")
            .expect("product missing")
            .stock_quantity
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::new("sqlite::memory:".to_string(), "test".to_string())
}

pub fn new_product(name: &str, price: Decimal, stock: i32, threshold: Option<i32>) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: format!("{} description", name),
        price,
        stock_quantity: stock,
        category: "general".to_string(),
        low_stock_threshold: threshold,
    }
}
