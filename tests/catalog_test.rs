mod common;

use assert_matches::assert_matches;
use rstest::rstest;
use rust_decimal_macros::dec;
use stockroom::{
    services::{NewProduct, ProductUpdate},
    ServiceError,
};

use common::{new_product, test_config, TestInventory};

#[tokio::test]
async fn added_product_is_listed_once_with_input_fields() {
    let inv = TestInventory::new().await;

    let created = inv
        .services
        .catalog
        .add(NewProduct {
            name: "Widget".into(),
            description: "Blue widget".into(),
            price: dec!(9.99),
            stock_quantity: 5,
            category: "parts".into(),
            low_stock_threshold: Some(3),
        })
        .await
        .unwrap();

    let listed = inv.services.catalog.list().await.unwrap();
    let matches: Vec<_> = listed.iter().filter(|p| p.id == created.id).collect();
    assert_eq!(matches.len(), 1);

    let product = matches[0];
    assert_eq!(product, &created);
    assert_eq!(product.name, "Widget");
    assert_eq!(product.description, "Blue widget");
    assert_eq!(product.category, "parts");
    assert_eq!(product.price, dec!(9.99));
    assert_eq!(product.stock_quantity, 5);
    assert_eq!(product.low_stock_threshold, 3);
    assert_eq!(product.created_at, product.updated_at);
}

#[tokio::test]
async fn ids_are_unique() {
    let inv = TestInventory::new().await;
    let a = inv.add("A", dec!(1), 1, None).await;
    let b = inv.add("B", dec!(1), 1, None).await;
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn threshold_defaults_to_ten() {
    let inv = TestInventory::new().await;
    let product = inv.add("Widget", dec!(1), 50, None).await;
    assert_eq!(product.low_stock_threshold, 10);
}

#[tokio::test]
async fn threshold_default_follows_config() {
    let mut cfg = test_config();
    cfg.default_low_stock_threshold = 25;
    let inv = TestInventory::with_config(cfg).await;

    let product = inv.add("Widget", dec!(1), 50, None).await;
    assert_eq!(product.low_stock_threshold, 25);
}

#[rstest]
#[case::negative_price(dec!(-0.01), 1, None)]
#[case::negative_stock(dec!(1), -1, None)]
#[case::negative_threshold(dec!(1), 1, Some(-5))]
#[tokio::test]
async fn add_rejects_negative_values(
    #[case] price: rust_decimal::Decimal,
    #[case] stock: i32,
    #[case] threshold: Option<i32>,
) {
    let inv = TestInventory::new().await;

    let result = inv
        .services
        .catalog
        .add(new_product("Bad", price, stock, threshold))
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert!(inv.services.catalog.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_without_fields_only_touches_updated_at() {
    let inv = TestInventory::new().await;
    let before = inv.add("Widget", dec!(9.99), 5, Some(10)).await;

    let edited = inv
        .services
        .catalog
        .edit(before.id, ProductUpdate::default())
        .await
        .unwrap();
    assert!(edited);

    let after = inv.services.catalog.get(before.id).await.unwrap().unwrap();
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(
        after,
        stockroom::entities::ProductModel {
            updated_at: after.updated_at,
            ..before
        }
    );
}

#[tokio::test]
async fn edit_overwrites_only_supplied_fields() {
    let inv = TestInventory::new().await;
    let before = inv.add("Widget", dec!(9.99), 5, Some(10)).await;

    let edited = inv
        .services
        .catalog
        .edit(
            before.id,
            ProductUpdate {
                price: Some(dec!(12.50)),
                stock_quantity: Some(40),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(edited);

    let after = inv.services.catalog.get(before.id).await.unwrap().unwrap();
    assert_eq!(after.price, dec!(12.50));
    assert_eq!(after.stock_quantity, 40);
    assert_eq!(after.name, before.name);
    assert_eq!(after.description, before.description);
    assert_eq!(after.category, before.category);
    assert_eq!(after.low_stock_threshold, before.low_stock_threshold);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn edit_missing_product_returns_false() {
    let inv = TestInventory::new().await;
    let existing = inv.add("Widget", dec!(1), 1, None).await;

    let edited = inv
        .services
        .catalog
        .edit(
            existing.id + 100,
            ProductUpdate {
                name: Some("Ghost".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!edited);
    let listed = inv.services.catalog.list().await.unwrap();
    assert_eq!(listed, vec![existing]);
}

#[tokio::test]
async fn edit_rejects_negative_stock_without_mutating() {
    let inv = TestInventory::new().await;
    let before = inv.add("Widget", dec!(1), 5, None).await;

    let result = inv
        .services
        .catalog
        .edit(
            before.id,
            ProductUpdate {
                name: Some("Renamed".into()),
                stock_quantity: Some(-1),
                ..Default::default()
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    let after = inv.services.catalog.get(before.id).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn delete_missing_product_leaves_store_unchanged() {
    let inv = TestInventory::new().await;
    let kept = inv.add("Widget", dec!(1), 1, None).await;

    assert!(!inv.services.catalog.delete(kept.id + 1).await.unwrap());
    assert_eq!(inv.services.catalog.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_product() {
    let inv = TestInventory::new().await;
    let gone = inv.add("Widget", dec!(1), 1, None).await;
    let kept = inv.add("Gadget", dec!(1), 1, None).await;

    assert!(inv.services.catalog.delete(gone.id).await.unwrap());
    assert!(inv.services.catalog.get(gone.id).await.unwrap().is_none());
    assert_eq!(inv.services.catalog.list().await.unwrap(), vec![kept]);

    // second delete finds nothing
    assert!(!inv.services.catalog.delete(gone.id).await.unwrap());
}

#[tokio::test]
async fn list_is_ordered_by_name() {
    let inv = TestInventory::new().await;
    for name in ["Sprocket", "Anvil", "Gadget", "Widget"] {
        inv.add(name, dec!(1), 1, None).await;
    }

    let names: Vec<String> = inv
        .services
        .catalog
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Anvil", "Gadget", "Sprocket", "Widget"]);
}

#[tokio::test]
async fn search_matches_name_substring() {
    let inv = TestInventory::new().await;
    inv.add("Widget", dec!(1), 1, None).await;
    inv.add("Gadget", dec!(1), 1, None).await;

    let found = inv.services.catalog.search("wid").await.unwrap();
    let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Widget"]);
}

#[tokio::test]
async fn search_covers_description_and_category_once_per_row() {
    let inv = TestInventory::new().await;
    inv.services
        .catalog
        .add(NewProduct {
            name: "Hammer".into(),
            description: "steel tool".into(),
            price: dec!(15),
            stock_quantity: 3,
            category: "tools".into(),
            low_stock_threshold: None,
        })
        .await
        .unwrap();
    inv.services
        .catalog
        .add(NewProduct {
            name: "Apron".into(),
            description: "canvas".into(),
            price: dec!(8),
            stock_quantity: 3,
            category: "clothing".into(),
            low_stock_threshold: None,
        })
        .await
        .unwrap();

    // "tool" hits both description and category of the hammer
    let by_tool = inv.services.catalog.search("tool").await.unwrap();
    assert_eq!(by_tool.len(), 1);
    assert_eq!(by_tool[0].name, "Hammer");

    let by_category = inv.services.catalog.search("cloth").await.unwrap();
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].name, "Apron");

    assert!(inv.services.catalog.search("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let inv = TestInventory::new().await;
    inv.add("Widget", dec!(1), 1, None).await;
    inv.add("100% cotton", dec!(1), 1, None).await;

    let percent = inv.services.catalog.search("%").await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].name, "100% cotton");

    assert!(inv.services.catalog.search("_idget").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_folds_ascii_case_only() {
    let inv = TestInventory::new().await;
    inv.add("Élan bike", dec!(1), 1, None).await;

    let exact = inv.services.catalog.search("ÉLAN").await.unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].name, "Élan bike");

    // É and é are different letters to the SQLite lower()
    assert!(inv.services.catalog.search("élan").await.unwrap().is_empty());
}

#[rstest]
#[case::below(9, 10, true)]
#[case::at_threshold(10, 10, true)]
#[case::above(11, 10, false)]
#[case::zero_threshold_empty(0, 0, true)]
#[case::zero_threshold_stocked(1, 0, false)]
#[tokio::test]
async fn low_stock_boundary(#[case] stock: i32, #[case] threshold: i32, #[case] expected: bool) {
    let inv = TestInventory::new().await;
    let product = inv.add("Widget", dec!(1), stock, Some(threshold)).await;

    let low = inv.services.catalog.low_stock().await.unwrap();
    assert_eq!(low.iter().any(|p| p.id == product.id), expected);
}

#[tokio::test]
async fn low_stock_reflects_edits() {
    let inv = TestInventory::new().await;
    let product = inv.add("Widget", dec!(1), 50, Some(10)).await;
    assert!(inv.services.catalog.low_stock().await.unwrap().is_empty());

    inv.services
        .catalog
        .edit(
            product.id,
            ProductUpdate {
                low_stock_threshold: Some(50),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let low = inv.services.catalog.low_stock().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].id, product.id);
}
