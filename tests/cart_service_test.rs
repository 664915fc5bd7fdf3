mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use carmart_core::errors::ServiceError;
use carmart_core::models::NewCartItem;
use carmart_core::services::cart::cart_total;

fn draft(product_id: &str, price: Decimal, quantity: i64) -> NewCartItem {
    NewCartItem {
        product_id: product_id.to_string(),
        name: format!("Car {}", product_id),
        price,
        quantity,
        image: format!("https://img/{}.jpg", product_id),
        description: "well kept".to_string(),
    }
}

#[tokio::test]
async fn empty_cart_reads_as_empty_list() {
    let app = TestApp::new();
    let session = app.user_session("u1");

    let items = app
        .services
        .carts
        .get_items(&session, "u1")
        .await
        .expect("get_items failed");
    assert!(items.is_empty());
}

#[tokio::test]
async fn repeated_adds_of_same_product_merge_into_one_line() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    let first = carts
        .add_item(&session, "u1", draft("p1", dec!(100), 1))
        .await
        .expect("first add failed");
    let second = carts
        .add_item(&session, "u1", draft("p1", dec!(100), 2))
        .await
        .expect("second add failed");
    let third = carts
        .add_item(&session, "u1", draft("p1", dec!(100), 4))
        .await
        .expect("third add failed");

    // Same key every time: the line was merged, not duplicated.
    assert_eq!(first, second);
    assert_eq!(first, third);

    let items = carts.get_items(&session, "u1").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 7);
    assert_eq!(items[0].product_id, "p1");
}

#[tokio::test]
async fn different_products_get_separate_lines() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    carts
        .add_item(&session, "u1", draft("p1", dec!(100), 1))
        .await
        .unwrap();
    carts
        .add_item(&session, "u1", draft("p2", dec!(50), 2))
        .await
        .unwrap();

    let items = carts.get_items(&session, "u1").await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn add_item_owns_the_entry_by_user() {
    let app = TestApp::new();
    let session = app.user_session("u1");

    app.services
        .carts
        .add_item(&session, "u1", draft("p1", dec!(100), 1))
        .await
        .unwrap();

    let items = app.services.carts.get_items(&session, "u1").await.unwrap();
    assert_eq!(items[0].user_id, "u1");
    assert!(items[0].added_at.is_some());
}

#[tokio::test]
async fn non_positive_quantity_add_is_rejected() {
    let app = TestApp::new();
    let session = app.user_session("u1");

    let err = app
        .services
        .carts
        .add_item(&session, "u1", draft("p1", dec!(100), 0))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn update_quantity_overwrites_in_place() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    let key = carts
        .add_item(&session, "u1", draft("p1", dec!(100), 1))
        .await
        .unwrap();
    carts
        .update_quantity(&session, "u1", &key, 5)
        .await
        .unwrap();

    let items = carts.get_items(&session, "u1").await.unwrap();
    assert_eq!(items[0].quantity, 5);
}

#[tokio::test]
async fn update_quantity_to_zero_deletes_the_item() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    let key = carts
        .add_item(&session, "u1", draft("p1", dec!(100), 1))
        .await
        .unwrap();
    carts
        .update_quantity(&session, "u1", &key, 0)
        .await
        .unwrap();

    assert!(carts.get_items(&session, "u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_quantity_update_matches_explicit_delete() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    let via_update = carts
        .add_item(&session, "u1", draft("p1", dec!(100), 1))
        .await
        .unwrap();
    let via_delete = carts
        .add_item(&session, "u1", draft("p2", dec!(50), 1))
        .await
        .unwrap();

    carts
        .update_quantity(&session, "u1", &via_update, -3)
        .await
        .unwrap();
    carts
        .delete_item(&session, "u1", &via_delete)
        .await
        .unwrap();

    assert!(carts.get_items(&session, "u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_absent_item_is_a_no_op() {
    let app = TestApp::new();
    let session = app.user_session("u1");

    app.services
        .carts
        .delete_item(&session, "u1", "never-existed")
        .await
        .expect("delete of absent item must succeed");
}

#[tokio::test]
async fn clear_is_idempotent() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    carts
        .add_item(&session, "u1", draft("p1", dec!(100), 2))
        .await
        .unwrap();

    carts.clear(&session, "u1").await.expect("first clear");
    assert!(carts.get_items(&session, "u1").await.unwrap().is_empty());

    carts.clear(&session, "u1").await.expect("second clear");
    assert!(carts.get_items(&session, "u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn item_count_sums_quantities() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    carts
        .add_item(&session, "u1", draft("p1", dec!(100), 2))
        .await
        .unwrap();
    carts
        .add_item(&session, "u1", draft("p2", dec!(50), 3))
        .await
        .unwrap();

    assert_eq!(carts.item_count(&session, "u1").await.unwrap(), 5);
}

#[tokio::test]
async fn carts_are_scoped_per_user() {
    let app = TestApp::new();
    let alice = app.user_session("alice");
    let bob = app.user_session("bob");
    let carts = &app.services.carts;

    carts
        .add_item(&alice, "alice", draft("p1", dec!(100), 1))
        .await
        .unwrap();

    assert!(carts.get_items(&bob, "bob").await.unwrap().is_empty());
    carts.clear(&bob, "bob").await.unwrap();
    assert_eq!(carts.get_items(&alice, "alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_adds_of_same_product_do_not_duplicate() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = app.services.carts.clone();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let carts = carts.clone();
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            carts
                .add_item(&session, "u1", draft("p1", dec!(100), 1))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("add failed");
    }

    let items = carts.get_items(&session, "u1").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 8);
}

#[tokio::test]
async fn total_matches_sum_of_lines() {
    let app = TestApp::new();
    let session = app.user_session("u1");
    let carts = &app.services.carts;

    carts
        .add_item(&session, "u1", draft("p1", dec!(100), 1))
        .await
        .unwrap();
    carts
        .add_item(&session, "u1", draft("p2", dec!(50), 2))
        .await
        .unwrap();

    let items = carts.get_items(&session, "u1").await.unwrap();
    assert_eq!(cart_total(&items), dec!(200));
}
