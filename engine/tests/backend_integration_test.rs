//! Integration tests for the kitchen backend client
//!
//! Uses wiremock to stand in for the backend HTTP API.

use larder_engine::backend::{ExtractedItem, KitchenBackend};
use larder_engine::config::BackendConfig;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> KitchenBackend {
    KitchenBackend::new(&BackendConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    })
}

#[tokio::test]
async fn test_get_inventory_deserializes_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/getAll"))
        .and(body_json(json!({"kitchenId": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Milk", "totalQuantity": 2.0, "unitName": "l", "categoryName": "Dairy"},
            {"name": "Rice", "totalQuantity": 0.0, "unitName": "kg", "categoryName": "Grains"}
        ])))
        .mount(&server)
        .await;

    let inventory = client_for(&server).get_inventory(1).await.unwrap();
    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory[0].name, "Milk");
    assert_eq!(inventory[0].category_name, "Dairy");
    assert_eq!(inventory[1].total_quantity, 0.0);
}

#[tokio::test]
async fn test_get_expiring_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/getExpiring"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Yogurt", "totalQuantity": 1.0, "unitName": "cup", "expiryDate": "2026-08-07"}
        ])))
        .mount(&server)
        .await;

    let expiring = client_for(&server).get_expiring(1).await.unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].expiry_date.as_deref(), Some("2026-08-07"));
}

#[tokio::test]
async fn test_create_item_posts_expected_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/add"))
        .and(body_json(json!({
            "kitchenId": 1,
            "name": "Tomatoes",
            "quantity": 2.0,
            "unit": "kg",
            "category": "Vegetables"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .create_item(1, "Tomatoes", 2.0, "kg", "Vegetables")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bulk_add_returns_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/bulkAdd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let items = vec![
        ExtractedItem {
            name: "Milk".to_string(),
            quantity: 1.0,
            unit: "gallon".to_string(),
            price: 3.99,
        },
        ExtractedItem {
            name: "Bread".to_string(),
            quantity: 2.0,
            unit: "loaf".to_string(),
            price: 2.49,
        },
    ];

    let count = client_for(&server).bulk_add(1, &items).await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_scan_receipt_deserializes_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/receipts/scan"))
        .and(body_json(json!({"kitchenId": 1, "imageData": "payload"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "extractedItems": [
                {"name": "Milk", "quantity": 1, "unit": "gallon", "price": 3.99}
            ],
            "rawText": "MILK 3.99",
            "confidence": 0.92
        })))
        .mount(&server)
        .await;

    let scan = client_for(&server).scan_receipt(1, "payload").await.unwrap();
    assert_eq!(scan.extracted_items.len(), 1);
    assert_eq!(scan.confidence, 0.92);
    assert_eq!(scan.raw_text, "MILK 3.99");
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/inventory/getAll"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client_for(&server).get_inventory(1).await;
    let error = result.unwrap_err();
    assert!(error.to_string().contains("500"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/internal/shopping/getLists"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client_for(&server).get_shopping_lists(1).await;
    let error = result.unwrap_err();
    assert!(
        error.to_string().contains("Invalid response"),
        "unexpected error: {error}"
    );
}
