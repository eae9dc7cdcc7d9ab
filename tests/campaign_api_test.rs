//! Campaign administration tests: key-shape validation, name conflicts,
//! updates, soft deletion and its effect on new sales.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn creates_and_fetches_a_percent_campaign() {
    let app = TestApp::new().await;
    let id = app
        .seed_campaign(json!({
            "name": "Spring sale",
            "category": "PERCENT",
            "percent": "20"
        }))
        .await;

    let response = app
        .request(Method::GET, &format!("/api/v1/campaigns/{id}"), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Spring sale");
    assert_eq!(body["data"]["category"], "PERCENT");
    assert_eq!(body["data"]["state"], true);
}

#[tokio::test]
async fn rejects_invalid_key_shape_with_sub_errors() {
    let app = TestApp::new().await;

    // A percent campaign carrying a money amount: two violations.
    let response = app
        .request(
            Method::POST,
            "/api/v1/campaigns",
            Some(json!({
                "name": "Broken",
                "category": "PERCENT",
                "percent": "250",
                "amount": "5"
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    let sub_errors = body["subErrors"].as_array().expect("subErrors present");
    assert!(sub_errors.iter().any(|e| e["field"] == "percent"));
    assert!(sub_errors.iter().any(|e| e["field"] == "amount"));
}

#[tokio::test]
async fn rejects_buy_x_pay_y_where_pay_is_not_less_than_buy() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/campaigns",
            Some(json!({
                "name": "Backwards",
                "category": "BUY_X_PAY_Y",
                "buyQuantity": 2,
                "payQuantity": 3
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn duplicate_campaign_name_conflicts() {
    let app = TestApp::new().await;
    app.seed_campaign(json!({
        "name": "Summer promo",
        "category": "MONEY_DISCOUNT",
        "amount": "5"
    }))
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/campaigns",
            Some(json!({
                "name": "Summer promo",
                "category": "PERCENT",
                "percent": "10"
            })),
        )
        .await;

    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn deleted_campaign_name_can_be_reused() {
    let app = TestApp::new().await;
    let id = app
        .seed_campaign(json!({
            "name": "One-off",
            "category": "MONEY_DISCOUNT",
            "amount": "5"
        }))
        .await;

    let response = app
        .request(Method::DELETE, &format!("/api/v1/campaigns/{id}"), None)
        .await;
    assert_eq!(response.status(), 200);

    app.seed_campaign(json!({
        "name": "One-off",
        "category": "PERCENT",
        "percent": "15"
    }))
    .await;
}

#[tokio::test]
async fn updates_name_state_and_key() {
    let app = TestApp::new().await;
    let id = app
        .seed_campaign(json!({
            "name": "Tweakable",
            "category": "PERCENT",
            "percent": "10"
        }))
        .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/campaigns/{id}"),
            Some(json!({
                "name": "Tweaked",
                "state": false,
                "percent": "25"
            })),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Tweaked");
    assert_eq!(body["data"]["state"], false);
    assert_eq!(body["data"]["percent"], "25");
}

#[tokio::test]
async fn update_rejects_key_outside_the_campaign_kind() {
    let app = TestApp::new().await;
    let id = app
        .seed_campaign(json!({
            "name": "Percent only",
            "category": "PERCENT",
            "percent": "10"
        }))
        .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/campaigns/{id}"),
            Some(json!({ "amount": "5" })),
        )
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn deactivated_campaign_cannot_be_applied_to_new_sales() {
    let app = TestApp::new().await;
    app.stock_product("SKU-CAKE", "Cake", dec!(10)).await;
    let id = app
        .seed_campaign(json!({
            "name": "Paused promo",
            "category": "PERCENT",
            "percent": "50"
        }))
        .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/campaigns/{id}"),
            Some(json!({ "state": false })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "20",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-CAKE", "quantity": 1, "campaignId": id }]
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("not active"));
}

#[tokio::test]
async fn soft_deleted_campaign_is_not_found_for_new_sales() {
    let app = TestApp::new().await;
    app.stock_product("SKU-PIE", "Pie", dec!(10)).await;
    let id = app
        .seed_campaign(json!({
            "name": "Gone promo",
            "category": "MONEY_DISCOUNT",
            "amount": "2"
        }))
        .await;

    let response = app
        .request(Method::DELETE, &format!("/api/v1/campaigns/{id}"), None)
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "20",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-PIE", "quantity": 1, "campaignId": id }]
            })),
        )
        .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn list_supports_filters() {
    let app = TestApp::new().await;
    app.seed_campaign(json!({
        "name": "Alpha percent",
        "category": "PERCENT",
        "percent": "10"
    }))
    .await;
    app.seed_campaign(json!({
        "name": "Beta money",
        "category": "MONEY_DISCOUNT",
        "amount": "3"
    }))
    .await;

    let response = app
        .request(Method::GET, "/api/v1/campaigns?category=PERCENT", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Alpha percent");

    let response = app
        .request(Method::GET, "/api/v1/campaigns?name=Beta", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["category"], "MONEY_DISCOUNT");
}

#[tokio::test]
async fn missing_campaign_is_404() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            "/api/v1/campaigns/00000000-0000-0000-0000-000000000001",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}
