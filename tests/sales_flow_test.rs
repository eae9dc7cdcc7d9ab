//! End-to-end tests for sale capture: pricing against the inventory stub,
//! campaign application, payment validation and the error taxonomy.

mod common;

use axum::http::Method;
use common::{response_json, token_with_permission, TestApp};
use pos_sales_api::auth::consts as perm;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::str::FromStr;

fn decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal value: {other:?}"),
    }
}

#[tokio::test]
async fn cash_sale_with_buy_x_pay_y_campaign() {
    let app = TestApp::new().await;
    app.stock_product("SKU-COLA", "Cola Can", dec!(10)).await;

    let campaign_id = app
        .seed_campaign(json!({
            "name": "3 for 2 cola",
            "category": "BUY_X_PAY_Y",
            "buyQuantity": 3,
            "payQuantity": 2
        }))
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "50",
                "paymentType": "CASH",
                "items": [{
                    "productId": "SKU-COLA",
                    "quantity": 6,
                    "campaignId": campaign_id
                }]
            })),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());

    let sale = &body["data"];
    assert_eq!(decimal(&sale["totalPrice"]), dec!(40));
    assert_eq!(decimal(&sale["change"]), dec!(10));
    assert_eq!(sale["paymentType"], "CASH");
    assert_eq!(sale["items"][0]["name"], "Cola Can");
    assert_eq!(decimal(&sale["items"][0]["totalPrice"]), dec!(40));
    assert!(sale["salesNumber"]
        .as_str()
        .unwrap()
        .starts_with("S-"));
}

#[tokio::test]
async fn fetching_by_sales_number_round_trips_totals() {
    let app = TestApp::new().await;
    app.stock_product("SKU-TEA", "Green Tea", dec!(4.25)).await;
    app.stock_product("SKU-MUG", "Mug", dec!(8.00)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "100",
                "paymentType": "CASH",
                "items": [
                    { "productId": "SKU-TEA", "quantity": 4 },
                    { "productId": "SKU-MUG", "quantity": 2 }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let created = response_json(response).await;
    let sales_number = created["data"]["salesNumber"].as_str().unwrap().to_string();

    let response = app
        .request(Method::GET, &format!("/api/v1/sales/{sales_number}"), None)
        .await;
    assert_eq!(response.status(), 200);
    let fetched = response_json(response).await;

    let items = fetched["data"]["items"].as_array().unwrap();
    let item_sum: Decimal = items.iter().map(|item| decimal(&item["totalPrice"])).sum();
    assert_eq!(item_sum, decimal(&fetched["data"]["totalPrice"]));
    assert_eq!(item_sum, dec!(33.00));
}

#[tokio::test]
async fn exact_cash_payment_succeeds_with_zero_change() {
    let app = TestApp::new().await;
    app.stock_product("SKU-BREAD", "Bread", dec!(2.50)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "5.00",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-BREAD", "quantity": 2 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(decimal(&body["data"]["change"]), dec!(0));
}

#[tokio::test]
async fn insufficient_money_is_rejected() {
    let app = TestApp::new().await;
    app.stock_product("SKU-WINE", "Wine", dec!(25)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "20",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-WINE", "quantity": 1 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Insufficient balance"));
    assert_eq!(body["path"], "/api/v1/sales");
}

#[tokio::test]
async fn missing_payment_type_is_rejected() {
    let app = TestApp::new().await;
    app.stock_product("SKU-JAM", "Jam", dec!(3)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "10",
                "items": [{ "productId": "SKU-JAM", "quantity": 1 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("payment type not entered"));
}

#[tokio::test]
async fn card_only_sale_needs_no_money() {
    let app = TestApp::new().await;
    app.stock_product("SKU-BOOK", "Paperback", dec!(12.99)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "paymentType": "CARD",
                "items": [{ "productId": "SKU-BOOK", "quantity": 1 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["paymentType"], "CARD");
    assert_eq!(decimal(&body["data"]["change"]), dec!(0));
}

#[tokio::test]
async fn split_payment_covers_only_the_cash_portion() {
    let app = TestApp::new().await;
    app.stock_product("SKU-CHEESE", "Cheese", dec!(30)).await;
    app.stock_product("SKU-HAM", "Ham", dec!(70)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "30",
                "items": [
                    { "productId": "SKU-CHEESE", "quantity": 1, "paymentType": "CASH" },
                    { "productId": "SKU-HAM", "quantity": 1, "paymentType": "CARD" }
                ]
            })),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["paymentType"], "MIXED");
    assert_eq!(decimal(&body["data"]["totalPrice"]), dec!(100));
    assert_eq!(decimal(&body["data"]["change"]), dec!(0));
}

#[tokio::test]
async fn out_of_stock_product_fails_with_400() {
    let app = TestApp::new().await;
    app.out_of_stock_product("SKU-GONE", "Sold Out", dec!(5)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "10",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-GONE", "quantity": 1 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("out of stock"));
}

#[tokio::test]
async fn disabled_product_fails_with_400() {
    let app = TestApp::new().await;
    app.disabled_product("SKU-OFF", "Delisted", dec!(5)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "10",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-OFF", "quantity": 1 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("disabled"));
}

#[tokio::test]
async fn unknown_product_fails_with_404() {
    let app = TestApp::new().await;
    app.unknown_product("SKU-NOPE").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "10",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-NOPE", "quantity": 1 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn inventory_outage_fails_with_500() {
    let app = TestApp::new().await;
    app.failing_inventory("SKU-DOWN").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "10",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-DOWN", "quantity": 1 }]
            })),
        )
        .await;

    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Inventory service unavailable"));
}

#[tokio::test]
async fn whole_sale_aborts_when_one_line_fails() {
    let app = TestApp::new().await;
    app.stock_product("SKU-OK", "Fine", dec!(5)).await;
    app.out_of_stock_product("SKU-EMPTY", "Empty", dec!(5)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "100",
                "paymentType": "CASH",
                "items": [
                    { "productId": "SKU-OK", "quantity": 1 },
                    { "productId": "SKU-EMPTY", "quantity": 1 }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), 400);

    // Nothing persisted: the sales list stays empty.
    let response = app.request(Method::GET, "/api/v1/sales", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "10",
                "paymentType": "CASH",
                "items": []
            })),
        )
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request_with_token(Method::GET, "/api/v1/sales", None, None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn token_without_permission_is_forbidden() {
    let app = TestApp::new().await;
    let token = token_with_permission(&app.state.config, perm::SALES_CREATE);

    // Can create...
    app.stock_product("SKU-PEN", "Pen", dec!(1)).await;
    let response = app
        .request_with_token(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "1",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-PEN", "quantity": 1 }]
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);

    // ...but not list.
    let response = app
        .request_with_token(Method::GET, "/api/v1/sales", None, Some(&token))
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn sale_commits_consumption_to_inventory() {
    let app = TestApp::new().await;
    app.stock_product("SKU-SODA", "Soda", dec!(2)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "money": "10",
                "paymentType": "CASH",
                "items": [{ "productId": "SKU-SODA", "quantity": 3 }]
            })),
        )
        .await;
    assert_eq!(response.status(), 200);

    // The consumption report is fire-and-forget; give the detached task a
    // moment to land on the stub.
    for _ in 0..50 {
        let received = app
            .inventory_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|req| req.url.path() == "/inventory/commit");
        if received {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("inventory commit notification never arrived");
}
