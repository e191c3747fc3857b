//! Asset lifecycle over HTTP: list, verify, tokenize, trade, distribute, delist.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn full_lifecycle_from_listing_to_delisting() {
    let app = TestApp::new();
    let id = app.create_asset(MANAGER, "Harbour Office", 100_000_000).await;

    let asset = app.get(&format!("/api/assets/{}", id)).await;
    assert_eq!(asset.status, StatusCode::OK);
    assert_eq!(asset.data()["status"], "pending");
    assert_eq!(asset.data()["owner"], "mgr-1");
    assert_eq!(asset.data()["verification_status"], "unverified");

    app.verify_asset(&id).await;
    let asset = app.get(&format!("/api/assets/{}", id)).await;
    assert_eq!(asset.data()["status"], "verified");
    assert_eq!(asset.data()["verification_status"], "approved");
    assert_eq!(asset.data()["verifications"].as_array().unwrap().len(), 2);

    let res = app
        .post(
            &format!("/api/assets/{}/documents", id),
            MANAGER,
            json!({
                "name": "Title deed",
                "url": "https://docs.example.com/deed.pdf",
                "sha256": "AB".repeat(32)
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["documents"][0]["sha256"], "ab".repeat(32));

    let res = app
        .post(
            &format!("/api/assets/{}/tokenize", id),
            MANAGER,
            json!({ "symbol": "HARB", "total_shares": 1000, "share_price": 10_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["status"], "tokenized");
    let token_account = res.data()["tokenization"]["token_account"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(res.data()["tokenization"]["is_tradable"], false);
    let on_chain = app.ledger.account(&token_account).unwrap();
    assert!(on_chain.is_verified);

    let res = app
        .post(
            &format!("/api/assets/{}/tradability", id),
            MANAGER,
            json!({ "is_tradable": true }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert!(app.ledger.account(&token_account).unwrap().is_tradable);

    let res = app
        .post(
            &format!("/api/assets/{}/valuations", id),
            VERIFIER,
            json!({ "amount": 200_000_000, "source": "appraisal" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["valuation"], 2_000_000_00u64);
    assert_eq!(app.ledger.account(&token_account).unwrap().valuation, 200_000_000);

    let res = app
        .post(
            &format!("/api/assets/{}/income", id),
            MANAGER,
            json!({ "amount": 500_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["tokenization"]["total_income_distributed"], 500_000);

    let history = app.get(&format!("/api/assets/{}/history", id)).await;
    assert_eq!(history.status, StatusCode::OK);
    let statuses: Vec<&str> = history.data()["status_history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["to"].as_str().unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec!["pending", "verifying", "verified", "tokenizing", "tokenized"]
    );
    assert_eq!(history.data()["valuation_history"].as_array().unwrap().len(), 2);

    let res = app
        .post(
            &format!("/api/assets/{}/delist", id),
            ADMIN,
            json!({ "reason": "sold off-market" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["status"], "delisted");
    assert_eq!(res.data()["tokenization"]["is_burned"], true);
    assert!(app.ledger.account(&token_account).unwrap().is_burned);

    // Delisted is terminal.
    let res = app
        .put(
            &format!("/api/assets/{}", id),
            ADMIN,
            json!({ "name": "Renamed" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_tokenization_rolls_back_to_verified() {
    let app = TestApp::new();
    let id = app.create_asset(MANAGER, "Vineyard", 50_000_000).await;
    app.verify_asset(&id).await;
    app.ledger.fail_on("create_asset_token");

    let res = app
        .post(
            &format!("/api/assets/{}/tokenize", id),
            MANAGER,
            json!({ "symbol": "VINE", "total_shares": 100, "share_price": 100_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY, "{}", res.body);
    assert_eq!(res.code(), "CHAIN_ERROR");

    let asset = app.get(&format!("/api/assets/{}", id)).await;
    assert_eq!(asset.data()["status"], "verified");
    assert!(asset.data().get("tokenization").is_none());
    assert_eq!(app.ledger.account_count(), 0);

    // The asset can be tokenized once the ledger recovers.
    app.ledger.clear_failures();
    let res = app
        .post(
            &format!("/api/assets/{}/tokenize", id),
            MANAGER,
            json!({ "symbol": "VINE", "total_shares": 100, "share_price": 100_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
}

#[tokio::test]
async fn tradability_failure_on_chain_leaves_asset_unchanged() {
    let app = TestApp::new();
    let id = app.create_asset(MANAGER, "Gallery Piece", 8_000_000).await;
    app.verify_asset(&id).await;
    let res = app
        .post(
            &format!("/api/assets/{}/tokenize", id),
            MANAGER,
            json!({ "symbol": "ART1", "total_shares": 80, "share_price": 100_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    app.ledger.fail_on("toggle_tradability");
    let res = app
        .post(
            &format!("/api/assets/{}/tradability", id),
            MANAGER,
            json!({ "is_tradable": true }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);

    let asset = app.get(&format!("/api/assets/{}", id)).await;
    assert_eq!(asset.data()["tokenization"]["is_tradable"], false);
}

#[tokio::test]
async fn income_failure_on_chain_leaves_totals_unchanged() {
    let app = TestApp::new();
    let id = app.create_asset(MANAGER, "Vineyard Plot", 8_000_000).await;
    app.verify_asset(&id).await;
    let res = app
        .post(
            &format!("/api/assets/{}/tokenize", id),
            MANAGER,
            json!({ "symbol": "VINE", "total_shares": 80, "share_price": 100_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let account = res.data()["tokenization"]["token_account"]
        .as_str()
        .unwrap()
        .to_string();

    let income = format!("/api/assets/{}/income", id);
    let res = app.post(&income, MANAGER, json!({ "amount": 40_000 })).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    app.ledger.fail_on("distribute_income");
    let res = app.post(&income, MANAGER, json!({ "amount": 10_000 })).await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    assert_eq!(res.code(), "CHAIN_ERROR");

    let asset = app.get(&format!("/api/assets/{}", id)).await;
    assert_eq!(asset.data()["tokenization"]["total_income_distributed"], 40_000);
    assert_eq!(
        app.ledger.account(&account).unwrap().total_income_distributed,
        40_000
    );
}

#[tokio::test]
async fn names_are_limited_in_bytes() {
    let app = TestApp::new();
    // 100 characters, 200 bytes.
    let res = app
        .post(
            "/api/assets",
            MANAGER,
            json!({ "name": "é".repeat(100), "category": "art", "valuation": 1_000_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.body);

    let res = app
        .post(
            "/api/assets",
            MANAGER,
            json!({ "name": "é".repeat(50), "category": "art", "valuation": 1_000_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
}

#[tokio::test]
async fn tokenize_requires_verification_and_respects_valuation() {
    let app = TestApp::new();
    let id = app.create_asset(MANAGER, "Warehouse", 10_000_000).await;
    let uri = format!("/api/assets/{}/tokenize", id);

    let res = app
        .post(&uri, MANAGER, json!({ "symbol": "WH", "total_shares": 10, "share_price": 100 }))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    app.verify_asset(&id).await;
    let res = app
        .post(
            &uri,
            MANAGER,
            json!({ "symbol": "WH", "total_shares": 1000, "share_price": 100_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].as_str().unwrap().contains("exceeds the asset valuation"));

    let res = app
        .post(&uri, MANAGER, json!({ "symbol": "wh", "total_shares": 10, "share_price": 100 }))
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn managers_only_touch_their_own_assets() {
    let app = TestApp::new();
    let id = app.create_asset(MANAGER, "Loft", 30_000_000).await;

    let res = app
        .put(
            &format!("/api/assets/{}", id),
            OTHER_MANAGER,
            json!({ "description": "hijacked" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .put(
            &format!("/api/assets/{}", id),
            ADMIN,
            json!({ "description": "Corrected by admin" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["description"], "Corrected by admin");
}

#[tokio::test]
async fn update_cannot_jump_into_tokenized_states() {
    let app = TestApp::new();
    let id = app.create_asset(MANAGER, "Barn", 5_000_000).await;
    let res = app
        .put(
            &format!("/api/assets/{}", id),
            ADMIN,
            json!({ "status": "tokenized" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .put(
            &format!("/api/assets/{}", id),
            ADMIN,
            json!({ "status": "rejected", "reason": "missing title deed" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["status"], "rejected");

    let res = app
        .put(
            &format!("/api/assets/{}", id),
            MANAGER,
            json!({ "status": "verifying" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    // Resubmission.
    let res = app
        .put(
            &format!("/api/assets/{}", id),
            MANAGER,
            json!({ "status": "pending" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["status"], "pending");
}

#[tokio::test]
async fn delete_is_refused_for_tokenized_assets() {
    let app = TestApp::new();
    let plain = app.create_asset(MANAGER, "Shed", 1_000_000).await;
    let res = app
        .call(Method::DELETE, &format!("/api/assets/{}", plain), Some(ADMIN), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/api/assets/{}", plain)).await.status, StatusCode::NOT_FOUND);

    let tokenized = app.create_asset(MANAGER, "Tower", 90_000_000).await;
    app.verify_asset(&tokenized).await;
    let res = app
        .post(
            &format!("/api/assets/{}/tokenize", tokenized),
            MANAGER,
            json!({ "symbol": "TWR", "total_shares": 900, "share_price": 100_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app
        .call(Method::DELETE, &format!("/api/assets/{}", tokenized), Some(ADMIN), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn listing_filters_search_and_category() {
    let app = TestApp::new();
    app.create_asset(MANAGER, "Riverside Flat", 20_000_000).await;
    app.create_asset(OTHER_MANAGER, "Mountain Cabin", 15_000_000).await;
    let res = app
        .post(
            "/api/assets",
            MANAGER,
            json!({ "name": "Gold Bars", "category": "commodity", "valuation": 7_500_000 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let all = app.get("/api/assets?per_page=2").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.data()["total"], 3);
    assert_eq!(all.data()["items"].as_array().unwrap().len(), 2);
    assert_eq!(all.data()["per_page"], 2);

    let mine = app.get("/api/assets?owner=mgr-1").await;
    assert_eq!(mine.data()["total"], 2);

    let commodities = app.get("/api/assets/category/commodity").await;
    assert_eq!(commodities.status, StatusCode::OK);
    assert_eq!(commodities.data()["items"][0]["name"], "Gold Bars");

    let unknown = app.get("/api/assets/category/spaceships").await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let found = app.get("/api/assets/search?q=cabin").await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.data().as_array().unwrap().len(), 1);

    let bad_page = app.get("/api/assets?per_page=500").await;
    assert_eq!(bad_page.status, StatusCode::BAD_REQUEST);
}
