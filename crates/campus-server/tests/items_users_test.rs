//! Item and profile CRUD, plus the account-created hook

mod common;

use common::{spawn_app, spawn_app_on, spawn_app_with};
use serde_json::{json, Value};
use uuid::Uuid;

use campus_server::ServerConfig;
use campus_store::Database;

#[tokio::test]
async fn test_item_crud_and_counters() {
    let app = spawn_app();
    app.create_user("lena", "lena@iitrpr.ac.in");

    let item = app.create_item("lena", "Cycle").await;
    let id = item["id"].as_str().unwrap().to_string();
    assert_eq!(item["available"], true);
    assert_eq!(app.db().get_user("lena").unwrap().listed_items, 1);

    let updated = app
        .server
        .post("/updateItem")
        .json(&json!({ "itemId": id, "price": 55.5, "available": false }))
        .await;
    assert_eq!(updated.status_code(), 200);
    let updated = updated.json::<Value>();
    assert_eq!(updated["price"], 55.5);
    assert_eq!(updated["title"], "Cycle");

    let fetched = app.server.get("/getItem").add_query_param("itemId", &id).await;
    assert_eq!(fetched.json::<Value>()["available"], false);

    let deleted = app.server.delete("/deleteItem").add_query_param("itemId", &id).await;
    assert_eq!(deleted.status_code(), 200);
    assert_eq!(app.db().get_user("lena").unwrap().listed_items, 0);

    let gone = app.server.get("/getItem").add_query_param("itemId", &id).await;
    assert_eq!(gone.status_code(), 404);
}

#[tokio::test]
async fn test_list_items_filters() {
    let app = spawn_app();
    app.create_item("lena", "Cycle").await;
    app.clock.advance(chrono::Duration::minutes(1));
    app.create_item("lena", "Helmet").await;
    app.create_item("zoe", "Books").await;

    let lenas = app
        .server
        .get("/listItems")
        .add_query_param("ownerId", "lena")
        .await
        .json::<Vec<Value>>();
    let titles: Vec<_> = lenas.iter().map(|i| i["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Helmet", "Cycle"]);

    let shared = app
        .server
        .get("/listItems")
        .add_query_param("listingType", "share")
        .await
        .json::<Vec<Value>>();
    assert!(shared.is_empty());

    let bad = app.server.get("/listItems").add_query_param("listingType", "sell").await;
    assert_eq!(bad.status_code(), 400);
}

#[tokio::test]
async fn test_item_validation() {
    let app = spawn_app();

    let negative = app
        .server
        .post("/createItem")
        .json(&json!({
            "ownerId": "lena", "title": "Cycle", "price": -1.0,
            "listingType": "rent", "category": "sports"
        }))
        .await;
    assert_eq!(negative.status_code(), 400);

    let empty_update = app
        .server
        .post("/updateItem")
        .json(&json!({ "itemId": Uuid::new_v4() }))
        .await;
    assert_eq!(empty_update.status_code(), 400);

    let missing = app
        .server
        .post("/updateItem")
        .json(&json!({ "itemId": Uuid::new_v4(), "title": "New" }))
        .await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_profile_read_and_update() {
    let app = spawn_app();
    app.create_user("amir", "amir@iitrpr.ac.in");

    let user = app.server.get("/getUser").add_query_param("uid", "amir").await;
    assert_eq!(user.status_code(), 200);
    assert_eq!(user.json::<Value>()["trustScore"], 5);

    let updated = app
        .server
        .post("/updateUser")
        .json(&json!({ "uid": "amir", "displayName": "Amir K" }))
        .await
        .json::<Value>();
    assert_eq!(updated["displayName"], "Amir K");
    assert_eq!(updated["email"], "amir@iitrpr.ac.in");

    let unknown = app
        .server
        .post("/updateUser")
        .json(&json!({ "uid": "ghost", "displayName": "Boo" }))
        .await;
    assert_eq!(unknown.status_code(), 404);

    let all = app.server.get("/listUsers").await.json::<Vec<Value>>();
    assert_eq!(all.len(), 1);

    let no_uid = app.server.get("/getUser").await;
    assert_eq!(no_uid.status_code(), 400);
}

#[tokio::test]
async fn test_account_hook() {
    let app = spawn_app_with(ServerConfig {
        hook_token: Some("hook-secret".into()),
        ..ServerConfig::default()
    });
    let event = json!({
        "uid": "new-user",
        "email": "new@iitrpr.ac.in",
        "displayName": "New User",
        "photoUrl": null,
    });

    let denied = app.server.post("/hooks/userCreated").json(&event).await;
    assert_eq!(denied.status_code(), 403);
    assert!(app.db().get_user("new-user").is_err());

    let accepted = app
        .server
        .post("/hooks/userCreated")
        .authorization_bearer("hook-secret")
        .json(&event)
        .await;
    assert_eq!(accepted.status_code(), 202);

    let user = app.db().get_user("new-user").unwrap();
    assert_eq!(user.trust_score, 5);
    assert_eq!(user.display_name, "New User");
}

#[tokio::test]
async fn test_hook_disabled_without_token() {
    let app = spawn_app();
    let response = app
        .server
        .post("/hooks/userCreated")
        .authorization_bearer("anything")
        .json(&json!({ "uid": "u1" }))
        .await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app();
    let health = app.server.get("/health").await.json::<Value>();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["outboxBacklog"], 0);
}

#[tokio::test]
async fn test_data_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("campus.db");

    let first = spawn_app_on(ServerConfig::default(), Database::open_at(&path).unwrap());
    let item = first.create_item("lena", "Projector").await;
    drop(first);

    let second = spawn_app_on(ServerConfig::default(), Database::open_at(&path).unwrap());
    let fetched = second
        .server
        .get("/getItem")
        .add_query_param("itemId", item["id"].as_str().unwrap())
        .await;
    assert_eq!(fetched.status_code(), 200);
    assert_eq!(fetched.json::<Value>()["title"], "Projector");
}
