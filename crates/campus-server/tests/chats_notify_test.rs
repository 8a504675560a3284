//! Chat log, read receipts and proposal emails

mod common;

use common::spawn_app;
use serde_json::{json, Value};

use campus_server::notify::EmailCategory;

#[tokio::test]
async fn test_chat_flow() {
    let app = spawn_app();

    let sent = app
        .server
        .post("/sendMessage")
        .json(&json!({ "senderId": "zoe", "receiverId": "amir", "text": "Is the cycle free?" }))
        .await;
    assert_eq!(sent.status_code(), 200);
    assert_eq!(sent.json::<Value>()["chatId"], "amir_zoe");

    app.clock.advance(chrono::Duration::seconds(5));
    app.server
        .post("/sendMessage")
        .json(&json!({ "senderId": "amir", "receiverId": "zoe", "text": "Yes" }))
        .await;

    let chats = app
        .server
        .get("/getChats")
        .add_query_param("uid", "amir")
        .await
        .json::<Vec<Value>>();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["lastMessage"], "Yes");
    assert_eq!(chats[0]["lastSenderId"], "amir");

    let delivered = app
        .server
        .post("/markMessagesDelivered")
        .json(&json!({ "chatId": "amir_zoe", "uid": "amir" }))
        .await;
    assert_eq!(delivered.json::<Value>()["updated"], 1);

    let seen = app
        .server
        .post("/markMessagesSeen")
        .json(&json!({ "chatId": "amir_zoe", "uid": "amir" }))
        .await;
    assert_eq!(seen.json::<Value>()["updated"], 1);

    let log = app
        .server
        .get("/getMessages")
        .add_query_param("chatId", "amir_zoe")
        .await
        .json::<Vec<Value>>();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0]["text"], "Is the cycle free?");
    assert_eq!(log[0]["status"], "seen");
    assert_eq!(log[1]["status"], "sent");

    let chat = app.db().get_chat("amir_zoe").unwrap();
    assert_eq!(chat.unread_for("amir"), 0);
    assert_eq!(chat.unread_for("zoe"), 1);
}

#[tokio::test]
async fn test_chat_errors() {
    let app = spawn_app();

    let to_self = app
        .server
        .post("/sendMessage")
        .json(&json!({ "senderId": "zoe", "receiverId": "zoe", "text": "hi" }))
        .await;
    assert_eq!(to_self.status_code(), 400);

    let missing = app.server.get("/getMessages").add_query_param("chatId", "a_b").await;
    assert_eq!(missing.status_code(), 404);

    app.server
        .post("/sendMessage")
        .json(&json!({ "senderId": "zoe", "receiverId": "amir", "text": "hi" }))
        .await;
    let outsider = app
        .server
        .post("/markMessagesSeen")
        .json(&json!({ "chatId": "amir_zoe", "uid": "mallory" }))
        .await;
    assert_eq!(outsider.status_code(), 400);
}

fn proposal(recipient: Value) -> Value {
    let mut body = json!({
        "senderId": "amir",
        "senderName": "Amir",
        "itemTitle": "Tent",
        "startDate": "2024-01-05",
        "endDate": "2024-01-07",
        "text": "Can I borrow it for the trek?",
        "itemImage": "https://img.example/tent.png",
        "chatId": "amir_lena",
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), recipient.as_object()) {
        body.extend(extra.clone());
    }
    body
}

#[tokio::test]
async fn test_proposal_email_by_recipient_id() {
    let app = spawn_app();
    app.create_user("lena", "lena@iitrpr.ac.in");

    let response = app
        .server
        .post("/notifyProposalEmail")
        .json(&proposal(json!({ "recipientId": "lena" })))
        .await;
    assert_eq!(response.status_code(), 200);

    assert_eq!(app.deliver().await.delivered, 1);
    let mails = app.emails.to("lena@iitrpr.ac.in");
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].category, EmailCategory::Proposal);
    assert!(mails[0].text.contains("/chat/amir_lena"));
    assert!(mails[0].html.contains("tent.png"));
}

#[tokio::test]
async fn test_proposal_email_by_address() {
    let app = spawn_app();
    let response = app
        .server
        .post("/notifyProposalEmail")
        .json(&proposal(json!({ "recipientEmail": "owner@iitrpr.ac.in" })))
        .await;
    assert_eq!(response.status_code(), 200);

    app.deliver().await;
    assert_eq!(app.emails.to("owner@iitrpr.ac.in").len(), 1);
}

#[tokio::test]
async fn test_proposal_without_reachable_recipient() {
    let app = spawn_app();

    let none = app.server.post("/notifyProposalEmail").json(&proposal(json!({}))).await;
    assert_eq!(none.status_code(), 400);

    let no_profile = app
        .server
        .post("/notifyProposalEmail")
        .json(&proposal(json!({ "recipientId": "ghost" })))
        .await;
    assert_eq!(no_profile.status_code(), 400);
    assert_eq!(app.db().outbox_backlog().unwrap(), 0);
}
