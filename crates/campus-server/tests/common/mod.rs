//! Common test utilities for server integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use campus_server::notify::{DeliveryError, DrainReport, EmailCategory, EmailSender, OutgoingEmail};
use campus_server::{build_router, AppState, ManualClock, ServerConfig};
use campus_store::{Database, ProfileUpsert};

/// Mock email sender that captures every outgoing email
#[derive(Default, Clone)]
pub struct MockEmailSender {
    pub sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl MockEmailSender {
    pub fn all(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.all().into_iter().filter(|e| e.to == address).collect()
    }

    /// Last verification code mailed to an address
    pub fn otp_code(&self, address: &str) -> Option<String> {
        self.to(address)
            .into_iter()
            .rev()
            .find(|e| e.category == EmailCategory::Otp)
            .and_then(|e| {
                e.text
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|run| run.len() == 6)
                    .map(str::to_string)
            })
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub emails: MockEmailSender,
}

/// Monday 2024-01-01 10:00 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(ServerConfig::default())
}

pub fn spawn_app_with(config: ServerConfig) -> TestApp {
    let db = Database::open_in_memory().expect("in-memory database");
    spawn_app_on(config, db)
}

pub fn spawn_app_on(config: ServerConfig, db: Database) -> TestApp {
    let db = Arc::new(db);
    let clock = Arc::new(ManualClock::new(start_time()));
    let emails = MockEmailSender::default();

    let state = AppState::new(config, db, Arc::new(emails.clone()), clock.clone());
    let server = TestServer::new(build_router(state.clone())).expect("Failed to create test server");

    TestApp {
        server,
        state,
        clock,
        emails,
    }
}

impl TestApp {
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Drain the outbox once, as the background worker would.
    pub async fn deliver(&self) -> DrainReport {
        self.state.dispatcher.drain().await
    }

    pub fn create_user(&self, uid: &str, email: &str) {
        self.db()
            .upsert_profile(
                &ProfileUpsert {
                    uid: uid.to_string(),
                    email: Some(email.to_string()),
                    display_name: Some(uid.to_string()),
                    photo_url: None,
                },
                self.clock_now(),
            )
            .unwrap();
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use campus_server::Clock;
        self.clock.now()
    }

    pub fn trust_score(&self, uid: &str) -> i64 {
        self.db().get_user(uid).unwrap().trust_score
    }

    pub async fn create_item(&self, owner: &str, title: &str) -> Value {
        let response = self
            .server
            .post("/createItem")
            .json(&json!({
                "ownerId": owner,
                "title": title,
                "description": "Good condition",
                "price": 40.0,
                "imageUrl": "items/cycle.jpg",
                "listingType": "rent",
                "category": "sports",
            }))
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        response.json::<Value>()
    }

    /// Create a rental and return its id.
    pub async fn create_rental(&self, body: Value) -> String {
        let response = self.server.post("/createRental").json(&body).await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        response.json::<Value>()["rentalId"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub async fn rental(&self, id: &str) -> Value {
        self.server
            .get("/getRental")
            .add_query_param("rentalId", id)
            .await
            .json::<Value>()
    }
}
