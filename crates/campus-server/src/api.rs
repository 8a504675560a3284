use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::State,
    http::Method,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use campus_store::Database;

use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::notify::{Dispatcher, EmailSender};
use crate::rate_limit::{otp_send_limiter, rate_limit_middleware, RateLimiter};
use crate::routes::{chats, hooks, items, notify, otp, rentals, users, wishlist};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub clock: Arc<dyn Clock>,
    pub dispatcher: Dispatcher,
    pub ip_limiter: RateLimiter<IpAddr>,
    pub otp_limiter: RateLimiter<String>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        db: Arc<Database>,
        sender: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&db),
            sender,
            Arc::clone(&clock),
            &config.app_base_url,
            config.campus_offset,
            config.outbox_max_attempts,
        );
        Self {
            db,
            clock,
            dispatcher,
            ip_limiter: RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst),
            otp_limiter: otp_send_limiter(),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // identity bridge
        .route("/hooks/userCreated", post(hooks::user_created))
        // otp
        .route("/sendOtpEmail", post(otp::send_otp_email))
        .route("/verifyOtp", post(otp::verify_otp))
        // users
        .route("/getUser", get(users::get_user))
        .route("/listUsers", get(users::list_users))
        .route("/updateUser", post(users::update_user))
        .route("/trustHistory", get(users::trust_history))
        // items
        .route("/createItem", post(items::create_item))
        .route("/getItem", get(items::get_item))
        .route("/updateItem", post(items::update_item))
        .route("/deleteItem", delete(items::delete_item))
        .route("/listItems", get(items::list_items))
        // wishlist
        .route("/addToWishlist", post(wishlist::add_to_wishlist))
        .route("/removeFromWishlist", delete(wishlist::remove_from_wishlist))
        .route("/getWishlist", get(wishlist::get_wishlist))
        // rentals
        .route("/createRental", post(rentals::create_rental))
        .route("/getRental", get(rentals::get_rental))
        .route("/listRentals", get(rentals::list_rentals))
        .route("/markReturned", post(rentals::mark_returned))
        .route("/confirmReturn", post(rentals::confirm_return))
        .route("/triggerRentalReminders", post(rentals::trigger_rental_reminders))
        // chats
        .route("/sendMessage", post(chats::send_message))
        .route("/getMessages", get(chats::get_messages))
        .route("/getChats", get(chats::get_chats))
        .route("/markMessagesDelivered", post(chats::mark_messages_delivered))
        .route("/markMessagesSeen", post(chats::mark_messages_seen))
        // notifications
        .route("/notifyProposalEmail", post(notify::notify_proposal_email))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    rate_limit_middleware,
                )),
        )
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    outbox_backlog: Option<u64>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        outbox_backlog: state.db.outbox_backlog().ok(),
    })
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
