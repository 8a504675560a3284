use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use campus_server::api::{self, AppState};
use campus_server::clock::SystemClock;
use campus_server::config::ServerConfig;
use campus_server::notify::{
    ApiEmailSender, ConsoleEmailSender, EmailSender, FromAddress, RoutingEmailSender,
    SmtpEmailSender,
};
use campus_server::sweep;
use campus_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,campus_server=debug")),
        )
        .init();

    info!("Starting campus rentals server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Arc::new(Database::open_at(&config.database_path)?);
    info!(path = ?db.path(), "Database ready");

    let from = FromAddress {
        email: config.email_from.clone(),
        name: config.email_from_name.clone(),
    };
    let sender = build_email_sender(&config, &from);

    let http_addr = config.http_addr;
    let poll = Duration::from_secs(config.outbox_poll_secs);
    let app_state = AppState::new(config, db, sender, Arc::new(SystemClock));

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Outbox dispatcher: drains on wake-up and every poll interval
    tokio::spawn(app_state.dispatcher.clone().run(poll));

    // Daily rental sweep at the configured campus-local time
    sweep::spawn_daily(app_state.clone());

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let ip_limiter = app_state.ip_limiter.clone();
    let otp_limiter = app_state.otp_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            ip_limiter.purge_stale(600.0).await;
            otp_limiter.purge_stale(3600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

/// Verification codes prefer SMTP, everything else prefers the email API.
/// Missing backends fall back to the other one, then to the console.
fn build_email_sender(config: &ServerConfig, from: &FromAddress) -> Arc<dyn EmailSender> {
    let smtp: Option<Arc<dyn EmailSender>> = config.smtp.as_ref().and_then(|smtp| {
        match SmtpEmailSender::new(smtp, from) {
            Ok(sender) => {
                if let Err(e) = sender.test_connection() {
                    warn!(error = %e, "SMTP connection test failed; will retry on send");
                }
                Some(Arc::new(sender) as Arc<dyn EmailSender>)
            }
            Err(e) => {
                warn!(error = %e, "SMTP disabled");
                None
            }
        }
    });

    let http: Option<Arc<dyn EmailSender>> = config
        .email_api
        .as_ref()
        .map(|api| Arc::new(ApiEmailSender::new(api, from.clone())) as Arc<dyn EmailSender>);

    let console = || Arc::new(ConsoleEmailSender::new()) as Arc<dyn EmailSender>;
    if smtp.is_none() && http.is_none() {
        info!("No email backend configured; emails go to the console");
    }

    let otp = smtp.clone().or_else(|| http.clone()).unwrap_or_else(console);
    let transactional = http.or(smtp).unwrap_or_else(console);
    Arc::new(RoutingEmailSender::new(otp, transactional))
}
