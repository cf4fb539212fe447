pub mod backend;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{middleware, Json, Router};
use casedesk_core::config::GatewayConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the axum Router with every proxy route, the session guard and the
/// page fallback. Used by `serve()` and available for integration testing.
pub fn build_router(config: GatewayConfig) -> anyhow::Result<Router> {
    let static_dir = config.static_dir.clone();
    let body_limit = config.max_upload_bytes;
    let app_state = state::AppState::new(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        // Auth
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route(
            "/api/auth/forgot-password",
            post(routes::auth::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(routes::auth::reset_password),
        )
        // Cases
        .route("/api/case", post(routes::cases::create_case))
        .route("/api/case/user/all-cases", get(routes::cases::all_cases))
        .route(
            "/api/case/document/{id}/content",
            get(routes::cases::document_content),
        )
        .route("/api/case/{id}", get(routes::cases::get_case))
        .route(
            "/api/case/{id}/case-documents",
            get(routes::cases::case_documents),
        )
        .route(
            "/api/case/{id}/mark-resolved",
            patch(routes::cases::mark_resolved),
        )
        .route(
            "/api/case/{id}/outcome",
            get(routes::cases::get_outcome).post(routes::cases::record_outcome),
        )
        .route(
            "/api/cases/{case_id}/documents",
            get(routes::cases::list_documents),
        )
        .route(
            "/api/cases/{case_id}/messages",
            get(routes::cases::list_messages),
        )
        // Chat
        .route("/api/chat/send", post(routes::chat::send_message))
        // Documents
        .route("/api/documents/generate", post(routes::documents::generate))
        .route(
            "/api/documents/export",
            post(routes::documents::export_document),
        )
        .route(
            "/api/documents/{id}",
            axum::routing::delete(routes::documents::delete_document),
        )
        .route(
            "/api/documents/{id}/download",
            get(routes::documents::download),
        )
        // Feedback
        .route(
            "/api/feedback/cases/{case_id}/feedback",
            get(routes::feedback::list_feedback).post(routes::feedback::create_feedback),
        )
        .route(
            "/api/feedback/cases/{case_id}/feedback/statistics",
            get(routes::feedback::statistics),
        )
        .route(
            "/api/feedback/cases/{case_id}/pending-feedback",
            get(routes::feedback::pending),
        )
        .route(
            "/api/feedback/cases/{case_id}/pending-feedback/send",
            post(routes::feedback::send_pending),
        )
        .route(
            "/api/feedback/{id}",
            get(routes::feedback::get_feedback)
                .put(routes::feedback::update_feedback)
                .delete(routes::feedback::delete_feedback),
        )
        .route(
            "/api/feedback/{id}/documents",
            post(routes::feedback::upload_documents),
        )
        .route(
            "/api/feedback/{id}/analyze",
            post(routes::feedback::analyze),
        )
        // Payments
        .route("/api/payments", get(routes::billing::list_payments))
        .route(
            "/api/payments/initialize",
            post(routes::billing::initialize_payment),
        )
        .route("/api/payments/gateways", get(routes::billing::gateways))
        .route("/api/payments/{id}", get(routes::billing::get_payment))
        .route(
            "/api/payments/{id}/verify",
            post(routes::billing::verify_payment),
        )
        .route(
            "/api/payments/{id}/mark-received",
            post(routes::billing::mark_received),
        )
        .route("/api/payments/{id}/refund", post(routes::billing::refund))
        // Credits, subscriptions, usage
        .route(
            "/api/credits/purchase",
            post(routes::billing::purchase_credits),
        )
        .route(
            "/api/subscription/downgrade",
            post(routes::billing::downgrade),
        )
        .route(
            "/api/subscriptions/store-or-update",
            post(routes::billing::store_or_update),
        )
        .route(
            "/api/user/subscription",
            get(routes::billing::user_subscription),
        )
        .route("/api/usage/summary", get(routes::billing::usage_summary))
        .route("/api/usage/summery", get(routes::billing::usage_summary))
        // Contact
        .route(
            "/api/contact",
            get(routes::contact::contact_info).post(routes::contact::submit_contact),
        );

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found),
    };

    Ok(router
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            session::session_guard,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "message": "Not found" })),
    )
}

/// Start the gateway on the configured port.
pub async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(config, listener).await
}

/// Start the gateway on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    config: GatewayConfig,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let backend_url = config.backend_url.clone();
    let app = build_router(config)?;

    tracing::info!(backend = %backend_url, "casedesk listening on http://localhost:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
