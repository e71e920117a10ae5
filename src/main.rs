use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, patch, post, put},
    Extension, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use ekklesia_api::config::{config, ApiConfig};
use ekklesia_api::database::DatabaseManager;
use ekklesia_api::handlers;
use ekklesia_api::payment::{gateway_from_config, SharedGateway};
use ekklesia_api::uploads::PUBLIC_PREFIX;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, RUST_LOG, ABACATEPAY_API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ekklesia_api=debug,tower_http=info")),
        )
        .init();

    let config = config();
    tracing::info!("Starting Ekklesia API in {:?} mode", config.environment);

    if config.database.run_migrations {
        DatabaseManager::migrate().await?;
    }

    let gateway = gateway_from_config(&config.payment)?;
    let app = app(gateway, &config.api);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Ekklesia API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close().await;
    Ok(())
}

fn app(gateway: SharedGateway, api: &ApiConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(people_routes())
        .merge(operations_routes())
        .merge(product_routes())
        .merge(meeting_routes())
        .merge(order_routes())
        .merge(checkout_routes())
        .merge(dashboard_routes())
        .route("/config/churches", get(handlers::config::churches))
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&api.upload_dir))
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&api.cors_origins))
                .layer(DefaultBodyLimit::max(api.max_request_size_bytes))
                .layer(Extension(gateway)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn auth_routes() -> Router {
    use handlers::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/make-admin", post(auth::make_admin))
        .route("/register", post(auth::register))
        .route("/person/by-email", get(auth::person_by_email))
}

fn people_routes() -> Router {
    use handlers::{export, people};

    Router::new()
        .route("/people", get(people::search_with_presence))
        .route("/people/quick-register", post(people::quick_register))
        .route("/people/search", get(people::search))
        .route("/people/incomplete", get(people::incomplete))
        .route("/person/:id", put(people::update_person))
        .route("/export", get(export::export_people))
}

fn operations_routes() -> Router {
    use handlers::operations;

    Router::new()
        .route("/operations/checkpoints", get(operations::checkpoints))
        .route("/operations/count", post(operations::count))
        .route("/operations/track", post(operations::track))
        .route("/operations/sales", post(operations::manual_sale))
}

fn product_routes() -> Router {
    use handlers::products;

    Router::new()
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/:id", delete(products::delete_product))
}

fn meeting_routes() -> Router {
    use handlers::meetings;

    Router::new()
        .route("/meetings", get(meetings::list_meetings).post(meetings::create_meeting))
        .route("/meetings/:id", delete(meetings::delete_meeting))
}

fn order_routes() -> Router {
    use handlers::orders;

    Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/pending", get(orders::pending))
        .route("/orders/check-status/:payment_id", get(orders::check_status))
        .route("/orders/webhook/abacatepay", post(orders::abacatepay_webhook))
        .route("/orders/:id/deliver", patch(orders::deliver))
}

fn checkout_routes() -> Router {
    use handlers::checkout;

    Router::new()
        .route("/checkout/full", post(checkout::checkout_full))
        .route("/checkout/orders/pending", get(checkout::pending_orders))
        .route("/checkout/orders/pay", post(checkout::pay_order))
        .route("/checkout/orders/reject", post(checkout::reject_order))
        .route("/checkout/orders/deliver", post(checkout::deliver_order))
        .route("/checkout/orders/:code", get(checkout::order_by_code))
        .route("/checkout/person/:id/orders", get(checkout::person_orders))
}

fn dashboard_routes() -> Router {
    use handlers::dashboard;

    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/dashboard/meeting-count", get(dashboard::meeting_count))
        .route(
            "/dashboard/meeting-count/increment",
            post(dashboard::increment_meeting_count),
        )
        .route("/dashboard/consolidation/save", post(dashboard::save_consolidation))
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "online",
        "timestamp": chrono::Utc::now()
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
