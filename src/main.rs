use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use transport_payments::config::AppConfig;
use transport_payments::domain::ports::{PaymentLedger, PricingConfigStore, ShipmentStatusSource};
use transport_payments::gateways::mock::MockGateway;
use transport_payments::gateways::stripe::StripeGateway;
use transport_payments::gateways::PaymentGateway;
use transport_payments::repo::payment_records_repo::PaymentRecordsRepo;
use transport_payments::repo::pricing_config_repo::PricingConfigRepo;
use transport_payments::service::reconciler::WebhookReconciler;
use transport_payments::service::refund_policy::RefundPolicy;
use transport_payments::service::split_payment::SplitPaymentCoordinator;
use transport_payments::shipments::HttpShipmentService;
use transport_payments::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let pricing_repo = PricingConfigRepo { pool: pool.clone() };
    pricing_repo.ensure_seeded().await?;
    let config_store: Arc<dyn PricingConfigStore> = Arc::new(pricing_repo);

    let ledger: Arc<dyn PaymentLedger> = Arc::new(PaymentRecordsRepo { pool: pool.clone() });

    let gateway: Arc<dyn PaymentGateway> = if cfg.gateway_adapter == "STRIPE" {
        Arc::new(StripeGateway {
            base_url: cfg.gateway_base_url.clone(),
            secret_key: cfg.gateway_secret_key.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: reqwest::Client::new(),
        })
    } else {
        Arc::new(MockGateway::new("ALWAYS_SUCCESS"))
    };

    let shipments: Arc<dyn ShipmentStatusSource> = Arc::new(HttpShipmentService {
        base_url: cfg.shipment_service_url.clone(),
        timeout_ms: cfg.shipment_timeout_ms,
        client: reqwest::Client::new(),
    });

    let coordinator = Arc::new(SplitPaymentCoordinator {
        ledger: ledger.clone(),
        gateway,
        shipments,
        refund_policy: RefundPolicy::default(),
        currency: cfg.currency.clone(),
    });
    let reconciler = Arc::new(WebhookReconciler {
        ledger: ledger.clone(),
    });

    let state = AppState {
        coordinator,
        reconciler,
        ledger,
        config_store,
        webhook_secret: cfg.webhook_secret.clone(),
    };

    let admin_key = cfg.internal_api_key.clone();
    let admin_routes = Router::new()
        .route(
            "/pricing-config",
            patch(transport_payments::http::handlers::pricing_config::update_pricing_config),
        )
        .route(
            "/pricing-config/history",
            get(transport_payments::http::handlers::pricing_config::get_pricing_config_history),
        )
        .layer(from_fn_with_state(
            admin_key,
            transport_payments::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/health", get(transport_payments::http::handlers::quotes::health))
        .route("/quotes", post(transport_payments::http::handlers::quotes::create_quote))
        .route(
            "/payments/:shipment_id",
            get(transport_payments::http::handlers::payments::get_payment),
        )
        .route(
            "/payments/:shipment_id/deposit",
            post(transport_payments::http::handlers::payments::create_deposit),
        )
        .route(
            "/payments/:shipment_id/deposit/confirm",
            post(transport_payments::http::handlers::payments::confirm_deposit),
        )
        .route(
            "/payments/:shipment_id/final",
            post(transport_payments::http::handlers::payments::create_final_charge),
        )
        .route(
            "/payments/:shipment_id/final/confirm",
            post(transport_payments::http::handlers::payments::confirm_final),
        )
        .route(
            "/payments/:shipment_id/cancel",
            post(transport_payments::http::handlers::payments::cancel_payment),
        )
        .route(
            "/payments/:shipment_id/refund-eligibility",
            get(transport_payments::http::handlers::payments::refund_eligibility),
        )
        .route(
            "/payments/:shipment_id/refund",
            post(transport_payments::http::handlers::payments::process_refund),
        )
        .route(
            "/webhooks/payment",
            post(transport_payments::http::handlers::webhooks::receive_payment_event),
        )
        .route(
            "/pricing-config",
            get(transport_payments::http::handlers::pricing_config::get_pricing_config),
        )
        .merge(admin_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
