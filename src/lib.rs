pub mod config;
pub mod domain {
    pub mod payment;
    pub mod ports;
    pub mod quote;
    pub mod shipment;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod payments;
        pub mod pricing_config;
        pub mod quotes;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
}
pub mod pricing {
    pub mod bands;
    pub mod calculator;
    pub mod config;
}
pub mod repo {
    pub mod in_memory;
    pub mod payment_records_repo;
    pub mod pricing_config_repo;
}
pub mod service {
    pub mod reconciler;
    pub mod refund_policy;
    pub mod split_payment;
}
pub mod shipments;
pub mod webhook {
    pub mod event;
    pub mod signature;
}

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<service::split_payment::SplitPaymentCoordinator>,
    pub reconciler: Arc<service::reconciler::WebhookReconciler>,
    pub ledger: Arc<dyn domain::ports::PaymentLedger>,
    pub config_store: Arc<dyn domain::ports::PricingConfigStore>,
    pub webhook_secret: String,
}
