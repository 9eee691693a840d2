pub mod metrics;
pub mod providers;

pub use metrics::{get_metrics, init_metrics, record_notification, record_provider_call};
pub use providers::{
    FcmProvider, MockPushProvider, ProviderError, PushProvider, SendReceipt,
};
