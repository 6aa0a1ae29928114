pub mod provider;
pub mod razorpay;
pub mod reconciliation;
pub mod signature;
pub mod stripe;

pub use provider::{minor_units, PaymentProvider, ProviderRegistry};
pub use razorpay::RazorpayProvider;
pub use reconciliation::PaymentReconciliationService;
pub use stripe::{confirmation_from_event, StripeProvider, StripeWebhookVerifier};
