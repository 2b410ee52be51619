//! Contracts for the services a quiz session talks to, with in-memory
//! implementations used by the CLI and tests.

pub mod analytics;
pub mod identity;
pub mod payments;
pub mod store;

pub use analytics::{AnalyticsEvent, AnalyticsSink, MemoryAnalytics, TracingAnalytics};
pub use identity::{IdentityProvider, MemoryIdentityProvider, UserIdentity};
pub use payments::{
    CheckoutSession, Confirmation, Entitlement, MemoryPaymentProvider, PaymentProvider,
    PaymentStatus, Plan,
};
pub use store::{
    DocumentChange, DocumentStore, MemoryDocumentStore, StoreEvent, Subscription, WriteMode,
    draft_path, intake_path, membership_path,
};
