pub mod database;
pub mod memory;
pub mod metrics;
pub mod payments;
pub mod reports;
pub mod store;

pub use database::PgPaymentStore;
pub use memory::InMemoryPaymentStore;
pub use metrics::{get_metrics, init_metrics};
pub use payments::PaymentManager;
pub use reports::RevenueReporter;
pub use store::PaymentStore;
