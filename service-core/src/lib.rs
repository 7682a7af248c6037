//! service-core: shared HTTP plumbing for the pet-hotel services.
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod observability;
