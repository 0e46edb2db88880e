//! HTTP API
//!
//! Thin routing layer over the domain analyzers. Handlers validate input,
//! call the (infallible) analyzers, and serialize the envelope; no scoring
//! logic lives here.

pub mod analyze;
pub mod health;
pub mod phone;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use phone::phone_routes;
