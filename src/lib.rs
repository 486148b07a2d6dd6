//! AulaPay school-fee payment orchestration
//!
//! Core of the payment layer for school fee collection: a normalized
//! gateway contract with four provider adapters, a recommendation
//! engine, a persistent payment ledger and an idempotent webhook
//! reconciler.

pub mod config;
pub mod core;
pub mod modules;

use actix_web::web;

pub use modules::gateways;
pub use modules::payments;

/// All payment routes under `/api/payments`, shared by the binary and
/// the in-process test harness.
pub fn payment_scope() -> actix_web::Scope {
    web::scope("/api/payments")
        .configure(modules::gateways::controllers::gateway_controller::configure)
        .configure(modules::payments::controllers::payment_controller::configure)
        .configure(modules::payments::controllers::webhook_controller::configure)
}
