pub mod due_items;
pub mod history;
pub mod orchestrator;
pub mod reconciler;

pub use due_items::{DueItemSource, SqlDueItemSource};
pub use history::{HistoryAggregator, HistoryEntry};
pub use orchestrator::{ConfirmResult, CreatePaymentCommand, CreatedPayment, PaymentOrchestrator};
pub use reconciler::{ReconcileOutcome, WebhookReconciler};
