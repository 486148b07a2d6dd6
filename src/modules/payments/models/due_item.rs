use crate::core::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A due installment as seen from the debt-management side.
///
/// Owned by the debt collaborator; this module only reads it to resolve
/// amounts at payment-creation time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DueItem {
    pub due_item_ref: String,
    pub student_ref: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
}
