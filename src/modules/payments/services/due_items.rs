use crate::core::{AppError, Result};
use crate::modules::payments::models::DueItem;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Read-only view onto the debt collaborator's due installments.
///
/// Amounts are resolved here exactly once, at payment-creation time, and
/// frozen into the ledger rows.
#[async_trait]
pub trait DueItemSource: Send + Sync {
    /// Resolve every reference or fail the whole call. A single invalid
    /// reference is a validation error; nothing may be charged for a
    /// partially-resolved request.
    async fn resolve(&self, due_item_refs: &[String]) -> Result<Vec<DueItem>>;
}

/// A ref listed twice would create two ledger rows for one installment,
/// so it is a validation error, not a deduplication concern.
pub fn reject_duplicates(due_item_refs: &[String]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    let duplicates: Vec<&str> = due_item_refs
        .iter()
        .filter(|r| !seen.insert(r.as_str()))
        .map(String::as_str)
        .collect();
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Duplicate due item reference(s): {}",
            duplicates.join(", ")
        )))
    }
}

pub struct SqlDueItemSource {
    pool: MySqlPool,
}

impl SqlDueItemSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DueItemSource for SqlDueItemSource {
    async fn resolve(&self, due_item_refs: &[String]) -> Result<Vec<DueItem>> {
        if due_item_refs.is_empty() {
            return Err(AppError::validation("At least one due item is required"));
        }
        reject_duplicates(due_item_refs)?;

        let placeholders = vec!["?"; due_item_refs.len()].join(", ");
        let query = format!(
            "SELECT due_item_ref, student_ref, description, amount, currency \
             FROM due_items WHERE due_item_ref IN ({})",
            placeholders
        );

        let mut builder = sqlx::query_as::<_, DueItem>(&query);
        for item_ref in due_item_refs {
            builder = builder.bind(item_ref);
        }
        let found = builder.fetch_all(&self.pool).await?;

        if found.len() != due_item_refs.len() {
            let missing: Vec<&str> = due_item_refs
                .iter()
                .filter(|r| !found.iter().any(|d| &d.due_item_ref == *r))
                .map(String::as_str)
                .collect();
            return Err(AppError::validation(format!(
                "Unknown due item reference(s): {}",
                missing.join(", ")
            )));
        }

        // Preserve request order so ledger rows line up with the items
        // the caller sent
        let mut ordered = Vec::with_capacity(due_item_refs.len());
        for item_ref in due_item_refs {
            if let Some(item) = found.iter().find(|d| &d.due_item_ref == item_ref) {
                ordered.push(item.clone());
            }
        }
        Ok(ordered)
    }
}
