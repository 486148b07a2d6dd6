use async_trait::async_trait;
use aulapay::core::{AppError, Result};
use aulapay::modules::payments::models::DueItem;
use aulapay::modules::payments::services::DueItemSource;
use aulapay::core::Currency;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Fixed catalog of due installments, mirroring the debt collaborator's
/// read contract: any unknown reference fails the whole resolution.
pub struct StubDueItemSource {
    items: HashMap<String, DueItem>,
}

impl StubDueItemSource {
    pub fn new(items: Vec<DueItem>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|i| (i.due_item_ref.clone(), i))
                .collect(),
        }
    }

    /// Three installments for two students of one payer, all CLP.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            DueItem {
                due_item_ref: "due-A".to_string(),
                student_ref: "student-1".to_string(),
                description: "Cuota marzo - Ana Rojas".to_string(),
                amount: dec!(1000),
                currency: Currency::CLP,
            },
            DueItem {
                due_item_ref: "due-B".to_string(),
                student_ref: "student-1".to_string(),
                description: "Cuota abril - Ana Rojas".to_string(),
                amount: dec!(2000),
                currency: Currency::CLP,
            },
            DueItem {
                due_item_ref: "due-C".to_string(),
                student_ref: "student-2".to_string(),
                description: "Matrícula - Pedro Rojas".to_string(),
                amount: dec!(35000),
                currency: Currency::CLP,
            },
        ])
    }
}

#[async_trait]
impl DueItemSource for StubDueItemSource {
    async fn resolve(&self, due_item_refs: &[String]) -> Result<Vec<DueItem>> {
        if due_item_refs.is_empty() {
            return Err(AppError::validation("At least one due item is required"));
        }
        aulapay::modules::payments::services::due_items::reject_duplicates(due_item_refs)?;
        let mut resolved = Vec::with_capacity(due_item_refs.len());
        for item_ref in due_item_refs {
            match self.items.get(item_ref) {
                Some(item) => resolved.push(item.clone()),
                None => {
                    return Err(AppError::validation(format!(
                        "Unknown due item reference(s): {}",
                        item_ref
                    )))
                }
            }
        }
        Ok(resolved)
    }
}
