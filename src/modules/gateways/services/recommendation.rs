use crate::core::{AppError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Selection priority expressed by the payer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Cost,
    Speed,
    Coverage,
}

/// Input to a recommendation. `country` is an ISO 3166-1 alpha-2 code.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationCriteria {
    pub amount: Decimal,
    pub country: String,
    pub priority: Priority,
    pub payment_method: Option<String>,
}

/// A scored gateway pick. The reason string is part of the contract and
/// is returned to callers, not just logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub gateway_id: String,
    pub score: u8,
    pub reason: String,
}

/// Fixed score for the configured-default fallback, deliberately below
/// every rule-table score so an audited pick is distinguishable from a
/// fallback.
const FALLBACK_SCORE: u8 = 5;

struct Candidate {
    gateway_id: &'static str,
    score: u8,
    reason: &'static str,
}

struct Rule {
    /// `None` matches any country
    country: Option<&'static str>,
    priority: Priority,
    /// `None` matches any payment method, including absent
    payment_method: Option<&'static str>,
    candidates: &'static [Candidate],
}

/// Ordered rule table. The first matching rule whose candidate list
/// contains an enabled gateway wins; within a rule, candidates are tried
/// in declared order. Order in this table is the tie-break, so edits
/// here change which gateway wins for identical inputs.
const RULES: &[Rule] = &[
    Rule {
        country: Some("CL"),
        priority: Priority::Cost,
        payment_method: Some("transfer"),
        candidates: &[Candidate {
            gateway_id: "bancoestado",
            score: 10,
            reason: "Lowest fees for bank transfers in Chile",
        }],
    },
    Rule {
        country: Some("CL"),
        priority: Priority::Cost,
        payment_method: None,
        candidates: &[
            Candidate {
                gateway_id: "bancoestado",
                score: 10,
                reason: "Lowest fees for domestic payments in Chile",
            },
            Candidate {
                gateway_id: "transbank",
                score: 9,
                reason: "Competitive domestic card fees in Chile",
            },
            Candidate {
                gateway_id: "mercadopago",
                score: 7,
                reason: "Moderate fees with broad payment method coverage",
            },
            Candidate {
                gateway_id: "stripe",
                score: 6,
                reason: "Higher fees for domestic Chilean payments",
            },
        ],
    },
    Rule {
        country: Some("CL"),
        priority: Priority::Speed,
        payment_method: None,
        candidates: &[
            Candidate {
                gateway_id: "stripe",
                score: 10,
                reason: "Fastest settlement and instant card confirmation",
            },
            Candidate {
                gateway_id: "mercadopago",
                score: 8,
                reason: "Fast confirmation for most local methods",
            },
            Candidate {
                gateway_id: "transbank",
                score: 7,
                reason: "Immediate card authorization, slower settlement",
            },
        ],
    },
    Rule {
        country: None,
        priority: Priority::Coverage,
        payment_method: None,
        candidates: &[
            Candidate {
                gateway_id: "stripe",
                score: 10,
                reason: "Widest international card coverage",
            },
            Candidate {
                gateway_id: "mercadopago",
                score: 8,
                reason: "Broad coverage across Latin America",
            },
        ],
    },
    // Payers outside Chile cannot use the domestic acquirers
    Rule {
        country: None,
        priority: Priority::Cost,
        payment_method: None,
        candidates: &[
            Candidate {
                gateway_id: "stripe",
                score: 10,
                reason: "Only gateway accepting international cards at standard fees",
            },
            Candidate {
                gateway_id: "mercadopago",
                score: 8,
                reason: "Accepts international payers in Latin America",
            },
        ],
    },
    Rule {
        country: None,
        priority: Priority::Speed,
        payment_method: None,
        candidates: &[
            Candidate {
                gateway_id: "stripe",
                score: 10,
                reason: "Fastest settlement for international payers",
            },
            Candidate {
                gateway_id: "mercadopago",
                score: 8,
                reason: "Fast confirmation for international payers",
            },
        ],
    },
];

/// Pure gateway scoring. Holds no I/O and no mutable state; identical
/// criteria and enabled set always produce the identical pick.
pub struct RecommendationEngine {
    default_gateway: String,
}

impl RecommendationEngine {
    pub fn new(default_gateway: String) -> Self {
        Self { default_gateway }
    }

    /// Pick a gateway for the given criteria, restricted to `enabled`.
    ///
    /// Falls back to the configured default gateway with a lower,
    /// explicit score when no rule matches an enabled gateway. Errors
    /// only when no gateway is enabled at all.
    pub fn recommend(
        &self,
        criteria: &RecommendationCriteria,
        enabled: &[&str],
    ) -> Result<Recommendation> {
        let country = criteria.country.to_ascii_uppercase();
        let method = criteria.payment_method.as_deref();

        for rule in RULES {
            if let Some(rule_country) = rule.country {
                if rule_country != country {
                    continue;
                }
            } else if rule.priority != Priority::Coverage && country == "CL" {
                // Country-agnostic cost/speed rules only apply abroad;
                // Chilean payers are handled by the CL-specific rows
                continue;
            }
            if rule.priority != criteria.priority {
                continue;
            }
            if let Some(rule_method) = rule.payment_method {
                if method != Some(rule_method) {
                    continue;
                }
            }

            for candidate in rule.candidates {
                if enabled.contains(&candidate.gateway_id) {
                    return Ok(Recommendation {
                        gateway_id: candidate.gateway_id.to_string(),
                        score: candidate.score,
                        reason: candidate.reason.to_string(),
                    });
                }
            }
        }

        self.fallback(enabled)
    }

    fn fallback(&self, enabled: &[&str]) -> Result<Recommendation> {
        if enabled.contains(&self.default_gateway.as_str()) {
            return Ok(Recommendation {
                gateway_id: self.default_gateway.clone(),
                score: FALLBACK_SCORE,
                reason: format!(
                    "No rule matched; falling back to default gateway '{}'",
                    self.default_gateway
                ),
            });
        }
        // Default is disabled too; take the first enabled id so the
        // caller still gets a usable gateway
        match enabled.first() {
            Some(id) => Ok(Recommendation {
                gateway_id: id.to_string(),
                score: FALLBACK_SCORE,
                reason: format!(
                    "No rule matched and default gateway '{}' is disabled; using '{}'",
                    self.default_gateway, id
                ),
            }),
            None => Err(AppError::configuration("No payment gateway is enabled")),
        }
    }
}
