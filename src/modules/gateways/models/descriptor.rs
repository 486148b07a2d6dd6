use serde::{Deserialize, Serialize};

/// Display metadata for a configured gateway
///
/// Derived from configuration at process startup, never persisted and
/// never mutated at runtime. Re-probed only on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Human-readable fee model for the admin UI
    pub fees: String,
    pub supported_methods: Vec<String>,
    pub supports_refunds: bool,
    pub enabled: bool,
}
