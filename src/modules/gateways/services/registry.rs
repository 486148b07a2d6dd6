use crate::core::{AppError, Result};
use crate::modules::gateways::models::GatewayDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::gateway_trait::PaymentGateway;

/// Startup-built catalog of payment gateways.
///
/// Every configured adapter is probed exactly once at construction. A
/// failing probe demotes the adapter to disabled and logs a warning;
/// startup continues with whatever subset survives. The registry is
/// immutable after construction and shared behind `Arc`.
pub struct GatewayRegistry {
    enabled: HashMap<&'static str, Arc<dyn PaymentGateway>>,
    disabled: HashMap<&'static str, Arc<dyn PaymentGateway>>,
    default_gateway: String,
}

impl GatewayRegistry {
    pub fn new(adapters: Vec<Arc<dyn PaymentGateway>>, default_gateway: String) -> Self {
        let mut enabled = HashMap::new();
        let mut disabled = HashMap::new();

        for adapter in adapters {
            let id = adapter.id();
            match adapter.probe() {
                Ok(()) => {
                    info!(gateway = id, "payment gateway enabled");
                    enabled.insert(id, adapter);
                }
                Err(e) => {
                    warn!(gateway = id, error = %e, "payment gateway misconfigured, disabling");
                    disabled.insert(id, adapter);
                }
            }
        }

        if enabled.is_empty() {
            warn!("no payment gateway passed its configuration probe");
        }

        Self {
            enabled,
            disabled,
            default_gateway,
        }
    }

    /// Resolve an enabled gateway by id.
    ///
    /// A gateway that exists but failed its probe yields a configuration
    /// error; an id nobody has ever heard of yields not-found.
    pub fn get(&self, gateway_id: &str) -> Result<Arc<dyn PaymentGateway>> {
        if let Some(gateway) = self.enabled.get(gateway_id) {
            return Ok(Arc::clone(gateway));
        }
        if self.disabled.contains_key(gateway_id) {
            return Err(AppError::configuration(format!(
                "Gateway '{}' is disabled due to invalid configuration",
                gateway_id
            )));
        }
        Err(AppError::not_found(format!("Unknown gateway '{}'", gateway_id)))
    }

    /// Identifiers of the gateways that passed their probe, in a stable
    /// order so listings and recommendations are reproducible.
    pub fn enabled_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.enabled.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_enabled(&self, gateway_id: &str) -> bool {
        self.enabled.contains_key(gateway_id)
    }

    /// Display descriptors for every known gateway, enabled or not. The
    /// enabled flag reflects the probe outcome, not the adapter default.
    pub fn descriptors(&self) -> Vec<GatewayDescriptor> {
        let mut all: Vec<GatewayDescriptor> = self
            .enabled
            .values()
            .map(|g| GatewayDescriptor {
                enabled: true,
                ..g.descriptor()
            })
            .chain(self.disabled.values().map(|g| GatewayDescriptor {
                enabled: false,
                ..g.descriptor()
            }))
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// The operator-configured fallback gateway id. May name a disabled
    /// gateway; callers resolve through `get` and surface the error.
    pub fn default_gateway(&self) -> &str {
        &self.default_gateway
    }
}
