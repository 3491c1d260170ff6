use super::RegistryError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Risk score at or above which a backend's verdict counts as a "flagged" vote.
pub const DEFAULT_FLAG_THRESHOLD: f64 = 0.5;

/// Per-call timeout used when a descriptor does not declare one.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Static description of a judge backend.
///
/// Descriptors are owned by the [`Registry`](super::Registry) and only change
/// through its enable/disable/configure operations. The dispatcher reads
/// snapshots of them and never mutates them.
///
/// # Examples
///
/// ```
/// use verdict::registry::BackendDescriptor;
/// use std::time::Duration;
///
/// let descriptor = BackendDescriptor::new("guard-small", "acme")
///     .with_base_weight(2.0)
///     .with_cost_per_call(0.002)
///     .with_timeout(Duration::from_secs(3));
///
/// assert!(descriptor.enabled);
/// assert!(descriptor.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Unique backend identifier
    pub id: String,
    /// Provider running the judge model (e.g., "openai", "local")
    pub provider_name: String,
    /// Configured voting weight before reliability adjustment (> 0)
    pub base_weight: f64,
    /// Declared cost of a single call, in caller-defined currency units
    pub cost_per_call: f64,
    /// Per-call timeout
    pub timeout: Duration,
    /// Whether the backend participates in dispatch
    pub enabled: bool,
    /// Risk score at or above which this backend's verdict is a flagged vote
    pub flag_threshold: f64,
}

impl BackendDescriptor {
    /// Create an enabled descriptor with unit weight, zero cost, and default timeout.
    pub fn new(id: impl Into<String>, provider_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider_name: provider_name.into(),
            base_weight: 1.0,
            cost_per_call: 0.0,
            timeout: DEFAULT_CALL_TIMEOUT,
            enabled: true,
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
        }
    }

    pub fn with_base_weight(mut self, base_weight: f64) -> Self {
        self.base_weight = base_weight;
        self
    }

    pub fn with_cost_per_call(mut self, cost_per_call: f64) -> Self {
        self.cost_per_call = cost_per_call;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_flag_threshold(mut self, flag_threshold: f64) -> Self {
        self.flag_threshold = flag_threshold;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check the static attributes of this descriptor.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidDescriptor` when the id is empty, the base
    /// weight is not strictly positive, the cost is negative or non-finite, the
    /// timeout is zero, or the flag threshold lies outside [0, 1].
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |message: &str| RegistryError::InvalidDescriptor {
            id: self.id.clone(),
            message: message.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id cannot be empty"));
        }
        if !(self.base_weight.is_finite() && self.base_weight > 0.0) {
            return Err(invalid("base_weight must be a positive number"));
        }
        if !(self.cost_per_call.is_finite() && self.cost_per_call >= 0.0) {
            return Err(invalid("cost_per_call must be a non-negative number"));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.flag_threshold) {
            return Err(invalid("flag_threshold must be within [0, 1]"));
        }
        Ok(())
    }

    /// Apply a configuration patch, returning the patched copy.
    pub fn patched(&self, patch: &DescriptorPatch) -> Self {
        let mut next = self.clone();
        if let Some(provider_name) = &patch.provider_name {
            next.provider_name = provider_name.clone();
        }
        if let Some(base_weight) = patch.base_weight {
            next.base_weight = base_weight;
        }
        if let Some(cost_per_call) = patch.cost_per_call {
            next.cost_per_call = cost_per_call;
        }
        if let Some(timeout) = patch.timeout {
            next.timeout = timeout;
        }
        if let Some(flag_threshold) = patch.flag_threshold {
            next.flag_threshold = flag_threshold;
        }
        next
    }
}

impl AsRef<BackendDescriptor> for BackendDescriptor {
    fn as_ref(&self) -> &BackendDescriptor {
        self
    }
}

/// Partial update for a registered descriptor.
///
/// `None` fields are left unchanged. Enablement is changed through
/// [`Registry::set_enabled`](super::Registry::set_enabled), not patches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorPatch {
    pub provider_name: Option<String>,
    pub base_weight: Option<f64>,
    pub cost_per_call: Option<f64>,
    pub timeout: Option<Duration>,
    pub flag_threshold: Option<f64>,
}
