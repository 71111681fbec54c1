//! Array pool configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    defaults::DEFAULT_MAINTENANCE_INTERVAL,
    error::{PoolError, Result},
    policy::{AlreadyReturnedPolicy, NonMemberPolicy, ReturnPolicy},
};

/// Configuration for array pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayPoolConfig {
    /// Name of the pool, used for the maintenance thread and log records
    pub name: String,
    /// Period between trim ticks
    pub maintenance_interval: Duration,
    /// Whether the pool runs its own maintenance thread
    pub background_maintenance: bool,
    /// Policy applied by `return_array` / `return_slice`
    pub return_policy: ReturnPolicy,
}

impl Default for ArrayPoolConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            background_maintenance: true,
            return_policy: ReturnPolicy::default(),
        }
    }
}

impl ArrayPoolConfig {
    /// Create a new configuration with custom name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set maintenance interval
    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Enable or disable the maintenance thread
    pub fn with_background_maintenance(mut self, enable: bool) -> Self {
        self.background_maintenance = enable;
        self
    }

    /// Set default return policy
    pub fn with_return_policy(mut self, policy: ReturnPolicy) -> Self {
        self.return_policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PoolError::invalid_parameter(
                "name",
                "Pool name cannot be empty",
            ));
        }

        if self.maintenance_interval.is_zero() {
            return Err(PoolError::invalid_parameter(
                "maintenance_interval",
                "Maintenance interval cannot be zero",
            ));
        }

        Ok(())
    }
}

/// Builder pattern for array pool configuration
pub struct ArrayPoolConfigBuilder {
    config: ArrayPoolConfig,
}

impl ArrayPoolConfigBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: ArrayPoolConfig::new(name),
        }
    }

    /// Set maintenance interval
    pub fn maintenance_interval(mut self, interval: Duration) -> Self {
        self.config.maintenance_interval = interval;
        self
    }

    /// Run without a maintenance thread
    pub fn manual_maintenance(mut self) -> Self {
        self.config.background_maintenance = false;
        self
    }

    /// Set the whole default return policy
    pub fn return_policy(mut self, policy: ReturnPolicy) -> Self {
        self.config.return_policy = policy;
        self
    }

    /// Set the default foreign-buffer policy
    pub fn non_member_policy(mut self, policy: NonMemberPolicy) -> Self {
        self.config.return_policy.non_member = policy;
        self
    }

    /// Set the default already-returned policy
    pub fn already_returned_policy(mut self, policy: AlreadyReturnedPolicy) -> Self {
        self.config.return_policy.already_returned = policy;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ArrayPoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
