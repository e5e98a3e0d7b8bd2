//! Process-wide engine configuration.
//!
//! The configuration and the simulation semaphore are process-wide: both
//! are initialized at boot and read-only thereafter. `EngineConfig` is the
//! struct form of the tunable keys; [`install`] is the one-time boot-time
//! initializer, backed by an `OnceCell`-guarded singleton.

use once_cell::sync::OnceCell;

/// Process-wide configuration for the simulation and cache layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub default_n_trials: u32,
    pub max_tree_depth: u32,
    pub default_trial_parallelism: u32,
    pub max_concurrent_simulations: u32,
    pub max_n_trials: u32,
    pub max_parallelism: u32,
    pub default_seed3: u64,
    pub default_seed4: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_n_trials: 10_000,
            max_tree_depth: 32,
            default_trial_parallelism: 4,
            max_concurrent_simulations: 8,
            max_n_trials: 1_000_000,
            max_parallelism: 64,
            default_seed3: 0,
            default_seed4: 0,
        }
    }
}

impl EngineConfig {
    /// Validates that every field is in a sane range: `default_n_trials`
    /// positive, `max_tree_depth` non-negative, `default_trial_parallelism`
    /// positive, `max_concurrent_simulations` positive.
    pub fn validated(self) -> Result<Self, &'static str> {
        if self.default_n_trials == 0 {
            return Err("default_n_trials must be positive");
        }
        if self.default_trial_parallelism == 0 {
            return Err("default_trial_parallelism must be positive");
        }
        if self.max_concurrent_simulations == 0 {
            return Err("max_concurrent_simulations must be positive");
        }
        if self.max_n_trials < self.default_n_trials {
            return Err("max_n_trials must be >= default_n_trials");
        }
        if self.max_parallelism < self.default_trial_parallelism {
            return Err("max_parallelism must be >= default_trial_parallelism");
        }
        Ok(self)
    }
}

static GLOBAL_CONFIG: OnceCell<EngineConfig> = OnceCell::new();

/// Installs the process-wide configuration. Only the first call has any
/// effect; later calls observe whatever was installed first, matching the
/// "initialized at boot and read-only thereafter" design note.
pub fn install(config: EngineConfig) -> EngineConfig {
    *GLOBAL_CONFIG.get_or_init(|| config)
}

/// Returns the process-wide configuration, installing [`EngineConfig::default`]
/// on first access if nothing was installed yet.
pub fn global() -> EngineConfig {
    *GLOBAL_CONFIG.get_or_init(EngineConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validated().is_ok());
    }

    #[test]
    fn rejects_zero_trials() {
        let cfg = EngineConfig {
            default_n_trials: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validated().is_err());
    }

    #[test]
    fn rejects_max_below_default() {
        let cfg = EngineConfig {
            max_n_trials: 10,
            default_n_trials: 100,
            ..EngineConfig::default()
        };
        assert!(cfg.validated().is_err());
    }
}
