//! Layered engine configuration: compiled-in defaults, an optional RON file,
//! then `ENCOUNTER_*` environment variables. See `SPEC_FULL.md` §4.13.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

/// Resolved, validated configuration. Carries only genuine tunables, never
/// gameplay content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub feet_per_grid_unit: u32,
    pub critical_threshold: u32,
    pub critical_fail_threshold: u32,
    pub default_melee_reach_units: f64,
    pub max_recoverable_resource_history: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feet_per_grid_unit: 5,
            critical_threshold: 20,
            critical_fail_threshold: 1,
            default_melee_reach_units: 1.0,
            max_recoverable_resource_history: 50,
        }
    }
}

/// One configuration layer with every field optional; `None` means
/// "inherit from the layer below".
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    feet_per_grid_unit: Option<u32>,
    critical_threshold: Option<u32>,
    critical_fail_threshold: Option<u32>,
    default_melee_reach_units: Option<f64>,
    max_recoverable_resource_history: Option<u32>,
}

impl EngineConfig {
    /// Load layered config: defaults, then `path` if given and present,
    /// then `ENCOUNTER_*` environment variables. Validates before returning.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let defaults = Self::default();
        let file_layer = path.map(load_file_layer).unwrap_or_default();
        let env_layer = load_env_layer();

        let resolved = Self {
            feet_per_grid_unit: env_layer
                .feet_per_grid_unit
                .or(file_layer.feet_per_grid_unit)
                .unwrap_or(defaults.feet_per_grid_unit),
            critical_threshold: env_layer
                .critical_threshold
                .or(file_layer.critical_threshold)
                .unwrap_or(defaults.critical_threshold),
            critical_fail_threshold: env_layer
                .critical_fail_threshold
                .or(file_layer.critical_fail_threshold)
                .unwrap_or(defaults.critical_fail_threshold),
            default_melee_reach_units: env_layer
                .default_melee_reach_units
                .or(file_layer.default_melee_reach_units)
                .unwrap_or(defaults.default_melee_reach_units),
            max_recoverable_resource_history: env_layer
                .max_recoverable_resource_history
                .or(file_layer.max_recoverable_resource_history)
                .unwrap_or(defaults.max_recoverable_resource_history),
        };

        resolved.validate()?;
        Ok(resolved)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.feet_per_grid_unit == 0 {
            return Err(EngineError::invalid_argument("feet_per_grid_unit must be positive"));
        }
        if self.default_melee_reach_units < 0.0 {
            return Err(EngineError::invalid_argument(
                "default_melee_reach_units must be non-negative",
            ));
        }
        if self.critical_fail_threshold > self.critical_threshold {
            return Err(EngineError::invalid_argument(
                "critical_fail_threshold must not exceed critical_threshold",
            ));
        }
        Ok(())
    }
}

fn load_file_layer(path: &Path) -> PartialConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file, using defaults");
            return PartialConfig::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read config file");
            return PartialConfig::default();
        }
    };
    match ron::from_str(&contents) {
        Ok(partial) => {
            info!(path = %path.display(), "loaded config file");
            partial
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse config file");
            PartialConfig::default()
        }
    }
}

fn load_env_layer() -> PartialConfig {
    PartialConfig {
        feet_per_grid_unit: env_u32("ENCOUNTER_FEET_PER_GRID_UNIT"),
        critical_threshold: env_u32("ENCOUNTER_CRITICAL_THRESHOLD"),
        critical_fail_threshold: env_u32("ENCOUNTER_CRITICAL_FAIL_THRESHOLD"),
        default_melee_reach_units: env_f64("ENCOUNTER_DEFAULT_MELEE_REACH_UNITS"),
        max_recoverable_resource_history: env_u32("ENCOUNTER_MAX_RECOVERABLE_RESOURCE_HISTORY"),
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_no_path_and_no_env_returns_defaults() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn load_from_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load(Some(Path::new("/nonexistent/encounter.ron"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encounter.ron");
        std::fs::write(&path, "(feet_per_grid_unit: Some(10))").unwrap();
        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.feet_per_grid_unit, 10);
        assert_eq!(config.critical_threshold, EngineConfig::default().critical_threshold);
    }

    #[test]
    fn critical_fail_threshold_above_critical_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encounter.ron");
        std::fs::write(
            &path,
            "(critical_threshold: Some(5), critical_fail_threshold: Some(10))",
        )
        .unwrap();
        assert!(EngineConfig::load(Some(&path)).is_err());
    }
}
