//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use galtree_core::{ParamsError, TreeError};

// ── ProgenitorOrder ────────────────────────────────────────────────

/// How the dominant progenitor of a merger is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgenitorOrder {
    /// The first entry of the progenitor list is dominant, as the tree
    /// reader supplied it. Mismatches against the mass proxy are counted
    /// and logged.
    #[default]
    TrustInput,
    /// The progenitor with the largest mass proxy is dominant; ties go to
    /// the earliest entry.
    SortByMass,
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Configuration for a [`TreeContext`](crate::TreeContext).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Dominant-progenitor policy. Default: [`ProgenitorOrder::TrustInput`].
    pub progenitor_order: ProgenitorOrder,
    /// Records reserved in each galaxy array at creation. Default: 64.
    pub initial_galaxy_capacity: usize,
    /// Capacity multiplier applied when a galaxy array is full. Default: 2.0.
    pub galaxy_growth_factor: f64,
    /// Size of each galaxy's property block in bytes; 0 disables property
    /// blocks. Default: 128 (16 `f64` slots).
    pub property_bytes: usize,
}

impl EngineConfig {
    /// Default initial galaxy capacity.
    pub const DEFAULT_INITIAL_GALAXY_CAPACITY: usize = 64;

    /// Default growth factor.
    pub const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

    /// Default property block size.
    pub const DEFAULT_PROPERTY_BYTES: usize = 128;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_galaxy_capacity == 0 {
            return Err(ConfigError::ZeroGalaxyCapacity);
        }
        if !self.galaxy_growth_factor.is_finite() || self.galaxy_growth_factor <= 1.0 {
            return Err(ConfigError::InvalidGrowthFactor {
                value: self.galaxy_growth_factor,
            });
        }
        Ok(())
    }

    /// Number of `f64` slots in a property block.
    pub fn property_slots(&self) -> usize {
        self.property_bytes.div_ceil(std::mem::size_of::<f64>())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progenitor_order: ProgenitorOrder::default(),
            initial_galaxy_capacity: Self::DEFAULT_INITIAL_GALAXY_CAPACITY,
            galaxy_growth_factor: Self::DEFAULT_GROWTH_FACTOR,
            property_bytes: Self::DEFAULT_PROPERTY_BYTES,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building a [`TreeContext`](crate::TreeContext).
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `initial_galaxy_capacity` is zero.
    ZeroGalaxyCapacity,
    /// `galaxy_growth_factor` is NaN, infinite, or not above 1.
    InvalidGrowthFactor {
        /// The invalid value.
        value: f64,
    },
    /// Run parameters failed validation.
    Params(ParamsError),
    /// The halo array is structurally malformed.
    Tree(TreeError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroGalaxyCapacity => write!(f, "initial_galaxy_capacity must be at least 1"),
            Self::InvalidGrowthFactor { value } => {
                write!(f, "galaxy_growth_factor must be finite and > 1, got {value}")
            }
            Self::Params(e) => write!(f, "params: {e}"),
            Self::Tree(e) => write!(f, "halo array: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Params(e) => Some(e),
            Self::Tree(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParamsError> for ConfigError {
    fn from(e: ParamsError) -> Self {
        Self::Params(e)
    }
}

impl From<TreeError> for ConfigError {
    fn from(e: TreeError) -> Self {
        Self::Tree(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.progenitor_order, ProgenitorOrder::TrustInput);
        assert_eq!(config.property_slots(), 16);
    }

    #[test]
    fn rejects_non_growing_factor() {
        for value in [1.0, 0.5, f64::NAN, f64::INFINITY] {
            let config = EngineConfig {
                galaxy_growth_factor: value,
                ..EngineConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidGrowthFactor { .. })
            ));
        }
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = EngineConfig {
            initial_galaxy_capacity: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroGalaxyCapacity));
    }

    #[test]
    fn tree_error_is_source() {
        let e = ConfigError::from(TreeError::FofCycle { root: 1 });
        assert!(Error::source(&e).is_some());
        assert!(e.to_string().starts_with("halo array:"));
    }
}
