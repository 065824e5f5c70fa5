//! Run-time parameters shared read-only with the traversal.

use std::error::Error;
use std::fmt;

/// Cosmology and snapshot layout of a run.
///
/// Owned by the configuration collaborator and borrowed by every tree
/// context; the core only reads it.
#[derive(Clone, Debug, PartialEq)]
pub struct RunParams {
    /// Dimensionless Hubble parameter. Default: 0.73.
    pub hubble_h: f64,
    /// Matter density. Default: 0.25.
    pub omega_matter: f64,
    /// Dark-energy density. Default: 0.75.
    pub omega_lambda: f64,
    /// Number of snapshots in the simulation. Default: 64.
    pub snapshot_count: i32,
    /// Particle mass in 10^10 Msun/h. Default: 0.0860657.
    pub particle_mass: f64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            hubble_h: 0.73,
            omega_matter: 0.25,
            omega_lambda: 0.75,
            snapshot_count: 64,
            particle_mass: 0.0860657,
        }
    }
}

impl RunParams {
    /// Parameters for a run with `snapshot_count` snapshots and default cosmology.
    pub fn with_snapshots(snapshot_count: i32) -> Self {
        Self {
            snapshot_count,
            ..Self::default()
        }
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [
            ("hubble_h", self.hubble_h),
            ("omega_matter", self.omega_matter),
            ("omega_lambda", self.omega_lambda),
            ("particle_mass", self.particle_mass),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParamsError::InvalidValue { name, value });
            }
        }
        if self.hubble_h == 0.0 {
            return Err(ParamsError::InvalidValue {
                name: "hubble_h",
                value: self.hubble_h,
            });
        }
        if self.snapshot_count < 1 {
            return Err(ParamsError::NoSnapshots);
        }
        Ok(())
    }
}

/// Errors detected by [`RunParams::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParamsError {
    /// A cosmological parameter is NaN, infinite, or out of range.
    InvalidValue {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// `snapshot_count` is below 1.
    NoSnapshots,
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { name, value } => write!(f, "invalid {name}: {value}"),
            Self::NoSnapshots => write!(f, "snapshot_count must be at least 1"),
        }
    }
}

impl Error for ParamsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(RunParams::default().validate().is_ok());
        assert_eq!(RunParams::with_snapshots(11).snapshot_count, 11);
    }

    #[test]
    fn rejects_nan_and_empty_runs() {
        let p = RunParams {
            omega_matter: f64::NAN,
            ..RunParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParamsError::InvalidValue { name: "omega_matter", .. })
        ));
        assert_eq!(
            RunParams::with_snapshots(0).validate(),
            Err(ParamsError::NoSnapshots)
        );
    }

    #[test]
    fn rejects_zero_hubble() {
        let p = RunParams {
            hubble_h: 0.0,
            ..RunParams::default()
        };
        assert!(p.validate().is_err());
    }
}
