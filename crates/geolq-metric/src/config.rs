//! Link-quality engine configuration

use geolq_protocol::{GeoPosition, IpVersion};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::error::{MetricError, Result};

/// Link-quality algorithm selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LqAlgorithm {
    /// Position broadcast in every control packet
    #[default]
    #[serde(rename = "etx_gps_lite")]
    EtxGpsLite,
    /// Positions supplied by an external subsystem and cached by address
    #[serde(rename = "etx_gps_pud")]
    EtxGpsPud,
}

impl LqAlgorithm {
    /// Name used in configuration files and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            LqAlgorithm::EtxGpsLite => "etx_gps_lite",
            LqAlgorithm::EtxGpsPud => "etx_gps_pud",
        }
    }
}

impl fmt::Display for LqAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LqAlgorithm {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "etx_gps_lite" | "lite" => Ok(LqAlgorithm::EtxGpsLite),
            "etx_gps_pud" | "pud" => Ok(LqAlgorithm::EtxGpsPud),
            _ => Err(MetricError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Parameters shared by both GPS variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LqConfig {
    #[serde(default)]
    pub algorithm: LqAlgorithm,

    /// IP version of the mesh; selects the pud record size
    #[serde(default)]
    pub ip_version: IpVersion,

    /// Main address of this node
    #[serde(default = "default_main_address")]
    pub main_address: IpAddr,

    /// Steady-state aging factor of the link quality average
    #[serde(default = "default_aging")]
    pub aging: f32,

    /// Pud multiplier scale
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Sensitivity of the multiplier to radial speed
    #[serde(default = "default_beta")]
    pub beta: f32,

    /// Smoothing factor of the lite speed estimate
    #[serde(default = "default_gamma")]
    pub gamma: f32,

    /// Lite position assumed until the GPS feed reports
    #[serde(default = "default_initial_position")]
    pub initial_position: GeoPosition,

    /// Position tables are produced when above zero
    #[serde(default)]
    pub debug_level: u8,
}

fn default_main_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_aging() -> f32 {
    0.05
}

fn default_alpha() -> f32 {
    1.0
}

fn default_beta() -> f32 {
    0.1
}

fn default_gamma() -> f32 {
    0.5
}

fn default_initial_position() -> GeoPosition {
    GeoPosition::new(46.00002, 6.0001, 400)
}

impl Default for LqConfig {
    fn default() -> Self {
        LqConfig {
            algorithm: LqAlgorithm::default(),
            ip_version: IpVersion::default(),
            main_address: default_main_address(),
            aging: default_aging(),
            alpha: default_alpha(),
            beta: default_beta(),
            gamma: default_gamma(),
            initial_position: default_initial_position(),
            debug_level: 0,
        }
    }
}

impl LqConfig {
    /// Default configuration for a node with the given main address
    pub fn for_node(algorithm: LqAlgorithm, main_address: IpAddr) -> Self {
        LqConfig {
            algorithm,
            ip_version: IpVersion::of(&main_address),
            main_address,
            ..Default::default()
        }
    }

    /// Check parameter ranges and address family
    pub fn validate(&self) -> Result<()> {
        if !(self.aging > 0.0 && self.aging <= 1.0) {
            return Err(MetricError::InvalidConfig(format!(
                "aging must be in (0, 1], got {}",
                self.aging
            )));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(MetricError::InvalidConfig(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }

        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(MetricError::InvalidConfig(format!(
                "alpha must be a non-negative number, got {}",
                self.alpha
            )));
        }

        if !self.beta.is_finite() {
            return Err(MetricError::InvalidConfig(format!(
                "beta must be finite, got {}",
                self.beta
            )));
        }

        self.ip_version.check(&self.main_address)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LqConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.algorithm, LqAlgorithm::EtxGpsLite);
        assert_eq!(config.aging, 0.05);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("etx_gps_pud".parse::<LqAlgorithm>().unwrap(), LqAlgorithm::EtxGpsPud);
        assert_eq!("lite".parse::<LqAlgorithm>().unwrap(), LqAlgorithm::EtxGpsLite);
        assert!("etx_ff".parse::<LqAlgorithm>().is_err());
        assert_eq!(LqAlgorithm::EtxGpsPud.to_string(), "etx_gps_pud");
    }

    #[test]
    fn test_for_node_picks_ip_version() {
        let config = LqConfig::for_node(LqAlgorithm::EtxGpsPud, "fd00::1".parse().unwrap());
        assert_eq!(config.ip_version, IpVersion::V6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = LqConfig::default();
        config.aging = 0.0;
        assert!(config.validate().is_err());

        let mut config = LqConfig::default();
        config.gamma = 1.5;
        assert!(config.validate().is_err());

        let mut config = LqConfig::default();
        config.alpha = -1.0;
        assert!(config.validate().is_err());

        let mut config = LqConfig::default();
        config.beta = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = LqConfig::default();
        config.ip_version = IpVersion::V6;
        assert!(matches!(config.validate(), Err(MetricError::Protocol(_))));
    }

    #[test]
    fn test_yaml_defaults_for_missing_fields() {
        let yaml = "algorithm: etx_gps_pud\nmain_address: 10.0.0.1\nbeta: 0.2\n";
        let config: LqConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.algorithm, LqAlgorithm::EtxGpsPud);
        assert_eq!(config.beta, 0.2);
        assert_eq!(config.gamma, 0.5);
        assert_eq!(config.ip_version, IpVersion::V4);
        assert_eq!(config.initial_position, GeoPosition::new(46.00002, 6.0001, 400));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = LqConfig::for_node(LqAlgorithm::EtxGpsLite, "10.1.2.3".parse().unwrap());
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: LqConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
