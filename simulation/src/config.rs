//! Run configuration loaded from TOML
//!
//! ```toml
//! nodes = ["A", "B", "C"]
//! pool_size = 12
//! max_ticks = 20
//! seed = 7
//!
//! [behavior]
//! kind = "random"
//! send_probability = 0.4
//! read_probability = 0.6
//! quota = 3
//! broadcast = false
//!
//! [logging]
//! default_level = "debug"
//! ```

use std::fs;
use std::path::Path;

use courier_core::{FabricError, NodeId};
use courier_logging::LogConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behaviors::{InOrderReader, QuotaState, RandomBehavior};
use crate::error::SimError;
use crate::fabric::Fabric;
use crate::node::NodeSpec;

/// Which built-in behavior every node runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BehaviorKind {
    #[default]
    Random,
    InOrder,
    Idle,
}

/// Parameters for the node behaviors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub kind: BehaviorKind,
    /// Chance per tick that a node with quota left sends
    pub send_probability: f64,
    /// Chance per tick that a node reads each visible message
    pub read_probability: f64,
    /// Messages each node intends to send over the run
    pub quota: usize,
    /// Address every other node instead of one peer
    pub broadcast: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            kind: BehaviorKind::Random,
            send_probability: 0.5,
            read_probability: 0.5,
            quota: 4,
            broadcast: false,
        }
    }
}

/// Configuration for a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub nodes: Vec<NodeId>,
    /// Signed so a negative size surfaces as a configuration error
    pub pool_size: i64,
    pub max_ticks: u64,
    pub seed: u64,
    pub behavior: BehaviorConfig,
    pub logging: LogConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: NodeId::range_to('C'),
            pool_size: 16,
            max_ticks: 20,
            seed: 0,
            behavior: BehaviorConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, SimError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        debug!(
            path = %path.display(),
            nodes = config.nodes.len(),
            pool_size = config.pool_size,
            "Loaded run config"
        );
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Every node starts with the configured quota and runs the configured
    /// behavior
    pub fn build_fabric(&self) -> Result<Fabric<QuotaState>, FabricError> {
        if self.nodes.is_empty() {
            return Err(FabricError::InvalidConfig {
                reason: "at least one node is required".to_string(),
            });
        }
        for (name, p) in [
            ("send_probability", self.behavior.send_probability),
            ("read_probability", self.behavior.read_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(FabricError::InvalidConfig {
                    reason: format!("{name} must be within [0, 1], got {p}"),
                });
            }
        }

        let state = QuotaState::with_quota(self.behavior.quota);
        let specs = self.nodes.iter().map(|id| match self.behavior.kind {
            BehaviorKind::Random => NodeSpec::new(
                *id,
                state,
                RandomBehavior::new(self.seed)
                    .with_send_probability(self.behavior.send_probability)
                    .with_read_probability(self.behavior.read_probability)
                    .with_broadcast(self.behavior.broadcast),
            ),
            BehaviorKind::InOrder if self.behavior.broadcast => {
                NodeSpec::new(*id, state, InOrderReader::broadcasting())
            }
            BehaviorKind::InOrder => NodeSpec::new(*id, state, InOrderReader::new()),
            BehaviorKind::Idle => NodeSpec::new(*id, state, courier_core::Idle),
        });

        Fabric::new(specs, self.pool_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.nodes, vec![NodeId('A'), NodeId('B'), NodeId('C')]);
        assert_eq!(config.behavior.kind, BehaviorKind::Random);
        assert!(config.build_fabric().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = SimConfig::from_toml_str(
            r#"
            nodes = ["A", "B"]
            pool_size = 3

            [behavior]
            kind = "in-order"
            quota = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.max_ticks, 20);
        assert_eq!(config.behavior.kind, BehaviorKind::InOrder);
        assert_eq!(config.behavior.quota, 1);
        assert_eq!(config.behavior.send_probability, 0.5);
    }

    #[test]
    fn test_negative_pool_is_config_error() {
        let config = SimConfig::from_toml_str("pool_size = -2").unwrap();
        let err = config.build_fabric().unwrap_err();
        assert!(matches!(err, FabricError::InvalidConfig { .. }));
    }

    #[test]
    fn test_duplicate_nodes_rejected() {
        let config = SimConfig::from_toml_str(r#"nodes = ["A", "B", "A"]"#).unwrap();
        assert!(matches!(
            config.build_fabric().unwrap_err(),
            FabricError::InvalidConfig { .. }
        ));
    }

    #[test]
    fn test_probabilities_must_be_finite_fractions() {
        for value in ["nan", "1.5", "-0.1", "inf"] {
            let config =
                SimConfig::from_toml_str(&format!("[behavior]\nsend_probability = {value}"))
                    .unwrap();
            match config.build_fabric().unwrap_err() {
                FabricError::InvalidConfig { reason } => {
                    assert!(reason.contains("send_probability"), "{reason}")
                }
                other => panic!("unexpected error {other:?}"),
            }
        }

        let config = SimConfig::from_toml_str("[behavior]\nread_probability = nan").unwrap();
        assert!(config.build_fabric().is_err());
    }

    #[test]
    fn test_unknown_behavior_kind_rejected() {
        let err = SimConfig::from_toml_str("[behavior]\nkind = \"psychic\"").unwrap_err();
        assert!(matches!(err, SimError::Toml(_)));
    }
}
