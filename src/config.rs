//! Configuration for the layout pipeline
//!
//! Everything tunable is an explicit immutable value passed per call; there
//! is no module-level state. A config can be built with the `with_*`
//! methods or loaded from a TOML profile, and one config value may be
//! shared across concurrent pipeline instances.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{BoundingBox, PackAlgorithm};

/// The drawable canvas and the margin kept clear inside its edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasBounds {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            margin: 20.0,
        }
    }
}

impl CanvasBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Full canvas as a box at the origin
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width, self.height)
    }

    /// Canvas minus the margin on every side
    pub fn usable_area(&self) -> BoundingBox {
        self.bounding_box().inset(self.margin)
    }
}

/// Planner tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Complexity below which a graph with no relational structure is
    /// laid out heuristically
    pub heuristic_complexity_cutoff: f64,
    /// Node count beyond which constraint-based plans switch to Hybrid
    /// (packing seeds the solver)
    pub hybrid_node_limit: usize,
    /// Node count beyond which the planner decomposes into subproblems
    pub decompose_node_limit: usize,
    /// Size assumed for nodes without a declared size (width, height)
    pub default_node_size: (f64, f64),
    /// Minimum clearance kept between node rectangles
    pub node_spacing: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            heuristic_complexity_cutoff: 0.15,
            hybrid_node_limit: 12,
            decompose_node_limit: 40,
            default_node_size: (80.0, 40.0),
            node_spacing: 20.0,
        }
    }
}

/// Solver tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget per solve call, in milliseconds
    pub timeout_ms: u64,
    /// Packing heuristic for seeding and heuristic placement
    pub pack_algorithm: PackAlgorithm,
    /// Tolerance used when re-verifying solved positions
    pub verify_epsilon: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            pack_algorithm: PackAlgorithm::BestFit,
            verify_epsilon: 1e-6,
        }
    }
}

impl SolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Relative weights of the four validation checks. Normalized at use, so
/// only the ratios matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub layout: f64,
    pub connectivity: f64,
    pub style: f64,
    pub physics: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            layout: 30.0,
            connectivity: 30.0,
            style: 20.0,
            physics: 20.0,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.layout + self.connectivity + self.style + self.physics
    }
}

/// Validator and refiner tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Refinement stops once the score reaches this value
    pub target_score: f64,
    /// Maximum refinement iterations before returning the best seen
    pub max_iterations: u32,
    /// Minimum score improvement for a fix to be kept
    pub noise_threshold: f64,
    /// Desired clearance between nodes; closer pairs raise spacing issues
    pub min_spacing: f64,
    /// Shape count beyond which overlap checks go through the spatial
    /// index instead of a pair scan
    pub index_threshold: usize,
    pub weights: ScoreWeights,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            target_score: 90.0,
            max_iterations: 3,
            noise_threshold: 0.5,
            min_spacing: 10.0,
            index_threshold: 48,
            weights: ScoreWeights::default(),
        }
    }
}

/// Complete configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub canvas: CanvasBounds,
    pub planner: PlannerConfig,
    pub solver: SolverConfig,
    pub validation: ValidationConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canvas(mut self, canvas: CanvasBounds) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Load a config profile from TOML. Missing fields keep their
    /// defaults, so profiles only need to name what they change.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a meaningful layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width <= 0.0 || self.canvas.height <= 0.0 {
            return Err(ConfigError::invalid(
                "canvas",
                "width and height must be positive",
            ));
        }
        if self.canvas.margin < 0.0 {
            return Err(ConfigError::invalid("canvas.margin", "must not be negative"));
        }
        if !(0.0..=100.0).contains(&self.validation.target_score) {
            return Err(ConfigError::invalid(
                "validation.target_score",
                "must be within 0..=100",
            ));
        }
        if self.validation.weights.total() <= 0.0 {
            return Err(ConfigError::invalid(
                "validation.weights",
                "weights must sum to a positive value",
            ));
        }
        if self.planner.default_node_size.0 <= 0.0 || self.planner.default_node_size.1 <= 0.0 {
            return Err(ConfigError::invalid(
                "planner.default_node_size",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.canvas.width, 800.0);
        assert_eq!(config.validation.max_iterations, 3);
        assert_eq!(config.validation.weights.total(), 100.0);
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_canvas(CanvasBounds::new(1024.0, 768.0).with_margin(10.0))
            .with_validation(ValidationConfig {
                target_score: 85.0,
                ..ValidationConfig::default()
            });
        assert_eq!(config.canvas.width, 1024.0);
        assert_eq!(config.canvas.margin, 10.0);
        assert_eq!(config.validation.target_score, 85.0);
    }

    #[test]
    fn test_usable_area() {
        let canvas = CanvasBounds::new(800.0, 600.0).with_margin(20.0);
        let usable = canvas.usable_area();
        assert_eq!(usable.x, 20.0);
        assert_eq!(usable.y, 20.0);
        assert_eq!(usable.width, 760.0);
        assert_eq!(usable.height, 560.0);
    }

    #[test]
    fn test_partial_toml_profile() {
        let config = EngineConfig::from_toml_str(
            r#"
            [canvas]
            width = 1200.0
            height = 900.0

            [solver]
            timeout_ms = 500
            pack_algorithm = "skyline"
        "#,
        )
        .unwrap();
        assert_eq!(config.canvas.width, 1200.0);
        // Unnamed fields keep their defaults
        assert_eq!(config.canvas.margin, 20.0);
        assert_eq!(config.solver.timeout_ms, 500);
        assert_eq!(config.solver.pack_algorithm, PackAlgorithm::Skyline);
        assert_eq!(config.validation.target_score, 90.0);
    }

    #[test]
    fn test_invalid_canvas_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [canvas]
            width = 0.0
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let config = EngineConfig {
            validation: ValidationConfig {
                weights: ScoreWeights {
                    layout: 0.0,
                    connectivity: 0.0,
                    style: 0.0,
                    physics: 0.0,
                },
                ..ValidationConfig::default()
            },
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
