// THEORY:
// The decision engine is an ordered rule list with three terminal labels. Rules
// are tried top to bottom and the first match wins, so the conditions never
// need to be mutually exclusive on their own.
//
// The confidence formulas are empirically tuned and treated as fixed: each one
// is anchored on its rule's thresholds and clamped to its own range (healthy
// tops out at 0.99, moderate lives in [0.55, 0.9], unhealthy tops out at 0.96).

use crate::config::DecisionConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

const HEALTHY_BASE: f64 = 0.55;
const HEALTHY_GREEN_WEIGHT: f64 = 1.2;
const HEALTHY_STRESS_WEIGHT: f64 = 1.4;
const HEALTHY_EDGE_WEIGHT: f64 = 0.6;
const HEALTHY_CAP: f64 = 0.99;

const MODERATE_FLOOR: f64 = 0.55;
const MODERATE_CAP: f64 = 0.9;
const MODERATE_GREEN_CENTER: f64 = 0.58;
const MODERATE_SPREAD: f64 = 0.5;
const MODERATE_EDGE_WEIGHT: f64 = 0.1;

const UNHEALTHY_BASE: f64 = 0.5;
const UNHEALTHY_STRESS_WEIGHT: f64 = 0.8;
const UNHEALTHY_GREEN_WEIGHT: f64 = 0.8;
const UNHEALTHY_EDGE_WEIGHT: f64 = 0.3;
const UNHEALTHY_CAP: f64 = 0.96;

/// Discrete health class of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLabel {
    Unhealthy,
    Moderate,
    Healthy,
}

impl HealthLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLabel::Healthy => "healthy",
            HealthLabel::Moderate => "moderate",
            HealthLabel::Unhealthy => "unhealthy",
        }
    }

    /// 0 for unhealthy up to 2 for healthy.
    pub fn rank(&self) -> u8 {
        match self {
            HealthLabel::Unhealthy => 0,
            HealthLabel::Moderate => 1,
            HealthLabel::Healthy => 2,
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signals the rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInput {
    pub green_ratio: f64,
    pub stress_ratio: f64,
    pub edge_ratio: f64,
}

/// Label plus unrounded confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub label: HealthLabel,
    pub confidence: f64,
}

pub fn decide(input: DecisionInput, config: &DecisionConfig) -> Decision {
    let DecisionInput {
        green_ratio: green,
        stress_ratio: stress,
        edge_ratio: edge,
    } = input;

    if green >= config.healthy_min_green
        && stress <= config.healthy_max_stress
        && edge < config.healthy_max_edge
    {
        let confidence = (HEALTHY_BASE
            + (green - config.healthy_min_green) * HEALTHY_GREEN_WEIGHT
            + (config.healthy_max_stress - stress) * HEALTHY_STRESS_WEIGHT
            + (config.healthy_max_edge - edge) * HEALTHY_EDGE_WEIGHT)
            .min(HEALTHY_CAP);
        Decision {
            label: HealthLabel::Healthy,
            confidence,
        }
    } else if green >= config.moderate_min_green && stress <= config.moderate_max_stress {
        let centered = MODERATE_SPREAD - (MODERATE_GREEN_CENTER - green).abs();
        let confidence = MODERATE_FLOOR.max(
            MODERATE_CAP.min(MODERATE_FLOOR + centered - edge * MODERATE_EDGE_WEIGHT),
        );
        Decision {
            label: HealthLabel::Moderate,
            confidence,
        }
    } else {
        let missing_green = config.moderate_min_green - green.min(config.moderate_min_green);
        let confidence = (UNHEALTHY_BASE
            + stress * UNHEALTHY_STRESS_WEIGHT
            + missing_green * UNHEALTHY_GREEN_WEIGHT
            + edge * UNHEALTHY_EDGE_WEIGHT)
            .min(UNHEALTHY_CAP);
        Decision {
            label: HealthLabel::Unhealthy,
            confidence,
        }
    }
}
