//! EFKStack status types
//!
//! Observed state of a stack: one record per component plus the aggregate
//! phase and conditions derived from them.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::component::Component;

/// EFKStackStatus defines the observed state of a logging stack
///
/// Optional fields are serialized as `null` rather than skipped so that a
/// merge patch of the whole status clears values that are no longer set.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EFKStackStatus {
    /// Aggregate phase, derived from the component states
    #[serde(default)]
    pub phase: Option<StackPhase>,

    /// Latest observations, at most one per type
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Search engine state
    #[serde(default)]
    pub search_engine: ComponentStatus,

    /// Log shipper state
    #[serde(default)]
    pub log_shipper: ComponentStatus,

    /// Dashboard state
    #[serde(default)]
    pub dashboard: ComponentStatus,
}

impl EFKStackStatus {
    /// Status record of one component.
    #[must_use]
    pub fn component(&self, component: Component) -> &ComponentStatus {
        match component {
            Component::SearchEngine => &self.search_engine,
            Component::LogShipper => &self.log_shipper,
            Component::Dashboard => &self.dashboard,
        }
    }

    /// Mutable status record of one component.
    pub fn component_mut(&mut self, component: Component) -> &mut ComponentStatus {
        match component {
            Component::SearchEngine => &mut self.search_engine,
            Component::LogShipper => &mut self.log_shipper,
            Component::Dashboard => &mut self.dashboard,
        }
    }

    /// Condition of the given type, if recorded.
    #[must_use]
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

/// Observed state of one component release
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    /// Component state
    #[serde(default)]
    pub state: ComponentState,

    /// Number of ready pods
    #[serde(default)]
    pub ready_replicas: i32,

    /// Deployed version
    #[serde(default)]
    pub version: Option<String>,

    /// Error or progress message
    #[serde(default)]
    pub message: Option<String>,

    /// Access URL
    #[serde(default)]
    pub url: Option<String>,
}

/// Component state
///
/// Serializes as PascalCase ("Ready", "Error", etc.) but also accepts
/// lowercase values written by hand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum ComponentState {
    /// Not reconciled yet
    #[default]
    #[serde(alias = "pending")]
    Pending,
    /// Release installed, not yet deployed
    #[serde(alias = "deploying")]
    Deploying,
    /// Release deployed
    #[serde(alias = "ready")]
    Ready,
    /// Install or upgrade failed
    #[serde(alias = "error")]
    Error,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentState::Pending => "Pending",
            ComponentState::Deploying => "Deploying",
            ComponentState::Ready => "Ready",
            ComponentState::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Aggregate stack phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum StackPhase {
    /// Nothing deploying and not everything ready
    #[serde(alias = "pending")]
    Pending,
    /// At least one component deploying
    #[serde(alias = "deploying")]
    Deploying,
    /// All components ready
    #[serde(alias = "ready")]
    Ready,
}

impl fmt::Display for StackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StackPhase::Pending => "Pending",
            StackPhase::Deploying => "Deploying",
            StackPhase::Ready => "Ready",
        };
        f.write_str(s)
    }
}

/// Status of a condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

/// Condition represents one observation of the stack
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition
    pub status: ConditionStatus,

    /// Machine-readable reason
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Generation of the spec this condition was computed from
    #[serde(default)]
    pub observed_generation: Option<i64>,

    /// Last time the status flipped
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
}
