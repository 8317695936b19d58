//! Stack phase and `Ready` condition, derived from the component states.

use std::time::Duration;

use chrono::{DateTime, Utc};
use crds::{Component, ComponentState, Condition, ConditionStatus, EFKStackStatus, StackPhase};

pub const READY_CONDITION: &str = "Ready";

/// Requeue delay while components are still converging.
pub const CONVERGING_REQUEUE: Duration = Duration::from_secs(5);

/// Requeue delay once the whole stack is ready.
pub const READY_REQUEUE: Duration = Duration::from_secs(30);

/// Aggregate phase of the component states.
///
/// Ready only when every component is Ready; Deploying when any component is
/// Deploying; Pending otherwise (including when a component is in Error).
#[must_use]
pub fn aggregate_phase(status: &EFKStackStatus) -> StackPhase {
    let mut all_ready = true;
    let mut any_deploying = false;
    for component in Component::ALL {
        match status.component(component).state {
            ComponentState::Ready => {}
            ComponentState::Deploying => {
                all_ready = false;
                any_deploying = true;
            }
            ComponentState::Pending | ComponentState::Error => all_ready = false,
        }
    }

    if all_ready {
        StackPhase::Ready
    } else if any_deploying {
        StackPhase::Deploying
    } else {
        StackPhase::Pending
    }
}

/// The `Ready` condition for a stack in `phase`.
#[must_use]
pub fn ready_condition(
    status: &EFKStackStatus,
    phase: StackPhase,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> Condition {
    let (reason, message) = match phase {
        StackPhase::Ready => (
            "AllComponentsReady".to_string(),
            "All components are ready".to_string(),
        ),
        StackPhase::Pending | StackPhase::Deploying => (
            "Reconciling".to_string(),
            format!(
                "SearchEngine: {}, LogShipper: {}, Dashboard: {}",
                status.search_engine.state, status.log_shipper.state, status.dashboard.state
            ),
        ),
    };

    Condition {
        type_: READY_CONDITION.to_string(),
        status: ConditionStatus::from(phase == StackPhase::Ready),
        reason,
        message,
        observed_generation: generation,
        last_transition_time: Some(now),
    }
}

/// Insert `condition`, replacing any existing condition of the same type.
///
/// The previous transition time is kept unless the condition status flipped.
pub fn upsert_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status && existing.last_transition_time.is_some() {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// Recompute phase and `Ready` condition in place; returns the new phase.
pub fn refresh(status: &mut EFKStackStatus, generation: Option<i64>, now: DateTime<Utc>) -> StackPhase {
    let phase = aggregate_phase(status);
    let condition = ready_condition(status, phase, generation, now);
    status.phase = Some(phase);
    upsert_condition(&mut status.conditions, condition);
    phase
}

/// How long to wait before the next pass of a stack in `phase`.
#[must_use]
pub fn requeue_after(phase: StackPhase) -> Duration {
    match phase {
        StackPhase::Ready => READY_REQUEUE,
        StackPhase::Pending | StackPhase::Deploying => CONVERGING_REQUEUE,
    }
}
