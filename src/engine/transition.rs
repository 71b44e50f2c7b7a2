use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::pickup::{CourierId, PickupId, PickupPatch, PickupRequest, PickupStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransitionPayload {
    pub courier_id: Option<CourierId>,
    pub reason: Option<String>,
}

/// Validates moving `current` to `target` and returns the patch to persist.
///
/// Depends only on its arguments; `now` becomes the patch's `updated_at`.
pub fn plan_transition(
    current: &PickupRequest,
    target: PickupStatus,
    payload: &TransitionPayload,
    now: DateTime<Utc>,
) -> Result<PickupPatch, AppError> {
    if !current.status.can_transition_to(target) {
        return Err(AppError::InvalidTransition {
            from: current.status,
            to: target,
        });
    }

    let reason = if target == PickupStatus::Cancelled {
        let reason = payload
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .ok_or(AppError::MissingReason)?;
        Some(reason.to_string())
    } else {
        None
    };

    let courier_id = payload.courier_id.filter(|id| *id > 0);
    if payload.courier_id.is_some() && courier_id.is_none() {
        return Err(AppError::MissingCourier);
    }
    let courier_required = matches!(
        target,
        PickupStatus::Accepted | PickupStatus::Completed | PickupStatus::Finished
    );
    if target == PickupStatus::Accepted && courier_id.is_none() {
        return Err(AppError::MissingCourier);
    }
    if courier_required && courier_id.or(current.courier_id).is_none() {
        return Err(AppError::MissingCourier);
    }

    Ok(PickupPatch {
        expected_status: current.status,
        status: target,
        courier_id,
        reason,
        updated_at: now,
    })
}

/// Pure form of a transition: the entity as it would be after the update.
pub fn apply_transition(
    current: &PickupRequest,
    target: PickupStatus,
    payload: &TransitionPayload,
    now: DateTime<Utc>,
) -> Result<PickupRequest, AppError> {
    let patch = plan_transition(current, target, payload, now)?;
    let mut updated = current.clone();
    patch.apply_to(&mut updated);
    Ok(updated)
}

pub async fn transition_pickup(
    state: &AppState,
    id: PickupId,
    target: PickupStatus,
    payload: TransitionPayload,
) -> Result<PickupRequest, AppError> {
    let result = persist_transition(state, id, target, &payload).await;

    let outcome = match &result {
        Ok(updated) => {
            info!(
                pickup_id = id,
                status = %updated.status,
                courier_id = ?updated.courier_id,
                "pickup status changed"
            );
            "success"
        }
        Err(AppError::Repository(_)) => "error",
        Err(err) => {
            warn!(pickup_id = id, target = %target, error = %err, "pickup transition rejected");
            "rejected"
        }
    };
    state
        .metrics
        .pickup_transitions_total
        .with_label_values(&[target.as_str(), outcome])
        .inc();

    result
}

async fn persist_transition(
    state: &AppState,
    id: PickupId,
    target: PickupStatus,
    payload: &TransitionPayload,
) -> Result<PickupRequest, AppError> {
    let current = state
        .pickups
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pickup {id} not found")))?;

    let patch = plan_transition(&current, target, payload, state.clock.now())?;
    Ok(state.pickups.update(id, patch).await?)
}
