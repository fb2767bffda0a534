//! Deployment and persistent volume claim verdicts

use super::bytes_to_gib;
use crate::models::{CheckStatus, Verdict};
use crate::state::{DeploymentState, PvcState};

/// Replica readiness of a deployment
pub fn deployment_verdict(state: &DeploymentState) -> Verdict {
    let desired = state.desired_replicas.unwrap_or(1);
    let ready = state.ready_replicas;
    let message = format!("{}/{} replicas ready", ready, desired);

    let status = if ready == desired && state.available_replicas == desired {
        CheckStatus::Ok
    } else if ready == 0 {
        CheckStatus::Critical
    } else {
        CheckStatus::Warning
    };

    Verdict::new(status, message)
}

/// Claim phase, annotated with size and storage class
pub fn pvc_verdict(state: &PvcState) -> Verdict {
    let detail = match (&state.requested_storage, &state.storage_class) {
        (Some(size), Some(class)) => format!(", {} ({})", size, class),
        (Some(size), None) => format!(", {}", size),
        (None, Some(class)) => format!(" ({})", class),
        (None, None) => String::new(),
    };

    let (status, message) = match state.phase.as_deref() {
        Some("Bound") => (CheckStatus::Ok, format!("Bound{}", detail)),
        Some("Pending") => (CheckStatus::Warning, format!("Pending{}", detail)),
        Some("Lost") => (CheckStatus::Critical, format!("Lost{}", detail)),
        other => (
            CheckStatus::Unknown,
            format!("Phase: {}{}", other.unwrap_or("unknown"), detail),
        ),
    };

    let verdict = Verdict::new(status, message);
    match state.requested_bytes {
        Some(bytes) => verdict.with_value(bytes_to_gib(bytes)),
        None => verdict,
    }
}
