//! Status derivation rules
//!
//! One pure function per resource kind turning typed state into a
//! [`Verdict`](crate::models::Verdict). No I/O happens here; age-based
//! rules take the current time as an argument.

mod backup;
mod node;
mod workload;

pub use backup::{backup_verdict, IN_PROGRESS_WINDOW, STALE_AFTER};
pub use node::{node_disk_verdict, node_load_verdict, node_memory_verdict};
pub use workload::{deployment_verdict, pvc_verdict};

use crate::models::CheckStatus;

/// Usage percentage at or above which a check is critical
pub const CRITICAL_PERCENT: f64 = 90.0;
/// Usage percentage at or above which a check is warning
pub const WARNING_PERCENT: f64 = 80.0;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Map a usage percentage onto a status
pub fn threshold_status(percent: f64) -> CheckStatus {
    if percent >= CRITICAL_PERCENT {
        CheckStatus::Critical
    } else if percent >= WARNING_PERCENT {
        CheckStatus::Warning
    } else {
        CheckStatus::Ok
    }
}

/// Render a duration with the largest fitting unit, truncated
pub fn format_duration(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

/// Render a byte count as `Gi` with one decimal, or whole `Mi` below 1 GiB
pub fn format_bytes(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes >= GIB {
        format!("{:.1}Gi", bytes / GIB)
    } else {
        format!("{:.0}Mi", bytes / MIB)
    }
}

/// Bytes expressed in GiB
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}
