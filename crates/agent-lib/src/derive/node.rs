//! Node memory, load and disk verdicts

use super::{format_bytes, threshold_status};
use crate::models::{CheckStatus, Verdict};
use crate::telemetry::{FsUsage, NodeUsage, TelemetryUnavailable};

fn percent(used: u64, total: u64) -> f64 {
    used as f64 * 100.0 / total as f64
}

/// Memory usage against allocatable memory
pub fn node_memory_verdict(
    usage: Result<&NodeUsage, &TelemetryUnavailable>,
    allocatable_bytes: Option<u64>,
) -> Verdict {
    let usage = match usage {
        Ok(usage) => usage,
        Err(e) => return Verdict::unknown(format!("Memory usage unavailable: {}", e)),
    };
    let allocatable = match allocatable_bytes {
        Some(bytes) if bytes > 0 => bytes,
        _ => return Verdict::unknown("Node reports no allocatable memory"),
    };

    let pct = percent(usage.memory_bytes, allocatable);
    Verdict::new(
        threshold_status(pct),
        format!(
            "{:.1}% used ({} / {})",
            pct,
            format_bytes(usage.memory_bytes),
            format_bytes(allocatable)
        ),
    )
    .with_value(pct)
}

/// CPU usage against allocatable CPU
pub fn node_load_verdict(
    usage: Result<&NodeUsage, &TelemetryUnavailable>,
    allocatable_millis: Option<u64>,
) -> Verdict {
    let usage = match usage {
        Ok(usage) => usage,
        Err(e) => return Verdict::unknown(format!("CPU usage unavailable: {}", e)),
    };
    let allocatable = match allocatable_millis {
        Some(millis) if millis > 0 => millis,
        _ => return Verdict::unknown("Node reports no allocatable CPU"),
    };

    let pct = percent(usage.cpu_millis, allocatable);
    Verdict::new(
        threshold_status(pct),
        format!("{:.1}% CPU ({}m / {}m)", pct, usage.cpu_millis, allocatable),
    )
    .with_value(pct)
}

/// Disk usage from kubelet stats, falling back to the `DiskPressure` condition
pub fn node_disk_verdict(
    fs: Result<&FsUsage, &TelemetryUnavailable>,
    disk_pressure: Option<bool>,
) -> Verdict {
    let reason = match fs {
        Ok(fs) if fs.capacity_bytes > 0 => {
            let pct = percent(fs.used_bytes, fs.capacity_bytes);
            return Verdict::new(
                threshold_status(pct),
                format!(
                    "{:.1}% used ({} / {})",
                    pct,
                    format_bytes(fs.used_bytes),
                    format_bytes(fs.capacity_bytes)
                ),
            )
            .with_value(pct);
        }
        Ok(_) => "no filesystem data in kubelet stats".to_string(),
        Err(e) => e.reason.clone(),
    };

    match disk_pressure {
        Some(true) => Verdict::new(
            CheckStatus::Critical,
            format!("DiskPressure condition is True ({})", reason),
        ),
        Some(false) => Verdict::new(
            CheckStatus::Ok,
            format!("No DiskPressure ({})", reason),
        ),
        None => Verdict::unknown(format!(
            "Disk usage unavailable: {}; no DiskPressure condition reported",
            reason
        )),
    }
}
