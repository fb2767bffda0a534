//! Backup schedule verdict
//!
//! Looks at the most recent backup object and its terminal condition.
//! Age drives staleness: a completed backup older than [`STALE_AFTER`]
//! is a warning, and a backup without a terminal condition is treated as
//! running for [`IN_PROGRESS_WINDOW`].

use super::format_duration;
use crate::models::{CheckStatus, Verdict};
use crate::state::BackupRecord;
use chrono::{DateTime, Duration, Utc};

/// Completed backups older than this are stale
pub const STALE_AFTER: Duration = Duration::hours(48);
/// Backups without a terminal condition younger than this are running
pub const IN_PROGRESS_WINDOW: Duration = Duration::hours(2);

/// Newest backup by creation time; ties keep the earliest listed
fn latest(backups: &[BackupRecord]) -> Option<&BackupRecord> {
    let mut sorted: Vec<&BackupRecord> = backups.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.into_iter().next()
}

/// Verdict for a schedule given the backups in its namespace
pub fn backup_verdict(backups: &[BackupRecord], now: DateTime<Utc>) -> Verdict {
    let latest = match latest(backups) {
        Some(backup) => backup,
        None => return Verdict::new(CheckStatus::Warning, "No backups found").with_value(0.0),
    };

    let age = (now - latest.created_at).max(Duration::zero());
    let age_secs = age.num_seconds() as f64;
    let age_str = format_duration(age);

    for condition in &latest.conditions {
        if condition.is_true("Completed") {
            let verdict = if age > STALE_AFTER {
                Verdict::new(
                    CheckStatus::Warning,
                    format!("Last backup completed {} ago (stale)", age_str),
                )
            } else {
                Verdict::new(
                    CheckStatus::Ok,
                    format!("Last backup completed {} ago", age_str),
                )
            };
            return verdict.with_value(age_secs);
        }
        if condition.is_true("Failed") {
            return Verdict::new(
                CheckStatus::Critical,
                format!("Last backup failed {} ago: {}", age_str, condition.message),
            )
            .with_value(age_secs);
        }
    }

    let verdict = if age < IN_PROGRESS_WINDOW {
        Verdict::new(
            CheckStatus::Ok,
            format!("Backup in progress ({} ago)", age_str),
        )
    } else if age > STALE_AFTER {
        Verdict::new(
            CheckStatus::Warning,
            format!("No recent backup (last: {} ago)", age_str),
        )
    } else {
        Verdict::new(CheckStatus::Ok, format!("Last backup: {} ago", age_str))
    };
    verdict.with_value(age_secs)
}
