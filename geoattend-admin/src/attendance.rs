//! Attendance export and review of failed attempts

use crate::error::{AdminError, AdminResult};
use crate::events::truncate;
use crate::Dashboard;
use geoattend_common::api::{ApprovalRequest, AttendanceExport, FailedAttempt};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

impl Dashboard {
    /// Download the attendance report of an event into `dir`
    ///
    /// Uses the file name suggested by the backend. An existing file is only
    /// replaced when `overwrite` is set.
    pub async fn download_attendance(
        &self,
        event_id: &str,
        dir: &Path,
        overwrite: bool,
    ) -> AdminResult<PathBuf> {
        let export = self.api.download_attendance(event_id).await?;
        let path = write_export(&export, dir, overwrite)?;
        info!(
            event_id,
            bytes = export.bytes.len(),
            "Attendance report saved to {}",
            path.display()
        );
        Ok(path)
    }

    pub async fn failed_attempts(&self, event_id: &str) -> AdminResult<Vec<FailedAttempt>> {
        Ok(self.api.failed_attempts(event_id).await?)
    }

    /// Approve or reject a failed attempt; returns the backend's message
    pub async fn review_attempt(&self, attempt_id: &str, approved: bool) -> AdminResult<String> {
        let response = self
            .api
            .approve_attendance(&ApprovalRequest {
                attempt_id: attempt_id.to_string(),
                approved,
            })
            .await?;

        let message = response.message.unwrap_or_else(|| {
            if approved {
                "Attendance approved".to_string()
            } else {
                "Attendance rejected".to_string()
            }
        });

        if response
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
        {
            warn!(attempt_id, approved, "Review rejected: {}", message);
            return Err(AdminError::Rejected(message));
        }

        info!(attempt_id, approved, "Attempt reviewed");
        Ok(message)
    }
}

/// Write an export atomically (temp file, then rename)
pub fn write_export(export: &AttendanceExport, dir: &Path, overwrite: bool) -> AdminResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&export.file_name);
    if path.exists() && !overwrite {
        return Err(AdminError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists (use --overwrite)", path.display()),
        )));
    }

    let tmp = dir.join(format!(".{}.tmp", export.file_name));
    std::fs::write(&tmp, &export.bytes)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

/// Plain-text table of failed attempts
pub fn render_attempts(attempts: &[FailedAttempt]) -> String {
    if attempts.is_empty() {
        return "No failed attempts".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<12} {:<20} {:>10} {:<10} REASON",
        "ID", "REG NO", "NAME", "DISTANCE", "STATUS"
    );
    for attempt in attempts {
        let _ = writeln!(
            out,
            "{:<8} {:<12} {:<20} {:>10} {:<10} {}",
            attempt.id,
            truncate(&attempt.reg_no, 12),
            truncate(attempt.name.as_deref().unwrap_or("-"), 20),
            attempt
                .distance_meters
                .map(|d| format!("{:.0} m", d))
                .unwrap_or_else(|| "-".to_string()),
            attempt.status.as_deref().unwrap_or("pending"),
            attempt.reason.as_deref().unwrap_or("-"),
        );
    }
    out.trim_end().to_string()
}
