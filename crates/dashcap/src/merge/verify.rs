use std::path::Path;

use super::Prober;

/// Accepted difference between declared and measured duration, in seconds.
pub const DEFAULT_TOLERANCE: f64 = 5.0;

/// Outcome of comparing the muxed file against the manifest duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrityReport {
    pub expected: f64,
    pub actual: f64,
    pub tolerance: f64,
    pub passed: bool,
}

impl IntegrityReport {
    /// A non-positive `expected` duration can not be checked and passes.
    pub fn new(expected: f64, actual: f64, tolerance: f64) -> Self {
        let passed = expected <= 0.0 || within_tolerance(expected, actual, tolerance);
        Self {
            expected,
            actual,
            tolerance,
            passed,
        }
    }

    pub fn difference(&self) -> f64 {
        (self.actual - self.expected).abs()
    }
}

pub fn within_tolerance(expected: f64, actual: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance
}

/// Measure `path` and compare it with `expected` seconds. Never fails: a
/// probe error counts as a duration of 0.
pub async fn verify_integrity<P>(
    prober: &P,
    path: &Path,
    expected: f64,
    tolerance: f64,
) -> IntegrityReport
where
    P: Prober,
{
    if expected <= 0.0 {
        log::warn!("Expected duration unknown, skipping integrity check.");
        return IntegrityReport::new(expected, 0.0, tolerance);
    }

    let actual = match prober.duration(path).await {
        Ok(actual) => actual,
        Err(e) => {
            log::warn!("Failed to probe {}: {e}", path.display());
            0.0
        }
    };

    let report = IntegrityReport::new(expected, actual, tolerance);
    if report.passed {
        log::info!(
            "Integrity check passed: expected {expected:.2}s, got {actual:.2}s."
        );
    } else {
        log::error!(
            "Integrity check failed: expected {expected:.2}s, got {actual:.2}s (difference {:.2}s > {tolerance:.2}s).",
            report.difference()
        );
    }
    report
}
