// src/dosing.rs
//
// Pure dosing core: margin math, the status transition table, and the
// capture planner. Handlers persist a `CapturePlan` as a single UPDATE so
// the actual/margin/status triple lands atomically.

use crate::error::AppError;
use crate::models::recipe::RecipeMaterialStatus;

/// Tolerance applied by start-dosing when the record has no stored margin.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Half-away-from-zero rounding to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Signed percentage deviation of `actual` from `set_point`.
/// Positive means under target, negative means overshoot.
pub fn percentage_margin(set_point: f64, actual: f64) -> f64 {
    if set_point == 0.0 {
        0.0
    } else {
        round2(((set_point - actual) / set_point) * 100.0)
    }
}

/// Remaining-capacity margin for a raw material's stock level.
pub fn stock_margin(current_quantity: f64, maximum_quantity: f64) -> f64 {
    if maximum_quantity > 0.0 {
        round2(((maximum_quantity - current_quantity) / maximum_quantity) * 100.0)
    } else {
        0.0
    }
}

/// Whether a captured record may be dosed again.
#[derive(Debug, Clone, Copy)]
pub struct DosingPolicy {
    pub allow_redose: bool,
}

impl Default for DosingPolicy {
    fn default() -> Self {
        Self { allow_redose: false }
    }
}

impl DosingPolicy {
    pub fn from_env() -> Self {
        let allow_redose = std::env::var("ALLOW_REDOSE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self { allow_redose }
    }
}

/// Status a record moves to when a capture is accepted. Captures only ever
/// advance `pending`/`in progress` to `created`; statuses past that point
/// are terminal for the capture path and keep their value.
pub fn status_after_capture(current: RecipeMaterialStatus) -> RecipeMaterialStatus {
    match current {
        RecipeMaterialStatus::Pending | RecipeMaterialStatus::InProgress => {
            RecipeMaterialStatus::Created
        }
        RecipeMaterialStatus::Created
        | RecipeMaterialStatus::Released
        | RecipeMaterialStatus::Unreleased => current,
    }
}

/// The triple a capture persists, computed before any write happens.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePlan {
    pub actual: f64,
    pub margin: f64,
    pub status: RecipeMaterialStatus,
}

/// Snapshot of the dosing record a capture runs against.
#[derive(Debug, Clone, Copy)]
pub struct DosingSnapshot {
    pub set_point: f64,
    pub status: RecipeMaterialStatus,
}

/// Plans a plain weight capture. Rejects re-dosing of records that already
/// left the pending/in-progress stages unless the policy allows it; an
/// allowed re-dose refreshes actual/margin without regressing the status.
pub fn plan_capture(
    snapshot: DosingSnapshot,
    sample: f64,
    policy: DosingPolicy,
) -> Result<CapturePlan, AppError> {
    let already_dosed = !matches!(
        snapshot.status,
        RecipeMaterialStatus::Pending | RecipeMaterialStatus::InProgress
    );
    if already_dosed && !policy.allow_redose {
        return Err(AppError::conflict(format!(
            "Recipe material is already {} and cannot be dosed again",
            snapshot.status
        )));
    }

    Ok(CapturePlan {
        actual: sample,
        margin: percentage_margin(snapshot.set_point, sample),
        status: status_after_capture(snapshot.status),
    })
}

/// Plans a capture straight from a device answer. A failed read yields the
/// device error and no plan, so the caller has nothing to persist and the
/// record stays exactly as it was.
pub fn plan_capture_read<E: Into<AppError>>(
    snapshot: DosingSnapshot,
    read: Result<f64, E>,
    policy: DosingPolicy,
) -> Result<CapturePlan, AppError> {
    let sample = read.map_err(Into::into)?;
    plan_capture(snapshot, sample, policy)
}

/// Start-dosing gate: within tolerance the record is `created`, otherwise it
/// falls back to `pending` for another attempt.
pub fn tolerance_outcome(set_point: f64, tolerance: f64, sample: f64) -> RecipeMaterialStatus {
    if (sample - set_point).abs() <= tolerance {
        RecipeMaterialStatus::Created
    } else {
        RecipeMaterialStatus::Pending
    }
}

/// What a start-dosing attempt persists once the device has answered.
#[derive(Debug)]
pub enum DosingAttempt<E> {
    /// Sample taken; write actual + the tolerance-gated status.
    Settled { actual: f64, status: RecipeMaterialStatus },
    /// Device read failed; write back the pre-attempt status so the record
    /// is never left stuck `in progress`.
    Restore { status: RecipeMaterialStatus, error: E },
}

pub fn settle_dosing_attempt<E>(
    prior_status: RecipeMaterialStatus,
    set_point: f64,
    tolerance: f64,
    read: Result<f64, E>,
) -> DosingAttempt<E> {
    match read {
        Ok(sample) => DosingAttempt::Settled {
            actual: sample,
            status: tolerance_outcome(set_point, tolerance, sample),
        },
        Err(error) => DosingAttempt::Restore { status: prior_status, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::testing::FailingScale;
    use crate::scale::{ScaleError, WeightReader};

    #[test]
    fn margin_formula() {
        // Scenario A: set_point 100, actual 90.
        assert_eq!(percentage_margin(100.0, 90.0), 10.0);
        // Overshoot is negative.
        assert_eq!(percentage_margin(100.0, 110.0), -10.0);
        // Rounded to two decimals.
        assert_eq!(percentage_margin(3.0, 2.0), 33.33);
        assert_eq!(percentage_margin(3.0, 1.0), 66.67);
    }

    #[test]
    fn zero_set_point_short_circuits() {
        assert_eq!(percentage_margin(0.0, 42.0), 0.0);
    }

    #[test]
    fn stock_margin_derivation() {
        assert_eq!(stock_margin(25.0, 100.0), 75.0);
        assert_eq!(stock_margin(100.0, 100.0), 0.0);
        assert_eq!(stock_margin(10.0, 0.0), 0.0);
    }

    #[test]
    fn capture_advances_pending_and_in_progress() {
        for from in [RecipeMaterialStatus::Pending, RecipeMaterialStatus::InProgress] {
            let plan = plan_capture(
                DosingSnapshot { set_point: 100.0, status: from },
                90.0,
                DosingPolicy::default(),
            )
            .unwrap();
            assert_eq!(plan.status, RecipeMaterialStatus::Created);
            assert_eq!(plan.actual, 90.0);
            assert_eq!(plan.margin, 10.0);
        }
    }

    #[test]
    fn capture_refuses_redose_by_default() {
        for from in [
            RecipeMaterialStatus::Created,
            RecipeMaterialStatus::Released,
            RecipeMaterialStatus::Unreleased,
        ] {
            let err = plan_capture(
                DosingSnapshot { set_point: 100.0, status: from },
                90.0,
                DosingPolicy::default(),
            )
            .unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }
    }

    #[test]
    fn redose_keeps_status_when_allowed() {
        let plan = plan_capture(
            DosingSnapshot { set_point: 100.0, status: RecipeMaterialStatus::Released },
            95.0,
            DosingPolicy { allow_redose: true },
        )
        .unwrap();
        // actual/margin refresh, the released status is not regressed
        assert_eq!(plan.status, RecipeMaterialStatus::Released);
        assert_eq!(plan.margin, 5.0);
    }

    #[tokio::test]
    async fn failed_read_produces_no_capture_plan() {
        // Scenario B: the device dies mid-capture. No plan comes back, so the
        // handler has nothing to write and the record keeps its state.
        let read = FailingScale.read_net_weight().await;
        let err = plan_capture_read(
            DosingSnapshot { set_point: 100.0, status: RecipeMaterialStatus::Pending },
            read,
            DosingPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn failed_read_restores_pre_attempt_status() {
        // A record optimistically moved to `in progress` must come back to
        // whatever it was before the attempt, never stay mid-dose.
        for prior in [RecipeMaterialStatus::Pending, RecipeMaterialStatus::Created] {
            let read = FailingScale.read_net_weight().await;
            match settle_dosing_attempt(prior, 100.0, DEFAULT_TOLERANCE, read) {
                DosingAttempt::Restore { status, .. } => assert_eq!(status, prior),
                DosingAttempt::Settled { .. } => panic!("failed read must not settle"),
            }
        }
    }

    #[test]
    fn successful_read_settles_through_tolerance_gate() {
        let attempt = settle_dosing_attempt::<ScaleError>(
            RecipeMaterialStatus::Pending,
            100.0,
            DEFAULT_TOLERANCE,
            Ok(100.05),
        );
        match attempt {
            DosingAttempt::Settled { actual, status } => {
                assert_eq!(actual, 100.05);
                assert_eq!(status, RecipeMaterialStatus::Created);
            }
            DosingAttempt::Restore { .. } => panic!("successful read must settle"),
        }
    }

    #[test]
    fn tolerance_gate() {
        // Scenario C: set_point 100, tolerance 0.1.
        assert_eq!(
            tolerance_outcome(100.0, DEFAULT_TOLERANCE, 100.05),
            RecipeMaterialStatus::Created
        );
        assert_eq!(
            tolerance_outcome(100.0, DEFAULT_TOLERANCE, 105.0),
            RecipeMaterialStatus::Pending
        );
        // Boundary is inclusive.
        assert_eq!(
            tolerance_outcome(100.0, DEFAULT_TOLERANCE, 100.1),
            RecipeMaterialStatus::Created
        );
    }
}
