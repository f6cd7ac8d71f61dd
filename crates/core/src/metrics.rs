//! Metric names and descriptions.
//!
//! Every crate records through the `metrics` facade using these constants.
//! Without an installed recorder the macros are no-ops.
//!
//! # Naming
//!
//! - prefix: `gridrun_`
//! - suffix: `_total` (counter), `_seconds` (histogram)
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(gridrun_core::metrics::COMMANDS_EXECUTED_TOTAL).increment(1);
//! ```

// ─── label keys ─────────────────────────────────────────────────────

/// Pipeline step name label.
pub const LABEL_STEP: &str = "step";

/// Result label (success, failure).
pub const LABEL_RESULT: &str = "result";

/// Job outcome label (passed, failed, timed_out).
pub const LABEL_OUTCOME: &str = "outcome";

// ─── command runner ─────────────────────────────────────────────────

/// External commands spawned (counter, label: result)
pub const COMMANDS_EXECUTED_TOTAL: &str = "gridrun_commands_executed_total";

// ─── pollers ────────────────────────────────────────────────────────

/// Readiness polls issued (counter)
pub const READINESS_POLLS_TOTAL: &str = "gridrun_readiness_polls_total";

/// Job log polls issued (counter)
pub const JOB_LOG_POLLS_TOTAL: &str = "gridrun_job_log_polls_total";

// ─── pipeline ───────────────────────────────────────────────────────

/// Step executions (counter, labels: step, result)
pub const PIPELINE_STEPS_TOTAL: &str = "gridrun_pipeline_steps_total";

/// Step wall-clock duration (histogram, seconds, label: step)
pub const PIPELINE_STEP_DURATION_SECONDS: &str = "gridrun_pipeline_step_duration_seconds";

/// Job outcomes (counter, label: outcome)
pub const JOB_OUTCOMES_TOTAL: &str = "gridrun_job_outcomes_total";

/// Registers descriptions for every metric.
///
/// Call once at startup; a no-op until a recorder is installed.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        COMMANDS_EXECUTED_TOTAL,
        "Total number of control-plane commands spawned"
    );
    describe_counter!(
        READINESS_POLLS_TOTAL,
        "Total number of ready-replica queries"
    );
    describe_counter!(JOB_LOG_POLLS_TOTAL, "Total number of job log tail fetches");
    describe_counter!(
        PIPELINE_STEPS_TOTAL,
        "Total number of pipeline step executions"
    );
    describe_histogram!(
        PIPELINE_STEP_DURATION_SECONDS,
        "Pipeline step duration in seconds"
    );
    describe_counter!(JOB_OUTCOMES_TOTAL, "Total number of decoded job outcomes");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            COMMANDS_EXECUTED_TOTAL,
            READINESS_POLLS_TOTAL,
            JOB_LOG_POLLS_TOTAL,
            PIPELINE_STEPS_TOTAL,
            PIPELINE_STEP_DURATION_SECONDS,
            JOB_OUTCOMES_TOTAL,
        ] {
            assert!(name.starts_with("gridrun_"), "{name} lacks prefix");
        }
    }

    #[test]
    fn describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
