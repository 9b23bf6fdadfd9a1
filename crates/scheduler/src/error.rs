use thiserror::Error;

/// Errors that prevent the scheduler itself from running — everything a due
/// job does once triggered is the orchestrator/CLI's concern, reported
/// through `pulse_core::PipelineError` rather than here (SPEC_FULL §7:
/// "errors that invalidate the current run propagate to the orchestrator,
/// which logs and continues to schedule the next tick").
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid schedule_time '{0}', expected HH:MM")]
    InvalidScheduleTime(String),

    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),
}

impl From<SchedulerError> for pulse_core::error::PipelineError {
    fn from(e: SchedulerError) -> Self {
        pulse_core::error::PipelineError::InvalidConfig(e.to_string())
    }
}
