//! [`Orchestrator`]: tracks the two wall-clock jobs (SPEC_FULL §4.H) and
//! computes how long the scheduler thread should sleep before checking again.

use chrono::{DateTime, Utc};

use crate::error::SchedulerError;
use crate::trigger::{DailyTrigger, IntervalTrigger};

/// 5s safety cap on the scheduler's sleep: bounds shutdown latency and
/// bounds how stale a missed-job detection can be (SPEC_FULL §4.H, §8
/// property 12).
pub const SAFETY_CAP_SECONDS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Processor,
    StatusReporter,
}

pub struct Orchestrator {
    processor: DailyTrigger,
    status_reporter: IntervalTrigger,
}

impl Orchestrator {
    pub fn new(schedule_time: &str, timezone: &str, status_interval_minutes: u32) -> Result<Self, SchedulerError> {
        Ok(Self {
            processor: DailyTrigger::new(schedule_time, timezone)?,
            status_reporter: IntervalTrigger::new(chrono::Duration::minutes(i64::from(
                status_interval_minutes.max(1),
            ))),
        })
    }

    /// Jobs whose most recent scheduled tick has not yet run.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<Job> {
        let mut due = Vec::new();
        if self.processor.is_due(now) {
            due.push(Job::Processor);
        }
        if self.status_reporter.is_due(now) {
            due.push(Job::StatusReporter);
        }
        due
    }

    /// Seconds until the nearest job becomes due. Negative if a job is
    /// already overdue.
    pub fn idle_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.processor
            .seconds_until_due(now)
            .min(self.status_reporter.seconds_until_due(now))
    }

    /// `min(idle_seconds, 5s)`, floored at 0 — never sleeps on a negative
    /// duration, never sleeps past the safety cap.
    pub fn sleep_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.idle_seconds(now).clamp(0, SAFETY_CAP_SECONDS) as u64
    }

    pub fn record_trigger(&mut self, job: Job, at: DateTime<Utc>) {
        match job {
            Job::Processor => self.processor.record_trigger(at),
            Job::StatusReporter => self.status_reporter.record_trigger(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new("09:00", "UTC", 30).unwrap()
    }

    #[test]
    fn sleep_never_exceeds_safety_cap() {
        let orch = orchestrator();
        // Far in the future from both triggers' next tick: idle_seconds is
        // large and positive, but sleep_seconds still clamps to 5.
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        assert!(orch.sleep_seconds(now) <= SAFETY_CAP_SECONDS as u64);
    }

    #[test]
    fn overdue_job_clamps_sleep_to_zero_not_negative() {
        let mut orch = orchestrator();
        let scheduled = Utc.with_ymd_and_hms(2026, 7, 28, 9, 0, 0).unwrap();
        // Never triggered: processor is already "overdue" relative to now.
        let now = scheduled + chrono::Duration::hours(1);
        assert!(orch.idle_seconds(now) < 0);
        assert_eq!(orch.sleep_seconds(now), 0);
        orch.record_trigger(Job::Processor, now);
    }

    #[test]
    fn due_jobs_lists_both_when_both_overdue() {
        let orch = orchestrator();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
        let due = orch.due_jobs(now);
        assert!(due.contains(&Job::Processor));
        assert!(due.contains(&Job::StatusReporter));
    }

    #[test]
    fn recording_a_trigger_removes_it_from_due_jobs() {
        let mut orch = orchestrator();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
        orch.record_trigger(Job::Processor, now);
        orch.record_trigger(Job::StatusReporter, now);
        assert!(orch.due_jobs(now).is_empty());
    }
}
