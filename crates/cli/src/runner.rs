//! [`JobRunner`] binding the scheduler's two fixed jobs to this crate's
//! processor and status-reporter handlers (SPEC_FULL §4.H).

use pulse_scheduler::{Job, JobRunner};
use tracing::error;

use crate::app::AppContext;
use crate::{processor, status};

pub struct PipelineJobRunner {
    ctx: AppContext,
}

impl PipelineJobRunner {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait::async_trait]
impl JobRunner for PipelineJobRunner {
    async fn run(&self, job: Job) {
        let result = match job {
            Job::Processor => processor::run_processor(&self.ctx).await,
            Job::StatusReporter => status::send_status(&self.ctx).await,
        };
        if let Err(err) = result {
            error!(?job, error = %err, "scheduled job failed");
        }
    }
}
