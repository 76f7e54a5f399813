use tracing::{debug, warn};

use super::executor::{ExecStatus, Executor};
use super::job::JobController;
use super::launcher::ProcessLauncher;
use super::reaper::{PipelineStatus, ReaperWaiter};
use crate::environment::Environment;
use crate::plan::PipelinePlan;

/// Spawns, foregrounds and reaps real processes.
pub struct DefaultExecutor {
    jobs: JobController,
}

impl DefaultExecutor {
    pub fn new(job_control: bool) -> Self {
        Self {
            jobs: JobController::new(job_control),
        }
    }
}

impl Executor for DefaultExecutor {
    fn exec(&mut self, plan: &PipelinePlan, env: &Environment) -> ExecStatus {
        if plan.is_empty() {
            return Ok(PipelineStatus::default());
        }

        let spawned = ProcessLauncher::new(env).spawn(plan, &mut self.jobs);
        if let Err(e) = &spawned {
            warn!(error = %e, "pipeline spawn stopped early");
        }

        let reaped = match self.jobs.group() {
            Some(group) => ReaperWaiter::wait(group),
            None => Ok(PipelineStatus::default()),
        };

        // Taking the terminal back comes first: failing that ends the shell.
        self.jobs.release()?;
        spawned?;
        let status = reaped?;
        debug!(code = status.code(), "pipeline finished");
        Ok(status)
    }
}
