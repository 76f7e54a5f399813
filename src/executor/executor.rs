use crate::environment::Environment;
use crate::error::ExecError;
use crate::plan::PipelinePlan;

use super::reaper::PipelineStatus;

pub type ExecStatus = Result<PipelineStatus, ExecError>;

pub trait Executor {
    /// Run `plan` to completion. Returns once every stage has exited.
    fn exec(&mut self, plan: &PipelinePlan, env: &Environment) -> ExecStatus;
}
