use std::collections::HashMap;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{self, WaitStatus};
use nix::unistd::Pid;
use tracing::debug;

use super::job::ProcessGroup;
use crate::error::ExecError;

/// Exit status reserved for "exec failed" and "redirection target could not be opened".
pub const EXEC_FAILED: i32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    Exited(i32),
    Signaled(Signal),
}

impl StageExit {
    fn from_wait(status: WaitStatus) -> Option<(Pid, StageExit)> {
        match status {
            WaitStatus::Exited(pid, code) => Some((pid, StageExit::Exited(code))),
            WaitStatus::Signaled(pid, sig, _) => Some((pid, StageExit::Signaled(sig))),
            _ => None,
        }
    }

    /// Shell-style status: the exit code, or 128 plus the signal number.
    pub fn code(self) -> i32 {
        match self {
            StageExit::Exited(code) => code,
            StageExit::Signaled(sig) => 128 + sig as i32,
        }
    }

    pub fn is_exec_failure(self) -> bool {
        self == StageExit::Exited(EXEC_FAILED)
    }
}

/// How every stage of one pipeline ended, in stage order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStatus {
    pub stages: Vec<(Pid, StageExit)>,
}

impl PipelineStatus {
    /// The pipeline's status is its last stage's.
    pub fn code(&self) -> i32 {
        self.stages.last().map_or(0, |(_, exit)| exit.code())
    }

    pub fn success(&self) -> bool {
        self.code() == 0
    }
}

pub struct ReaperWaiter;

impl ReaperWaiter {
    /// Block until every member of `group` has been reaped.
    ///
    /// Waits for any child of the group until the kernel reports none left,
    /// then collects members that were never observed through the group.
    pub fn wait(group: &ProcessGroup) -> Result<PipelineStatus, ExecError> {
        let mut exits = HashMap::with_capacity(group.members.len());

        let any_in_group = Pid::from_raw(-group.pgid().as_raw());
        loop {
            match wait::waitpid(any_in_group, None) {
                Ok(status) => record(&mut exits, status),
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => break,
                Err(errno) => return Err(ExecError::sys("waitpid")(errno)),
            }
        }

        for &pid in &group.members {
            while !exits.contains_key(&pid) {
                match wait::waitpid(pid, None) {
                    Ok(status) => record(&mut exits, status),
                    Err(Errno::EINTR) => continue,
                    Err(Errno::ECHILD) => break,
                    Err(errno) => return Err(ExecError::sys("waitpid")(errno)),
                }
            }
        }

        let stages = group
            .members
            .iter()
            .filter_map(|pid| exits.get(pid).map(|exit| (*pid, *exit)))
            .collect();
        Ok(PipelineStatus { stages })
    }
}

fn record(exits: &mut HashMap<Pid, StageExit>, status: WaitStatus) {
    if let Some((pid, exit)) = StageExit::from_wait(status) {
        debug!(%pid, ?exit, "reaped stage");
        exits.insert(pid, exit);
    }
}
