use std::io;
use std::os::fd::AsFd;

use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, Pid};
use tracing::{debug, warn};

use crate::error::ExecError;

/// The process group of the pipeline currently running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessGroup {
    pub leader: Pid,
    pub members: Vec<Pid>,
    /// Set once the terminal has actually been handed to this group.
    pub foreground: bool,
}

impl ProcessGroup {
    fn new(leader: Pid) -> Self {
        Self {
            leader,
            members: vec![leader],
            foreground: false,
        }
    }

    pub fn pgid(&self) -> Pid {
        self.leader
    }
}

/// Tracks the group of one pipeline from its first fork until it is reaped.
///
/// Membership is established redundantly: every child calls
/// [`JobController::join_from_child`] before exec, and the parent calls
/// [`JobController::adopt`] with the child's pid right after fork. Whichever
/// runs first wins, so the parent never touches the terminal while the
/// leader's group does not exist yet.
pub struct JobController {
    job_control: bool,
    group: Option<ProcessGroup>,
}

impl JobController {
    pub fn new(job_control: bool) -> Self {
        Self {
            job_control,
            group: None,
        }
    }

    /// Group the next child has to join; `None` means it becomes the leader.
    pub fn leader(&self) -> Option<Pid> {
        self.group.as_ref().map(ProcessGroup::pgid)
    }

    pub fn group(&self) -> Option<&ProcessGroup> {
        self.group.as_ref()
    }

    /// Child side of the group join. Safe to call between fork and exec.
    pub fn join_from_child(leader: Option<Pid>) -> nix::Result<()> {
        let own = Pid::from_raw(0);
        unistd::setpgid(own, leader.unwrap_or(own))
    }

    /// Parent side of the group join, done for every forked stage.
    ///
    /// The first child founds the group and, with job control on, receives
    /// the terminal.
    pub fn adopt(&mut self, child: Pid) {
        let leader = self.leader().unwrap_or(child);
        if let Err(errno) = unistd::setpgid(child, leader) {
            // EACCES once the child has exec'd, ESRCH once it is gone; its own join covers both.
            debug!(%child, %leader, %errno, "parent-side setpgid failed");
        }

        match &mut self.group {
            Some(group) => group.members.push(child),
            None => {
                let mut group = ProcessGroup::new(child);
                if self.job_control {
                    give_terminal(&mut group);
                }
                let foreground = group.foreground;
                debug!(pgid = %group.leader, foreground, "process group created");
                self.group = Some(group);
            }
        }
    }

    /// Forget the finished group and take the terminal back if it was handed out.
    pub fn release(&mut self) -> Result<(), ExecError> {
        match self.group.take() {
            Some(group) if group.foreground => reclaim_terminal(),
            _ => Ok(()),
        }
    }
}

fn give_terminal(group: &mut ProcessGroup) {
    match unistd::tcsetpgrp(io::stdin().as_fd(), group.leader) {
        Ok(()) => group.foreground = true,
        Err(errno) => warn!(pgid = %group.leader, %errno, "cannot hand terminal to pipeline"),
    }
    // The leader may already have stopped on SIGTTIN/SIGTTOU before the handoff.
    if let Err(errno) = signal::kill(group.leader, Signal::SIGCONT) {
        debug!(pgid = %group.leader, %errno, "SIGCONT to leader failed");
    }
}

fn reclaim_terminal() -> Result<(), ExecError> {
    // A background process calling tcsetpgrp gets SIGTTOU unless it is ignored.
    // SAFETY: switching between SIG_IGN and SIG_DFL installs no handler.
    unsafe { signal::signal(Signal::SIGTTOU, SigHandler::SigIgn) }
        .map_err(ExecError::sys("signal"))?;
    let reclaimed = unistd::tcsetpgrp(io::stdin().as_fd(), unistd::getpgrp());
    // SAFETY: as above.
    unsafe { signal::signal(Signal::SIGTTOU, SigHandler::SigDfl) }
        .map_err(ExecError::sys("signal"))?;
    reclaimed.map_err(ExecError::ForegroundReclaim)?;
    debug!("terminal foreground restored to the shell");
    Ok(())
}
