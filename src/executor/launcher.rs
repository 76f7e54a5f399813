use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::io::RawFd;

use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use tracing::debug;

use super::job::JobController;
use super::reaper::EXEC_FAILED;
use crate::environment::Environment;
use crate::error::ExecError;
use crate::interrupt;
use crate::plan::{PipelinePlan, RedirectMode, RedirectSpec};

struct PreparedStage {
    program: CString,
    argv: Vec<CString>,
}

struct PreparedRedirect {
    fd: RawFd,
    path: CString,
    flags: OFlag,
}

impl PreparedRedirect {
    fn new(spec: &RedirectSpec) -> Result<Self, ExecError> {
        let flags = match spec.mode {
            RedirectMode::Read => OFlag::O_RDONLY,
            RedirectMode::Truncate => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            RedirectMode::Append => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        };
        Ok(Self {
            fd: spec.fd,
            path: CString::new(spec.target.as_str())?,
            flags,
        })
    }

    /// Open the target and move it onto the requested descriptor.
    fn bind(&self) -> nix::Result<()> {
        let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
        let fd = fcntl::open(self.path.as_c_str(), self.flags, mode)?;
        if fd != self.fd {
            unistd::dup2(fd, self.fd)?;
            unistd::close(fd)?;
        }
        Ok(())
    }
}

/// Everything a child needs, converted before the first fork so that the
/// child never allocates C strings or touches the plan.
struct Prepared {
    stages: Vec<PreparedStage>,
    redirect_from: Vec<PreparedRedirect>,
    redirect_to: Vec<PreparedRedirect>,
    envp: Vec<CString>,
}

impl Prepared {
    fn new(plan: &PipelinePlan, env: &Environment) -> Result<Self, ExecError> {
        let stages = plan
            .stages
            .iter()
            .map(|stage| -> Result<PreparedStage, ExecError> {
                let argv = stage
                    .argv()
                    .into_iter()
                    .map(CString::new)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PreparedStage {
                    program: CString::new(stage.name.as_str())?,
                    argv,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let redirect_from = plan
            .redirect_from
            .values()
            .map(PreparedRedirect::new)
            .collect::<Result<Vec<_>, _>>()?;
        let redirect_to = plan
            .redirect_to
            .values()
            .map(PreparedRedirect::new)
            .collect::<Result<Vec<_>, _>>()?;
        let envp = env
            .exported_pairs()
            .into_iter()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            stages,
            redirect_from,
            redirect_to,
            envp,
        })
    }
}

/// Forks one process per stage and wires them together.
pub struct ProcessLauncher<'a> {
    env: &'a Environment,
}

impl<'a> ProcessLauncher<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }

    /// Spawn every stage of `plan`, registering each child with `jobs`.
    ///
    /// On a pipe or fork failure spawning stops; children already forked stay
    /// registered so the caller can still reap them.
    pub fn spawn(&self, plan: &PipelinePlan, jobs: &mut JobController) -> Result<(), ExecError> {
        let prepared = Prepared::new(plan, self.env)?;
        let count = prepared.stages.len();

        // Read end of the pipe feeding the next stage.
        let mut prev_read: Option<OwnedFd> = None;

        for index in 0..count {
            let pipe = if plan.is_last(index) {
                None
            } else {
                Some(unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::sys("pipe"))?)
            };
            let leader = jobs.leader();

            // SAFETY: the child only rewires descriptors, calls setpgid and
            // sigaction, then execs or _exits. It never returns from here.
            match unsafe { unistd::fork() }.map_err(ExecError::sys("fork"))? {
                ForkResult::Child => {
                    let child = StageChild {
                        index,
                        leader,
                        stdin: prev_read.take(),
                        pipe,
                        prepared: &prepared,
                    };
                    child.exec()
                }
                ForkResult::Parent { child } => {
                    let program = &prepared.stages[index].program;
                    debug!(index, pid = %child, ?program, "spawned stage");
                    jobs.adopt(child);
                    // The child owns its copy of the write end now; ours closes here,
                    // as does the read end the child just inherited.
                    prev_read = pipe.map(|(read, _write)| read);
                }
            }
        }
        Ok(())
    }
}

/// The forked side of one stage.
struct StageChild<'p> {
    index: usize,
    leader: Option<Pid>,
    stdin: Option<OwnedFd>,
    pipe: Option<(OwnedFd, OwnedFd)>,
    prepared: &'p Prepared,
}

impl StageChild<'_> {
    fn exec(self) -> ! {
        let _ = JobController::join_from_child(self.leader);
        interrupt::restore_defaults();

        let first = self.index == 0;
        let last = self.pipe.is_none();

        // Pipe ends are moved onto 0 and 1 and released before any file is
        // opened, so `N<file` or `N>file` on a pipe end's number binds only N.
        if let Some(read) = self.stdin {
            attach(read, libc::STDIN_FILENO, "stdin");
        }
        if let Some((read, write)) = self.pipe {
            drop(read);
            attach(write, libc::STDOUT_FILENO, "stdout");
        }

        if first {
            for redirect in &self.prepared.redirect_from {
                if let Err(errno) = redirect.bind() {
                    die(&format!("open redirection input file failed: {}", errno));
                }
            }
        }
        if last {
            for redirect in &self.prepared.redirect_to {
                if let Err(errno) = redirect.bind() {
                    die(&format!("open redirection output file failed: {}", errno));
                }
            }
        }

        let stage = &self.prepared.stages[self.index];
        let errno = match unistd::execvpe(&stage.program, &stage.argv, &self.prepared.envp) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };
        die(&format!("exec {}th subcommand failed: {}", self.index, errno))
    }
}

/// Duplicate a pipe end onto `target` and close the original.
fn attach(end: OwnedFd, target: RawFd, name: &str) {
    if let Err(errno) = unistd::dup2(end.as_raw_fd(), target) {
        die(&format!("cannot attach pipe to {}: {}", name, errno));
    }
    drop(end);
}

/// Report on stderr and leave the child with the reserved status.
fn die(msg: &str) -> ! {
    let line = format!("{}\n", msg);
    // SAFETY: plain write(2) and _exit(2): no stdio locks, no destructors,
    // no atexit handlers inherited from the shell.
    unsafe {
        libc::write(libc::STDERR_FILENO, line.as_ptr().cast(), line.len());
        libc::_exit(EXEC_FAILED)
    }
}
