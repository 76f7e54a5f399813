use std::ffi::NulError;
use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::config::ConfigError;

/// Failures seen by the shell process while running a pipeline.
///
/// Failures inside a forked stage never show up here; they only surface
/// through that stage's exit status.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{op} failed: {errno}")]
    Sys { op: &'static str, errno: Errno },
    #[error("argument contains a nul byte: {0}")]
    Nul(#[from] NulError),
    #[error("set oneself as foreground process group failed: {0}")]
    ForegroundReclaim(Errno),
}

impl ExecError {
    pub fn sys(op: &'static str) -> impl FnOnce(Errno) -> ExecError {
        move |errno| ExecError::Sys { op, errno }
    }

    /// Whether the shell can no longer trust its terminal and has to quit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecError::ForegroundReclaim(_))
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot set SIGINT handler: {0}")]
    Signal(Errno),
}

impl ShellError {
    /// Exit status the process should report when this error ends the shell.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::Exec(e) if e.is_fatal() => 255,
            _ => 1,
        }
    }
}
