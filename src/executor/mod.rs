mod default_executor;
mod executor;
pub mod job;
pub mod launcher;
pub mod reaper;


pub use default_executor::DefaultExecutor;
pub use executor::{ExecStatus, Executor};
pub use job::{JobController, ProcessGroup};
pub use launcher::ProcessLauncher;
pub use reaper::{EXEC_FAILED, PipelineStatus, ReaperWaiter, StageExit};
