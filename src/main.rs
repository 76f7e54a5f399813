use std::io::{self, IsTerminal};
use std::path::PathBuf;

use argh::FromArgs;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use jobsh::builtins::Flow;
use jobsh::config::ConfigLoader;
use jobsh::environment::Environment;
use jobsh::error::ShellError;
use jobsh::executor::DefaultExecutor;
use jobsh::io::input::InputHandler;
use jobsh::repl::Repl;

#[derive(FromArgs)]
/// Interactive command interpreter with pipelines and terminal job control.
struct Args {
    /// evaluate one command line and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// configuration file (default: $HOME/.jobshrc when present)
    #[argh(option)]
    config: Option<PathBuf>,

    /// never hand the terminal to spawned pipelines
    #[argh(switch)]
    no_job_control: bool,
}

fn main() {
    let args: Args = argh::from_env();
    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("jobsh: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> Result<i32, ShellError> {
    let mut env = Environment::new();
    let config = ConfigLoader::discover(args.config.as_deref(), env.home().as_deref())?;
    init_tracing(&config.log);

    for (key, value) in &config.env_vars {
        env.set_exported(key, value);
    }

    let job_control = !args.no_job_control && config.job_control.resolve(io::stdin().is_terminal());
    debug!(job_control, "starting shell");

    let mut repl = Repl::new(&config, env, DefaultExecutor::new(job_control));
    match args.command {
        Some(line) => match repl.eval_line(&line)? {
            Flow::Continue(code) | Flow::Exit(code) => Ok(code),
        },
        None => repl.run(&mut InputHandler::new()),
    }
}

/// `JOBSH_LOG` overrides the `log` config key.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env("JOBSH_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
