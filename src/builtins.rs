use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::repl::ShellState;

/// What the read loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue(i32),
    Exit(i32),
}

pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    fn run(&self, args: &[String], state: &mut ShellState) -> Flow;
}

pub struct BuiltinManager {
    commands: HashMap<&'static str, Box<dyn BuiltinCommand>>,
}

impl BuiltinManager {
    pub fn new() -> Self {
        let mut mgr = BuiltinManager {
            commands: HashMap::new(),
        };
        mgr.register(Box::new(CdCommand));
        mgr.register(Box::new(PwdCommand));
        mgr.register(Box::new(ExportCommand));
        mgr.register(Box::new(HistoryCommand));
        mgr.register(Box::new(ExitCommand));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn BuiltinCommand>) {
        self.commands.insert(cmd.name(), cmd);
    }

    /// Run `tokens` as a built-in if the first one names one.
    pub fn dispatch(&self, tokens: &[String], state: &mut ShellState) -> Option<Flow> {
        let (name, args) = tokens.split_first()?;
        let cmd = self.commands.get(name.as_str())?;
        debug!(builtin = cmd.name(), "running builtin");
        Some(cmd.run(args, state))
    }
}

impl Default for BuiltinManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CdCommand;

impl BuiltinCommand for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }
    fn run(&self, args: &[String], state: &mut ShellState) -> Flow {
        let home = state.env.home();
        let target = match (args.first(), home) {
            (None, Some(home)) => home,
            (None, None) => {
                eprintln!("cd failed: HOME not set");
                return Flow::Continue(1);
            }
            (Some(arg), Some(home)) if arg.starts_with('~') => {
                PathBuf::from(format!("{}{}", home.display(), &arg[1..]))
            }
            (Some(arg), _) => PathBuf::from(arg),
        };
        match std::env::set_current_dir(&target) {
            Ok(()) => Flow::Continue(0),
            Err(e) => {
                eprintln!("cd failed: {}", e);
                Flow::Continue(1)
            }
        }
    }
}

pub struct PwdCommand;

impl BuiltinCommand for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }
    fn run(&self, _args: &[String], _state: &mut ShellState) -> Flow {
        match std::env::current_dir() {
            Ok(dir) => {
                println!("{}", dir.display());
                Flow::Continue(0)
            }
            Err(_) => {
                println!("cwd failed");
                Flow::Continue(1)
            }
        }
    }
}

pub struct ExportCommand;

impl BuiltinCommand for ExportCommand {
    fn name(&self) -> &'static str {
        "export"
    }
    fn run(&self, args: &[String], state: &mut ShellState) -> Flow {
        let mut status = 0;
        for arg in args {
            match arg.split_once('=') {
                Some((key, _)) if key.is_empty() => {
                    println!("export failed");
                    status = 1;
                }
                Some((key, value)) => state.env.set_exported(key, value),
                None => state.env.export(arg),
            }
        }
        Flow::Continue(status)
    }
}

pub struct HistoryCommand;

impl BuiltinCommand for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }
    fn run(&self, args: &[String], state: &mut ShellState) -> Flow {
        let count = match args.first() {
            None => state.history.len(),
            // Anything that is not a count shows nothing.
            Some(n) => n.parse::<usize>().unwrap_or(0),
        };
        for (event, line) in state.history.tail(count) {
            println!("{:5}  {}", event, line);
        }
        Flow::Continue(0)
    }
}

pub struct ExitCommand;

impl BuiltinCommand for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }
    fn run(&self, args: &[String], _state: &mut ShellState) -> Flow {
        match args.first() {
            None => Flow::Exit(0),
            Some(code) => match code.parse::<i32>() {
                Ok(code) => Flow::Exit(code),
                Err(_) => {
                    println!("Invalid exit code");
                    Flow::Continue(1)
                }
            },
        }
    }
}
