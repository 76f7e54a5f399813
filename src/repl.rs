use tracing::debug;

use crate::builtins::{BuiltinManager, Flow};
use crate::config::Config;
use crate::environment::Environment;
use crate::error::ShellError;
use crate::executor::Executor;
use crate::history::HistoryManager;
use crate::interrupt;
use crate::io::input::{InputHandler, LineRead};
use crate::lexer;
use crate::parser;
use crate::prompt::ShellPrompt;

/// State the built-ins are allowed to change.
pub struct ShellState {
    pub env: Environment,
    pub history: HistoryManager,
}

pub struct Repl<E: Executor> {
    state: ShellState,
    builtins: BuiltinManager,
    executor: E,
    prompt: ShellPrompt,
}

impl<E: Executor> Repl<E> {
    pub fn new(config: &Config, env: Environment, executor: E) -> Self {
        Self {
            state: ShellState {
                env,
                history: HistoryManager::new(config.history_max, config.history_mode),
            },
            builtins: BuiltinManager::new(),
            executor,
            prompt: ShellPrompt::new(config.prompt.as_deref()),
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Read and evaluate lines until `exit` or end of input.
    pub fn run(&mut self, input: &mut InputHandler) -> Result<i32, ShellError> {
        interrupt::install().map_err(ShellError::Signal)?;

        loop {
            let line = match input.read_line(self.prompt.as_str())? {
                LineRead::Line(line) => line,
                // Back to a fresh prompt; the partial line is dropped.
                LineRead::Interrupted => continue,
                LineRead::Eof => {
                    println!();
                    return Ok(0);
                }
            };
            if let Flow::Exit(code) = self.eval_line(&line)? {
                return Ok(code);
            }
        }
    }

    /// Evaluate one raw input line.
    ///
    /// Only errors the shell cannot survive are returned; everything else is
    /// reported on stderr and turned into a status.
    pub fn eval_line(&mut self, raw: &str) -> Result<Flow, ShellError> {
        let line = lexer::sanitize(raw);
        let line = match self.state.history.expand(&line) {
            Ok(line) => line,
            Err(e) => {
                eprintln!("{}", e);
                return Ok(Flow::Continue(1));
            }
        };
        self.state.history.add(&line);

        let tokens = lexer::tokenize(&line);
        if tokens.is_empty() {
            return Ok(Flow::Continue(0));
        }
        if let Some(flow) = self.builtins.dispatch(&tokens, &mut self.state) {
            return Ok(flow);
        }

        let parsed = match parser::parse(&tokens) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("{}", e);
                return Ok(Flow::Continue(2));
            }
        };
        for diagnostic in &parsed.diagnostics {
            eprintln!("{}", diagnostic);
        }
        debug!(stages = parsed.plan.len(), "running pipeline");

        match self.executor.exec(&parsed.plan, &self.state.env) {
            Ok(status) => Ok(Flow::Continue(status.code())),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                eprintln!("{}", e);
                Ok(Flow::Continue(1))
            }
        }
    }
}
