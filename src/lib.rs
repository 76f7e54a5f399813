pub mod builtins;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod history;
pub mod interrupt;
pub mod io;
pub mod lexer;
pub mod parser;
pub mod plan;
pub mod prompt;
pub mod repl;
