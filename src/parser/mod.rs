pub mod redirect;

use thiserror::Error;
use tracing::debug;

use crate::plan::{PipelinePlan, RedirectMode, RedirectSpec, Stage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("parsing redirection failed: {0}")]
    Redirection(String),
    #[error("parsing redirection failed: missing target after '{0}'")]
    MissingTarget(String),
    #[error("empty command in pipeline stage {0}")]
    EmptyStage(usize),
}

impl ParseError {
    /// Non-fatal errors only drop the offending token.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::EmptyStage(_))
    }
}

/// A plan together with the non-fatal diagnostics collected while building it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parsed {
    pub plan: PipelinePlan,
    pub diagnostics: Vec<ParseError>,
}

pub fn parse(tokens: &[String]) -> Result<Parsed, ParseError> {
    PipelineParser::new(tokens).parse()
}

pub struct PipelineParser<'a> {
    tokens: &'a [String],
    pos: usize,
    first_stage: bool,
    current: Vec<String>,
    plan: PipelinePlan,
    diagnostics: Vec<ParseError>,
}

impl<'a> PipelineParser<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens,
            pos: 0,
            first_stage: true,
            current: Vec::new(),
            plan: PipelinePlan::default(),
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&'a String> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a String> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub fn parse(mut self) -> Result<Parsed, ParseError> {
        if self.tokens.is_empty() {
            return Ok(Parsed::default());
        }

        while let Some(tok) = self.next() {
            if tok == "|" {
                self.close_stage()?;
                self.first_stage = false;
                // Output redirections only survive on the last stage.
                self.plan.redirect_to.clear();
            } else if redirect::is_candidate(tok) {
                self.directive(tok);
            } else {
                self.current.push(tok.clone());
            }
        }
        self.close_stage()?;

        Ok(Parsed {
            plan: self.plan,
            diagnostics: self.diagnostics,
        })
    }

    fn close_stage(&mut self) -> Result<(), ParseError> {
        let mut words = std::mem::take(&mut self.current).into_iter();
        let Some(name) = words.next() else {
            return Err(ParseError::EmptyStage(self.plan.stages.len()));
        };
        self.plan.stages.push(Stage {
            name,
            args: words.collect(),
        });
        Ok(())
    }

    fn directive(&mut self, tok: &'a str) {
        let directive = match redirect::parse_directive(tok) {
            Ok(d) => d,
            Err(e) => {
                self.diagnostics.push(e);
                return;
            }
        };

        let target = match directive.target {
            Some(t) => t.to_string(),
            None => match self.peek() {
                Some(next) if next != "|" => {
                    self.pos += 1;
                    next.clone()
                }
                _ => {
                    self.diagnostics.push(ParseError::MissingTarget(tok.to_string()));
                    return;
                }
            },
        };

        let spec = RedirectSpec {
            fd: directive.fd(),
            target,
            mode: directive.mode,
        };
        match spec.mode {
            RedirectMode::Read if !self.first_stage => {
                debug!(
                    fd = spec.fd,
                    target = %spec.target,
                    "input redirection outside the first stage ignored"
                );
            }
            RedirectMode::Read => {
                self.plan.redirect_from.insert(spec.fd, spec);
            }
            RedirectMode::Truncate | RedirectMode::Append => {
                self.plan.redirect_to.insert(spec.fd, spec);
            }
        }
    }
}
