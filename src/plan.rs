use std::collections::BTreeMap;
use std::os::unix::io::RawFd;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: String,
    pub args: Vec<String>,
}

impl Stage {
    /// Full argument vector as handed to exec: the program name followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Read,
    Truncate,
    Append,
}

impl RedirectMode {
    pub fn default_fd(self) -> RawFd {
        match self {
            RedirectMode::Read => 0,
            RedirectMode::Truncate | RedirectMode::Append => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSpec {
    pub fd: RawFd,
    pub target: String,
    pub mode: RedirectMode,
}

/// One parsed command line, ready to spawn.
///
/// `redirect_from` only ever applies to the first stage and `redirect_to`
/// only to the last one. Both are keyed by descriptor, so a later directive
/// for the same descriptor replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelinePlan {
    pub stages: Vec<Stage>,
    pub redirect_from: BTreeMap<RawFd, RedirectSpec>,
    pub redirect_to: BTreeMap<RawFd, RedirectSpec>,
}

impl PipelinePlan {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_starts_with_name() {
        let stage = Stage {
            name: "tr".to_string(),
            args: vec!["l".to_string(), "L".to_string()],
        };
        assert_eq!(stage.argv(), vec!["tr", "l", "L"]);
    }

    #[test]
    fn test_default_descriptors() {
        assert_eq!(RedirectMode::Read.default_fd(), 0);
        assert_eq!(RedirectMode::Truncate.default_fd(), 1);
        assert_eq!(RedirectMode::Append.default_fd(), 1);
    }

    #[test]
    fn test_is_last() {
        let stage = Stage {
            name: "cat".to_string(),
            args: vec![],
        };
        let plan = PipelinePlan {
            stages: vec![stage.clone(), stage],
            ..Default::default()
        };
        assert!(!plan.is_last(0));
        assert!(plan.is_last(1));
    }
}
