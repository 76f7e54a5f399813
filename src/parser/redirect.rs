use std::os::unix::io::RawFd;

use super::ParseError;
use crate::plan::RedirectMode;

const OPERATOR_CHARS: [char; 2] = ['<', '>'];

/// A redirection token split into its parts, before scoping rules apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    pub fd: Option<RawFd>,
    pub mode: RedirectMode,
    /// `None` when the token ends with the operator and the target is the next token.
    pub target: Option<&'a str>,
}

impl Directive<'_> {
    pub fn fd(&self) -> RawFd {
        self.fd.unwrap_or_else(|| self.mode.default_fd())
    }
}

/// Any token carrying `<` or `>` is treated as a redirection; it either parses or is an error.
pub fn is_candidate(token: &str) -> bool {
    token.contains(OPERATOR_CHARS)
}

/// Parse `[digits]<[target]`, `[digits]>[target]` or `[digits]>>[target]`.
pub fn parse_directive(token: &str) -> Result<Directive<'_>, ParseError> {
    let malformed = || ParseError::Redirection(token.to_string());

    let op_at = token.find(OPERATOR_CHARS).ok_or_else(malformed)?;
    let (prefix, rest) = token.split_at(op_at);

    let fd = if prefix.is_empty() {
        None
    } else if prefix.bytes().all(|b| b.is_ascii_digit()) {
        Some(prefix.parse::<RawFd>().map_err(|_| malformed())?)
    } else {
        return Err(malformed());
    };

    let (mode, target) = if let Some(t) = rest.strip_prefix(">>") {
        (RedirectMode::Append, t)
    } else if let Some(t) = rest.strip_prefix('>') {
        (RedirectMode::Truncate, t)
    } else if let Some(t) = rest.strip_prefix('<') {
        (RedirectMode::Read, t)
    } else {
        return Err(malformed());
    };

    // `<<x`, `>>>x`, `<>x`, `>x<y` and friends.
    if target.contains(OPERATOR_CHARS) {
        return Err(malformed());
    }

    Ok(Directive {
        fd,
        mode,
        target: (!target.is_empty()).then_some(target),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attached_targets() {
        let d = parse_directive("<in.txt").unwrap();
        assert_eq!((d.fd(), d.mode, d.target), (0, RedirectMode::Read, Some("in.txt")));

        let d = parse_directive(">out.txt").unwrap();
        assert_eq!((d.fd(), d.mode, d.target), (1, RedirectMode::Truncate, Some("out.txt")));

        let d = parse_directive(">>log").unwrap();
        assert_eq!((d.fd(), d.mode, d.target), (1, RedirectMode::Append, Some("log")));
    }

    #[test]
    fn test_explicit_descriptor() {
        let d = parse_directive("2>errfile").unwrap();
        assert_eq!(d.fd, Some(2));
        assert_eq!(d.mode, RedirectMode::Truncate);
        assert_eq!(d.target, Some("errfile"));

        let d = parse_directive("10<").unwrap();
        assert_eq!(d.fd(), 10);
        assert_eq!(d.target, None);
    }

    #[test]
    fn test_detached_operator() {
        let d = parse_directive(">>").unwrap();
        assert_eq!(d.mode, RedirectMode::Append);
        assert_eq!(d.target, None);
    }

    #[test]
    fn test_bad_prefix() {
        assert_eq!(
            parse_directive("@>badtoken"),
            Err(ParseError::Redirection("@>badtoken".to_string()))
        );
        assert!(parse_directive("a2>x").is_err());
        assert!(parse_directive("-1>x").is_err());
    }

    #[test]
    fn test_doubled_operators() {
        assert!(parse_directive("<<x").is_err());
        assert!(parse_directive(">>>x").is_err());
        assert!(parse_directive("<>x").is_err());
        assert!(parse_directive(">a<b").is_err());
    }

    #[test]
    fn test_descriptor_overflow() {
        assert!(parse_directive("99999999999>x").is_err());
    }

    #[test]
    fn test_candidates() {
        assert!(is_candidate("2>"));
        assert!(is_candidate("a<b"));
        assert!(!is_candidate("echo"));
        assert!(!is_candidate("|"));
    }
}
