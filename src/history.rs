use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("{0}: event not found")]
    EventNotFound(String),
}

/// In-memory command history. Nothing is ever written to disk.
pub struct HistoryManager {
    entries: Vec<String>,
    max_len: usize,
    mode: HistoryMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    AllowDuplicates,
    DisallowDuplicates,
}

impl HistoryManager {
    pub fn new(max_len: usize, mode: HistoryMode) -> Self {
        Self {
            entries: Vec::new(),
            max_len,
            mode,
        }
    }

    // Add a command to history
    pub fn add(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() || self.max_len == 0 {
            return;
        }
        if self.mode == HistoryMode::DisallowDuplicates
            && self.entries.last().is_some_and(|last| last == trimmed)
        {
            return;
        }
        self.entries.push(trimmed.to_string());
        // Remove oldest entries if exceeding the limit
        if self.entries.len() > self.max_len {
            let excess = self.entries.len() - self.max_len;
            self.entries.drain(..excess);
        }
    }

    /// Entry by 1-based event number, as printed by `history`.
    pub fn get(&self, event: usize) -> Option<&str> {
        event
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// The last `n` entries with their 1-based event numbers.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = (usize, &str)> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..]
            .iter()
            .enumerate()
            .map(move |(i, line)| (start + i + 1, line.as_str()))
    }

    /// Replace `!!` with the previous line and `!N` with event N.
    ///
    /// A `!` that is not followed by `!` or a digit is kept as is.
    pub fn expand(&self, line: &str) -> Result<String, HistoryError> {
        if line.len() <= 1 || !line.contains('!') {
            return Ok(line.to_string());
        }

        let mut out = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '!' {
                out.push(ch);
                continue;
            }
            match chars.peek() {
                Some('!') => {
                    chars.next();
                    let prev = self
                        .last()
                        .ok_or_else(|| HistoryError::EventNotFound("!!".to_string()))?;
                    out.push_str(prev);
                }
                Some(c) if c.is_ascii_digit() => {
                    let mut digits = String::new();
                    while let Some(&d) = chars.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        digits.push(d);
                        chars.next();
                    }
                    let event = format!("!{}", digits);
                    let entry = digits
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| self.get(n))
                        .ok_or(HistoryError::EventNotFound(event))?;
                    out.push_str(entry);
                }
                _ => out.push('!'),
            }
        }
        Ok(out)
    }
}
