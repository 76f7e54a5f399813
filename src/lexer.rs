/// Trim the line and collapse every interior run of whitespace into a single space.
pub fn sanitize(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for word in line.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Split a sanitized line on single spaces.
///
/// There is no quoting or escaping: a token can never contain a space.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(' ')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
