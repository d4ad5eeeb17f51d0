//! Physical-to-logical line assembly.
//!
//! Manifests are line oriented: blank lines are skipped, `#` lines are
//! comments, a trailing backslash joins the next physical line, and an
//! unquoted ` #` starts an inline comment.

/// One logical line with the 1-based number of its first physical line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    pub text: String,
    pub line: usize,
}

/// Split file content into non-blank, comment-stripped logical lines.
pub fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    let mut pending_start = 0;

    // str::lines handles both \n and \r\n endings
    for (index, physical) in content.lines().enumerate() {
        let (fragment, continues) = match physical.strip_suffix('\\') {
            Some(rest) => (rest, true),
            None => (physical, false),
        };

        if pending.is_empty() {
            pending_start = index + 1;
        }
        pending.push_str(fragment);

        if continues {
            continue;
        }

        flush(&mut lines, &mut pending, pending_start);
    }

    // A continuation backslash on the final line: the logical line ends
    flush(&mut lines, &mut pending, pending_start);

    lines
}

fn flush(lines: &mut Vec<LogicalLine>, pending: &mut String, start: usize) {
    let text = strip_comment(pending).trim().to_string();
    pending.clear();
    if !text.is_empty() {
        lines.push(LogicalLine { text, line: start });
    }
}

/// Remove a comment: the whole line if it starts with `#`, otherwise
/// everything from an unquoted `#` that follows whitespace. A `#` inside
/// a quoted string is content.
fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return "";
    }

    let mut quote: Option<char> = None;
    let mut prev_is_space = false;
    for (pos, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '#') if prev_is_space => return &line[..pos],
            (None, _) => {}
        }
        prev_is_space = c.is_whitespace();
    }
    line
}
