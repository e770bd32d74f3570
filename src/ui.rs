use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a dim/muted message to stderr
pub fn dim_err(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Render a line diff, `-` for removed and `+` for added lines.
///
/// Returns `None` when both texts are equal.
pub fn line_diff(old: &str, new: &str) -> Option<String> {
    let diff = similar::TextDiff::from_lines(old, new);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let text = change.value().trim_end_matches('\n');
        let line = match change.tag() {
            similar::ChangeTag::Delete => format!("- {text}").red(),
            similar::ChangeTag::Insert => format!("+ {text}").green(),
            similar::ChangeTag::Equal => continue,
        };
        out.push_str(&line.to_string());
        out.push('\n');
    }
    if out.is_empty() { None } else { Some(out) }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_diff_equal() {
        assert!(line_diff("a\nb\n", "a\nb\n").is_none());
    }

    #[test]
    fn test_line_diff_changes() {
        colored::control::set_override(false);
        let diff = line_diff("<host>a</host>\n<x/>\n", "<host>b</host>\n<x/>\n").unwrap();
        assert_eq!(diff, "- <host>a</host>\n+ <host>b</host>\n");
    }
}
