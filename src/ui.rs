#![allow(dead_code)]

use colored::{ColoredString, Colorize};

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

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Device output
// ============================================================================

/// Print a multi-line block indented under a device line
pub fn block(text: &str) {
    for line in text.lines() {
        println!("    {line}");
    }
}

/// Print diff text with removed lines red and added lines green
pub fn diff(text: &str) {
    for line in text.lines() {
        println!("    {}", paint_diff_line(line));
    }
}

fn paint_diff_line(line: &str) -> ColoredString {
    if line.starts_with("- ") {
        line.red()
    } else if line.starts_with("+ ") {
        line.green()
    } else {
        line.bold()
    }
}

/// Print a per-device result line
pub fn device_result(name: &str, ok: bool, msg: &str) {
    if ok {
        println!("{} {} {}", "✓".green(), name.bold(), msg);
    } else {
        println!("{} {} {}", "✗".red(), name.bold(), msg);
    }
}

// ============================================================================
// Tests
// ============================================================================
