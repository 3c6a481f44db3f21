//! Output formatting utilities for the CLI.

pub mod progress;
pub mod table;

use console::style;
use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Section banner used at the top of human-readable output.
pub fn banner(title: &str) -> String {
    let rule = "=".repeat(70);
    format!("{rule}\n {}\n{rule}", style(title).bold())
}

pub fn success_mark() -> String {
    style("✓").green().to_string()
}

pub fn failure_mark() -> String {
    style("✗").red().to_string()
}

/// Human-readable byte size, e.g. `1.50 MB (1,572,864 bytes)`.
pub fn format_size(bytes: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let mb = bytes as f64 / (1024.0 * 1024.0);
    format!("{mb:.2} MB ({} bytes)", group_thousands(bytes))
}

pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
