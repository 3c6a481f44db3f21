//! Spinner utilities using indicatif for long-running database operations.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::{failure_mark, success_mark};

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Create a spinner drawn on stderr. Hidden when stderr is not a terminal.
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn create_spinner_with_message(message: impl Into<String>) -> ProgressBar {
    let spinner = create_spinner();
    spinner.set_message(message.into());
    spinner
}

/// A spinner that draws nothing, for JSON mode.
pub fn hidden_spinner() -> ProgressBar {
    ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
}

/// Terminal states for a migration spinner.
pub trait ProgressBarExt {
    fn finish_success(&self, message: impl Into<String>);
    fn finish_error(&self, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("{} {}", success_mark(), message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.abandon_with_message(format!("{} {}", failure_mark(), message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner_finishes() {
        let spinner = hidden_spinner();
        spinner.set_message("working");
        spinner.finish_success("done");
        assert!(spinner.is_finished());
        assert!(spinner.message().ends_with("done"));

        let failed = hidden_spinner();
        failed.finish_error("broke");
        assert!(failed.is_finished());
        assert!(failed.message().ends_with("broke"));
    }
}
