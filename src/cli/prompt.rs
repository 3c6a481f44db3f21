//! Interactive confirmation for destructive commands.

use std::collections::VecDeque;
use std::io;

use console::Term;

/// Phrase that must be typed verbatim before a reset.
pub const RESET_PHRASE: &str = "DELETE ALL DATA";

/// Source of answers to yes/no style questions.
pub trait Prompter {
    /// Show `question` and return the line typed in reply, without the newline.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Prompts on the controlling terminal via stderr.
pub struct TermPrompter {
    term: Term,
}

impl TermPrompter {
    pub fn new() -> Self {
        Self { term: Term::stderr() }
    }
}

impl Default for TermPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TermPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.term.write_str(question)?;
        self.term.read_line()
    }
}

/// Replays canned answers; an exhausted script answers with an empty line.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Rollback proceeds only on `yes`, in any case.
pub fn confirm_rollback(prompter: &mut dyn Prompter) -> io::Result<bool> {
    let answer = prompter.ask("Are you sure? This will undo the migration. (yes/no): ")?;
    Ok(is_yes(&answer))
}

/// Reset needs the exact phrase, then `yes`.
pub fn confirm_reset(prompter: &mut dyn Prompter) -> io::Result<bool> {
    let phrase = prompter.ask(&format!("Type '{RESET_PHRASE}' to confirm: "))?;
    if phrase.trim_end_matches(['\r', '\n']) != RESET_PHRASE {
        return Ok(false);
    }
    let answer = prompter.ask("Are you absolutely sure? (yes/no): ")?;
    Ok(is_yes(&answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_rollback() {
        assert!(confirm_rollback(&mut ScriptedPrompter::new(["yes"])).unwrap());
        assert!(confirm_rollback(&mut ScriptedPrompter::new(["YES"])).unwrap());
        assert!(!confirm_rollback(&mut ScriptedPrompter::new(["y"])).unwrap());
        assert!(!confirm_rollback(&mut ScriptedPrompter::new(Vec::<String>::new())).unwrap());
    }

    #[test]
    fn test_confirm_reset_requires_phrase_then_yes() {
        assert!(confirm_reset(&mut ScriptedPrompter::new(["DELETE ALL DATA", "yes"])).unwrap());

        let mut wrong_phrase = ScriptedPrompter::new(["delete all data", "yes"]);
        assert!(!confirm_reset(&mut wrong_phrase).unwrap());
        assert_eq!(wrong_phrase.asked.len(), 1, "second question is not asked");

        assert!(!confirm_reset(&mut ScriptedPrompter::new(["DELETE ALL DATA", "no"])).unwrap());
    }
}
