//! Interactive prompting behind a small trait.
//!
//! Commands never talk to the terminal directly; they ask a [`Prompter`].
//! The binary uses [`TerminalPrompter`], tests drive flows with
//! [`ScriptedPrompter`].

use std::collections::VecDeque;
use std::io::{BufRead, IsTerminal, Write};

use crate::error::FuncError;

pub trait Prompter {
    /// Whether a human can answer prompts right now.
    fn is_interactive(&self) -> bool;

    /// Free-text input. An empty answer yields `default`.
    fn input(&mut self, message: &str, default: &str) -> Result<String, FuncError>;

    /// Pick one of `options`, returning its index.
    fn select(&mut self, message: &str, options: &[String], default: usize)
    -> Result<usize, FuncError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, FuncError>;

    /// Informational line shown to the user (warnings, rejected input).
    fn notice(&mut self, message: &str);
}

/// Ask until `validate` accepts the answer. Cancellation ends the loop.
pub fn ask_validated(
    prompter: &mut dyn Prompter,
    message: &str,
    default: &str,
    validate: impl Fn(&str) -> Result<(), FuncError>,
) -> Result<String, FuncError> {
    loop {
        let answer = prompter.input(message, default)?;
        match validate(&answer) {
            Ok(()) => return Ok(answer),
            Err(e) => {
                tracing::debug!(event = "core.prompt.answer_rejected", prompt = message, error = %e);
                prompter.notice(&e.to_string());
            }
        }
    }
}

/// Prompts on stderr, answers from stdin.
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal() && std::io::stderr().is_terminal(),
        }
    }

    fn read_line(&self) -> Result<String, FuncError> {
        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|_| FuncError::Cancelled)?;
        if read == 0 {
            return Err(FuncError::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn ask(&self, text: &str) -> Result<String, FuncError> {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "{text}");
        let _ = err.flush();
        drop(err);
        self.read_line()
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn input(&mut self, message: &str, default: &str) -> Result<String, FuncError> {
        let text = if default.is_empty() {
            format!("? {message} ")
        } else {
            format!("? {message} ({default}) ")
        };
        let answer = self.ask(&text)?;
        Ok(if answer.trim().is_empty() {
            default.to_string()
        } else {
            answer.trim().to_string()
        })
    }

    fn select(
        &mut self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> Result<usize, FuncError> {
        eprintln!("? {message}");
        for (i, option) in options.iter().enumerate() {
            let marker = if i == default { '>' } else { ' ' };
            eprintln!("{marker} {}) {option}", i + 1);
        }
        loop {
            let answer = self.ask(&format!("  Choice [{}]: ", default + 1))?;
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(default);
            }
            if let Ok(n) = answer.parse::<usize>()
                && (1..=options.len()).contains(&n)
            {
                return Ok(n - 1);
            }
            if let Some(i) = options.iter().position(|o| o == answer) {
                return Ok(i);
            }
            eprintln!("  Please enter a number between 1 and {}", options.len());
        }
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, FuncError> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.ask(&format!("? {message} ({hint}) "))?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => eprintln!("  Please answer y or n"),
            }
        }
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Answers prompts from a fixed script.
///
/// Each prompt consumes one answer. An empty answer takes the default; a
/// `select` answer must be the exact text of an option. Running out of
/// answers behaves like the user pressing Ctrl-D.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    interactive: bool,
    /// Every prompt message asked, in order.
    pub asked: Vec<String>,
    /// Every notice shown, in order.
    pub notices: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            interactive: true,
            asked: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// A prompter that reports no terminal. Any prompt is a bug in the caller
    /// and is answered with `Cancelled`.
    pub fn non_interactive() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, message: &str) -> Result<String, FuncError> {
        self.asked.push(message.to_string());
        self.answers.pop_front().ok_or(FuncError::Cancelled)
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn input(&mut self, message: &str, default: &str) -> Result<String, FuncError> {
        let answer = self.next(message)?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    fn select(
        &mut self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> Result<usize, FuncError> {
        let answer = self.next(message)?;
        if answer.is_empty() {
            return Ok(default);
        }
        options
            .iter()
            .position(|o| *o == answer)
            .ok_or_else(|| FuncError::validation("option", &answer, "not one of the offered options"))
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, FuncError> {
        let answer = self.next(message)?;
        Ok(match answer.as_str() {
            "" => default,
            other => matches!(other, "y" | "yes" | "true"),
        })
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::Field;

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_answer_takes_default() {
        let mut p = ScriptedPrompter::new([""]);
        assert_eq!(p.input("Registry:", "quay.io/a").unwrap(), "quay.io/a");
    }

    #[test]
    fn select_by_text_or_default() {
        let opts = options(&["pack", "s2i"]);
        let mut p = ScriptedPrompter::new(["s2i", ""]);
        assert_eq!(p.select("Builder:", &opts, 0).unwrap(), 1);
        assert_eq!(p.select("Builder:", &opts, 0).unwrap(), 0);
    }

    #[test]
    fn select_unknown_option_is_an_error() {
        let mut p = ScriptedPrompter::new(["docker"]);
        assert!(p.select("Builder:", &options(&["pack"]), 0).is_err());
    }

    #[test]
    fn exhausted_script_cancels() {
        let mut p = ScriptedPrompter::new(Vec::<String>::new());
        assert!(matches!(p.input("Name:", "").unwrap_err(), FuncError::Cancelled));
    }

    #[test]
    fn ask_validated_reprompts_until_valid() {
        let mut p = ScriptedPrompter::new(["1BAD", "bad name", "GOOD"]);
        let answer =
            ask_validated(&mut p, "Name:", "", |v| Field::EnvVarName.validate(v)).unwrap();
        assert_eq!(answer, "GOOD");
        assert_eq!(p.asked.len(), 3);
        assert_eq!(p.notices.len(), 2);
    }

    #[test]
    fn ask_validated_stops_on_cancel() {
        let mut p = ScriptedPrompter::new(["1BAD"]);
        let err = ask_validated(&mut p, "Name:", "", |v| Field::EnvVarName.validate(v)).unwrap_err();
        assert!(matches!(err, FuncError::Cancelled));
    }

    #[test]
    fn non_interactive_reports_no_terminal() {
        assert!(!ScriptedPrompter::non_interactive().is_interactive());
        assert!(ScriptedPrompter::new([""]).is_interactive());
    }
}
