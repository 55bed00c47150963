// src/gate/prompt.rs

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// What the operator answered, before it becomes a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Yes,
    /// `n`, `no`, `q`, `quit`: stop the whole run.
    Abort,
    /// Anything else, including an empty line.
    Default,
}

/// Map a raw response line: `y`/`yes` → `Yes`, `n`/`no`/`q`/`quit` →
/// `Abort`, everything else → `Default`. Case-insensitive.
pub fn map_response(line: &str) -> PromptAnswer {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => PromptAnswer::Yes,
        "n" | "no" | "q" | "quit" => PromptAnswer::Abort,
        _ => PromptAnswer::Default,
    }
}

/// Synchronous operator interaction.
pub trait Prompter {
    /// Show `question` and return the raw answer line.
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Prompts on stderr and reads one line from stdin. EOF reads as empty.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> Result<String> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{question} [y/N/q] ").context("writing prompt")?;
        stderr.flush().context("flushing prompt")?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading prompt answer from stdin")?;
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_map_to_answers() {
        assert_eq!(map_response("y\n"), PromptAnswer::Yes);
        assert_eq!(map_response(" YES "), PromptAnswer::Yes);
        assert_eq!(map_response("n"), PromptAnswer::Abort);
        assert_eq!(map_response("Quit"), PromptAnswer::Abort);
        assert_eq!(map_response("q"), PromptAnswer::Abort);
        assert_eq!(map_response(""), PromptAnswer::Default);
        assert_eq!(map_response("maybe"), PromptAnswer::Default);
    }
}
