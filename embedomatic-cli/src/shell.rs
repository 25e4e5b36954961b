//! Interactive session loop.
//!
//! Each line is one user action and runs to completion before the next
//! prompt. Failures are printed and the loop continues.

use std::path::{Path, PathBuf};

use embedomatic_rag::RagSession;
use embedomatic_rag::session::{RESULT_COUNT_RANGE, clamp_result_count};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::app::upload;
use crate::render::{self, Action};

const PROMPT: &str = "embedomatic> ";

const HELP: &str = "\
Commands:
  :load <FILE>   split, embed and store a document (.docx, .txt, .md)
  :k <N>         number of chunks to retrieve (1-5)
  :help          show this message
  :quit          leave the shell
Any other line is sent as a query against the loaded document.";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Load(PathBuf),
    SetK(usize),
    Help,
    Quit,
    Query(String),
    Empty,
    Invalid(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Self::Query(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match (name, arg) {
            ("load", "") => Self::Invalid("usage: :load <FILE>".into()),
            ("load", path) => Self::Load(PathBuf::from(path)),
            ("k", n) => match n.parse() {
                Ok(k) if RESULT_COUNT_RANGE.contains(&k) => Self::SetK(k),
                _ => Self::Invalid("usage: :k <N> with N from 1 to 5".into()),
            },
            ("help" | "h" | "?", _) => Self::Help,
            ("quit" | "q" | "exit", _) => Self::Quit,
            (other, _) => Self::Invalid(format!("unknown command ':{other}', try :help")),
        }
    }
}

/// State of one interactive session.
pub struct Shell {
    session: RagSession,
    k: usize,
}

impl Shell {
    pub fn new(session: RagSession, k: usize) -> Self {
        Self { session, k: clamp_result_count(k) }
    }

    pub fn session(&self) -> &RagSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut RagSession {
        &mut self.session
    }

    /// Run one command and return the text to print, or `None` to quit.
    pub async fn execute(&mut self, command: ShellCommand) -> Option<String> {
        let output = match command {
            ShellCommand::Empty => String::new(),
            ShellCommand::Quit => return None,
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Invalid(message) => message,
            ShellCommand::SetK(k) => {
                self.k = k;
                format!("Retrieving {k} chunks per query")
            }
            ShellCommand::Load(path) => self.load(&path).await,
            ShellCommand::Query(query) => match self.session.ask(&query, self.k).await {
                Ok(outcome) => render::outcome(&outcome),
                Err(e) => render::error(Action::Search, &e),
            },
        };
        Some(output)
    }

    pub async fn load(&mut self, path: &Path) -> String {
        match upload(&mut self.session, path).await {
            Ok(handle) => render::ingested(&path.display().to_string(), handle),
            Err(e) => render::error(Action::Ingest, &e),
        }
    }

    /// Read lines until `:quit`, Ctrl-C or Ctrl-D.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut editor = DefaultEditor::new()?;
        println!("{HELP}");

        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    match self.execute(ShellCommand::parse(&line)).await {
                        Some(output) if output.is_empty() => {}
                        Some(output) => println!("{output}"),
                        None => break,
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_parsed_into_commands() {
        assert_eq!(ShellCommand::parse("  "), ShellCommand::Empty);
        assert_eq!(ShellCommand::parse("What is X?"), ShellCommand::Query("What is X?".into()));
        assert_eq!(
            ShellCommand::parse(":load  my report.docx "),
            ShellCommand::Load(PathBuf::from("my report.docx"))
        );
        assert_eq!(ShellCommand::parse(":k 4"), ShellCommand::SetK(4));
        assert_eq!(ShellCommand::parse(":help"), ShellCommand::Help);
        assert_eq!(ShellCommand::parse(":q"), ShellCommand::Quit);
    }

    #[test]
    fn bad_commands_are_reported_not_fatal() {
        assert!(matches!(ShellCommand::parse(":k 9"), ShellCommand::Invalid(_)));
        assert!(matches!(ShellCommand::parse(":k two"), ShellCommand::Invalid(_)));
        assert!(matches!(ShellCommand::parse(":load"), ShellCommand::Invalid(_)));
        assert!(matches!(ShellCommand::parse(":reset"), ShellCommand::Invalid(_)));
    }
}
