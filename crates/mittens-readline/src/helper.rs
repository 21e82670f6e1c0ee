use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// Slash commands understood by the REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    New,
    History,
    Quit,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::New, Command::History, Command::Quit];

    pub fn name(self) -> &'static str {
        match self {
            Command::New => "/new",
            Command::History => "/history",
            Command::Quit => "/quit",
        }
    }

    /// Parses a trimmed input line. Bare `quit` and `exit` also end the session.
    pub fn parse(line: &str) -> Option<Self> {
        match line {
            "quit" | "exit" => Some(Command::Quit),
            _ => Self::ALL.into_iter().find(|cmd| cmd.name() == line),
        }
    }
}

/// Completion, highlighting and hints for slash commands.
#[derive(Clone, Default)]
pub struct CliHelper;

impl CliHelper {
    fn matches(line: &str) -> impl Iterator<Item = &'static str> + '_ {
        Command::ALL
            .into_iter()
            .map(Command::name)
            .filter(move |name| name.starts_with(line))
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let candidates = Self::matches(line)
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }

        Self::matches(line)
            .find(|name| name.len() > line.len())
            .map(|name| name[line.len()..].to_string())
    }
}

impl Validator for CliHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/new"), Some(Command::New));
        assert_eq!(Command::parse("/history"), Some(Command::History));
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
        assert_eq!(Command::parse("exit"), Some(Command::Quit));
        assert_eq!(Command::parse("/draw"), None);
        assert_eq!(Command::parse("new"), None);
    }

    #[test]
    fn test_prefix_matches() {
        let found: Vec<_> = CliHelper::matches("/h").collect();
        assert_eq!(found, vec!["/history"]);
        assert_eq!(CliHelper::matches("/").count(), 3);
    }
}
