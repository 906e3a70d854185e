use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::{Arc, Mutex};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::input::COMMANDS;

/// Shared list of the latest server suggestions, filled by `/suggest`.
pub type SuggestionCache = Arc<Mutex<Vec<String>>>;

/// Completes slash commands locally and free text from the suggestion cache.
#[derive(Clone)]
pub struct CliHelper {
    suggestions: SuggestionCache,
    colored: bool,
}

impl CliHelper {
    pub fn new(suggestions: SuggestionCache, colored: bool) -> Self {
        Self {
            suggestions,
            colored,
        }
    }

    fn candidates(&self, line: &str) -> Vec<String> {
        if line.starts_with('/') {
            return COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| cmd.to_string())
                .collect();
        }
        match self.suggestions.lock() {
            Ok(cache) => cache
                .iter()
                .filter(|text| text.starts_with(line))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
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
        let candidates = self
            .candidates(line)
            .into_iter()
            .map(|text| Pair {
                display: text.clone(),
                replacement: text,
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if self.colored && line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        self.colored
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.is_empty() || line.contains(' ') {
            return None;
        }
        self.candidates(line)
            .into_iter()
            .find(|candidate| candidate.len() > line.len())
            .map(|candidate| candidate[line.len()..].to_string())
    }
}

impl Validator for CliHelper {}
