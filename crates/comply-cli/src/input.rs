//! REPL line parsing.

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Quit,
    Help,
    /// Free text, sent to the application as a command.
    Command(String),
    /// An offered action, by id or by its 1-based list number.
    Action(String),
    Toggle(String),
    ExpandAll,
    CollapseAll,
    Next,
    Previous,
    Parent,
    Child,
    Undo,
    Progress(String),
    Cancel(String),
    Suggest(String),
    Status,
    /// A known command missing its argument; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

/// Slash commands offered for completion.
pub const COMMANDS: [&str; 16] = [
    "/action", "/toggle", "/expand", "/collapse", "/next", "/prev", "/parent", "/child", "/undo",
    "/progress", "/cancel", "/suggest", "/status", "/help", "/quit", "quit",
];

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if matches!(line, "quit" | "exit") {
        return Input::Quit;
    }
    if !line.starts_with('/') {
        return Input::Command(line.to_string());
    }

    let (name, argument) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let required = |usage: &'static str, build: fn(String) -> Input| {
        if argument.is_empty() {
            Input::Usage(usage)
        } else {
            build(argument.to_string())
        }
    };

    match name {
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        "/action" => required("/action <id|number>", Input::Action),
        "/toggle" => required("/toggle <section-id>", Input::Toggle),
        "/expand" => Input::ExpandAll,
        "/collapse" => Input::CollapseAll,
        "/next" => Input::Next,
        "/prev" => Input::Previous,
        "/parent" => Input::Parent,
        "/child" => Input::Child,
        "/undo" => Input::Undo,
        "/progress" => required("/progress <operation-id>", Input::Progress),
        "/cancel" => required("/cancel <operation-id>", Input::Cancel),
        "/suggest" => Input::Suggest(argument.to_string()),
        "/status" => Input::Status,
        other => Input::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_text_is_a_command() {
        assert_eq!(
            parse_input("  list users --all "),
            Input::Command("list users --all".into())
        );
    }

    #[test]
    fn test_quit_and_empty() {
        assert_eq!(parse_input("quit"), Input::Quit);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn test_slash_commands_with_arguments() {
        assert_eq!(parse_input("/toggle details"), Input::Toggle("details".into()));
        assert_eq!(parse_input("/progress  op-1 "), Input::Progress("op-1".into()));
        assert_eq!(parse_input("/cancel op-1"), Input::Cancel("op-1".into()));
        assert_eq!(parse_input("/action 2"), Input::Action("2".into()));
        assert_eq!(parse_input("/suggest st"), Input::Suggest("st".into()));
    }

    #[test]
    fn test_missing_argument_gives_usage() {
        assert_eq!(parse_input("/toggle"), Input::Usage("/toggle <section-id>"));
        assert_eq!(
            parse_input("/progress   "),
            Input::Usage("/progress <operation-id>")
        );
        // empty suggestion input is allowed
        assert_eq!(parse_input("/suggest"), Input::Suggest(String::new()));
    }

    #[test]
    fn test_unknown_slash_command() {
        assert_eq!(parse_input("/frobnicate now"), Input::Unknown("/frobnicate".into()));
    }

    #[test]
    fn test_navigation_commands() {
        assert_eq!(parse_input("/next"), Input::Next);
        assert_eq!(parse_input("/prev"), Input::Previous);
        assert_eq!(parse_input("/parent"), Input::Parent);
        assert_eq!(parse_input("/child"), Input::Child);
        assert_eq!(parse_input("/undo"), Input::Undo);
    }
}
