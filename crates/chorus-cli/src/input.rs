//! Parsing of lines typed at the prompt.
//!
//! Plain text is a message for the agents. A leading `/` selects a local
//! command.

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Send this text to the conversation.
    Say(String),
    /// Stop speech, clear the log and reset the server session.
    Reset,
    /// Print connection and turn status.
    Status,
    /// Silence the current speaker and drop queued lines.
    Skip,
    /// Print the command list.
    Help,
    /// Leave.
    Quit,
    /// Blank line.
    Empty,
    /// A `/command` we do not know.
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  /reset    stop speech, clear the conversation and start over
  /status   show connection and turn state
  /skip     silence the current speaker and drop queued lines
  /help     show this list
  /quit     leave
Anything else is sent to the agents.";

/// Classify a raw input line.
#[must_use]
pub fn parse_line(line: &str) -> InputCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputCommand::Empty;
    }

    // "//text" escapes a message that starts with a slash
    if let Some(escaped) = trimmed.strip_prefix("//") {
        return InputCommand::Say(format!("/{escaped}"));
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return InputCommand::Say(trimmed.to_string());
    };

    match command.to_ascii_lowercase().as_str() {
        "reset" | "restart" => InputCommand::Reset,
        "status" => InputCommand::Status,
        "skip" | "stop" => InputCommand::Skip,
        "help" | "?" => InputCommand::Help,
        "quit" | "exit" | "q" => InputCommand::Quit,
        _ => InputCommand::Unknown(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_said_trimmed() {
        assert_eq!(
            parse_line("  hello there \n"),
            InputCommand::Say("hello there".into())
        );
    }

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(parse_line(""), InputCommand::Empty);
        assert_eq!(parse_line("   \t"), InputCommand::Empty);
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse_line("/RESET"), InputCommand::Reset);
        assert_eq!(parse_line("/Status"), InputCommand::Status);
        assert_eq!(parse_line("/q"), InputCommand::Quit);
        assert_eq!(parse_line("/stop"), InputCommand::Skip);
        assert_eq!(parse_line("/?"), InputCommand::Help);
    }

    #[test]
    fn unknown_command_keeps_input() {
        assert_eq!(
            parse_line("/dance now"),
            InputCommand::Unknown("/dance now".into())
        );
    }

    #[test]
    fn double_slash_sends_literal_text() {
        assert_eq!(
            parse_line("//reset is a command"),
            InputCommand::Say("/reset is a command".into())
        );
    }
}
