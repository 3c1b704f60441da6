//! Parses REPL lines into commands.

use crate::flow::FlowAction;

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A navigation action for the orchestrator.
    Action(FlowAction),
    /// Free text captured as the answer for the current step.
    Input(String),
    Status,
    Export,
    Examples,
    Sessions,
    Help,
    Quit,
    /// A slash command we don't know.
    Unknown(String),
}

pub struct CommandParser;

impl CommandParser {
    /// Slash commands name either a flow action (any label
    /// [`FlowAction`]'s `FromStr` accepts) or a REPL command. Anything else
    /// is an answer.
    pub fn parse(line: &str) -> Command {
        let trimmed = line.trim();
        let Some(word) = trimmed.strip_prefix('/') else {
            return Command::Input(line.to_string());
        };

        if let Ok(action) = word.parse::<FlowAction>() {
            return Command::Action(action);
        }
        match word.to_lowercase().as_str() {
            "status" => Command::Status,
            "export" => Command::Export,
            "examples" | "suggest" => Command::Examples,
            "sessions" => Command::Sessions,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  /continue        move to the next step (also /next, /advance)
  /back            return to the previous step
  /skip            skip an optional step
  /refine          revisit the first step of this stage
  /restart [wipe]  start over, optionally clearing every answer
  /status          show where you are
  /export          print the blueprint as JSON
  /examples        show example answers for this step
  /sessions        list saved blueprints
  /quit            leave
Anything else is captured as your answer for the current step.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_commands() {
        assert_eq!(
            CommandParser::parse("/next"),
            Command::Action(FlowAction::Continue)
        );
        assert_eq!(
            CommandParser::parse("  /BACK "),
            Command::Action(FlowAction::Back)
        );
        assert_eq!(
            CommandParser::parse("/restart wipe"),
            Command::Action(FlowAction::Restart { wipe: true })
        );
        assert_eq!(
            CommandParser::parse("/restart"),
            Command::Action(FlowAction::Restart { wipe: false })
        );
    }

    #[test]
    fn action_labels_share_flow_aliases() {
        assert_eq!(
            CommandParser::parse("/Go Back"),
            Command::Action(FlowAction::Back)
        );
        assert_eq!(
            CommandParser::parse("/start over"),
            Command::Action(FlowAction::Restart { wipe: false })
        );
        assert_eq!(
            CommandParser::parse("/restart --wipe"),
            Command::Action(FlowAction::Restart { wipe: true })
        );
        assert_eq!(CommandParser::parse("/"), Command::Unknown("/".into()));
    }

    #[test]
    fn plain_text_is_input() {
        assert_eq!(
            CommandParser::parse("Sustainability"),
            Command::Input("Sustainability".into())
        );
        // Command words without a slash are answers too.
        assert_eq!(CommandParser::parse("skip"), Command::Input("skip".into()));
    }

    #[test]
    fn unknown_slash_command() {
        assert_eq!(
            CommandParser::parse("/contnue"),
            Command::Unknown("/contnue".into())
        );
    }

    #[test]
    fn info_commands() {
        assert_eq!(CommandParser::parse("/status"), Command::Status);
        assert_eq!(CommandParser::parse("/export"), Command::Export);
        assert_eq!(CommandParser::parse("/examples"), Command::Examples);
        assert_eq!(CommandParser::parse("/?"), Command::Help);
        assert_eq!(CommandParser::parse("/exit"), Command::Quit);
    }
}
