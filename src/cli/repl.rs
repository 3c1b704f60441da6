//! Terminal REPL over a single blueprint session.

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use super::parser::{Command, CommandParser, HELP};
use crate::error::SuggestionError;
use crate::flow::{FlowAction, RecoveryHint};
use crate::session::{SessionRegistry, SessionStatus, SharedSession};
use crate::suggestions::SuggestionProvider;

/// Text to print for one handled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub quit: bool,
}

impl Reply {
    fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quit: false,
        }
    }
}

pub struct Repl {
    registry: Arc<SessionRegistry>,
    session: SharedSession,
    suggestions: Arc<dyn SuggestionProvider>,
}

impl Repl {
    pub fn new(
        registry: Arc<SessionRegistry>,
        session: SharedSession,
        suggestions: Arc<dyn SuggestionProvider>,
    ) -> Self {
        Self {
            registry,
            session,
            suggestions,
        }
    }

    /// Read stdin until EOF or `/quit`.
    pub async fn run(&mut self) {
        println!("{}\n", self.render_status().await);
        eprint!("> ");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let reply = self.handle(&line).await;
                    if !reply.text.is_empty() {
                        println!("\n{}\n", reply.text);
                    }
                    if reply.quit {
                        break;
                    }
                    eprint!("> ");
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    }

    pub async fn handle(&mut self, line: &str) -> Reply {
        match CommandParser::parse(line) {
            Command::Input(text) => self.submit(&text).await,
            Command::Action(action) => self.dispatch(action).await,
            Command::Status => Reply::say(self.render_status().await),
            Command::Export => {
                let session = self.session.lock().await;
                let doc = session.flow().export_json();
                Reply::say(serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string()))
            }
            Command::Examples => Reply::say(self.examples().await),
            Command::Sessions => Reply::say(self.sessions().await),
            Command::Help => Reply::say(HELP),
            Command::Quit => {
                let mut session = self.session.lock().await;
                if session.save_status().dirty {
                    session.persist().await;
                }
                Reply {
                    text: format!("Saved as {}. Bye!", session.id()),
                    quit: true,
                }
            }
            Command::Unknown(cmd) => Reply::say(format!("Unknown command {cmd}. Type /help.")),
        }
    }

    async fn submit(&mut self, text: &str) -> Reply {
        let mut session = self.session.lock().await;
        match session.submit_input(text).await {
            Ok(outcome) => match outcome.path {
                Some(_) => Reply::say("Got it. Add more to replace it, or /continue."),
                None => Reply::say("Nothing to capture here. Type /continue when ready."),
            },
            Err(e) => {
                let mut text = e.guidance().to_string();
                let hint = session.flow().recovery_hint();
                drop(session);
                if let Some(extra) = self.hint_text(hint).await {
                    let _ = write!(text, "\n{extra}");
                }
                Reply::say(text)
            }
        }
    }

    async fn dispatch(&mut self, action: FlowAction) -> Reply {
        let result = self.session.lock().await.dispatch(action).await;
        match result {
            Ok(outcome) => {
                let mut text = String::new();
                if let Some(stage) = outcome.completed_stage {
                    let _ = writeln!(text, "Stage {stage} complete.");
                }
                text.push_str(&self.render_status().await);
                Reply::say(text)
            }
            Err(rejected) => Reply::say(rejected.guidance()),
        }
    }

    async fn hint_text(&self, hint: RecoveryHint) -> Option<String> {
        match hint {
            RecoveryHint::None => None,
            RecoveryHint::OfferExamples => Some(self.examples().await),
            RecoveryHint::OfferHelp => Some("Stuck? Type /help to see what you can do.".into()),
            RecoveryHint::OfferSkip => Some("You can /skip this step for now.".into()),
            RecoveryHint::OfferRestart => {
                Some("This isn't going anywhere. /restart starts a fresh pass.".into())
            }
        }
    }

    async fn examples(&self) -> String {
        let session = self.session.lock().await;
        match session.suggestions(self.suggestions.as_ref()).await {
            Ok(list) if !list.is_empty() => {
                let mut text = String::from("Some ideas:");
                for item in list {
                    let _ = write!(text, "\n  - {item}");
                }
                text
            }
            Ok(_) | Err(SuggestionError::Unavailable { .. }) => {
                "No examples for this step.".to_string()
            }
            Err(e) => format!("Couldn't fetch examples: {e}"),
        }
    }

    async fn sessions(&self) -> String {
        match self.registry.list().await {
            Ok(list) if list.is_empty() => "No saved blueprints.".to_string(),
            Ok(list) => list
                .iter()
                .map(|s| {
                    format!(
                        "{}  {}  {}  {}",
                        s.session_id,
                        s.graph_id,
                        s.current_stage,
                        s.updated_at.format("%Y-%m-%d %H:%M")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => format!("Couldn't list sessions: {e}"),
        }
    }

    async fn render_status(&self) -> String {
        let status = self.session.lock().await.status();
        render(&status)
    }
}

fn render(status: &SessionStatus) -> String {
    let snap = &status.snapshot;
    if snap.is_terminal {
        return "Your blueprint is complete. /export to see it, /restart to revise.".to_string();
    }

    let mut text = format!(
        "{} (step {} of {}, {:.0}% done)",
        snap.stage_title,
        snap.stage_step,
        snap.steps_in_stage,
        snap.progress * 100.0
    );
    if let Some(prompt) = status.prompt.as_deref().filter(|p| !p.is_empty()) {
        let _ = write!(text, "\n{prompt}");
    }
    if let (Some(step), Some(values)) = (
        snap.step.as_deref(),
        snap.document.stage_values(&snap.stage),
    ) {
        if let Some(current) = values.get(step) {
            let _ = write!(text, "\nCurrent answer: {current}");
        }
    }
    if let Some(err) = &status.save.last_save_error {
        let _ = write!(text, "\n(not saved: {err})");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowOptions;
    use crate::graph::presets;
    use crate::store::InMemoryStore;
    use crate::suggestions::StaticSuggestions;

    async fn repl() -> Repl {
        let graph = Arc::new(presets::sop().unwrap());
        let registry = Arc::new(SessionRegistry::new(
            Arc::clone(&graph),
            FlowOptions::default(),
            Arc::new(InMemoryStore::new()),
        ));
        let session = registry.create().await;
        Repl::new(registry, session, Arc::new(StaticSuggestions::new(graph)))
    }

    #[tokio::test]
    async fn answer_then_continue() {
        let mut repl = repl().await;
        let reply = repl.handle("Sustainability").await;
        assert!(reply.text.starts_with("Got it"));

        let reply = repl.handle("/continue").await;
        assert!(reply.text.contains("step 2 of 3"), "{}", reply.text);
    }

    #[tokio::test]
    async fn rejection_shows_guidance() {
        let mut repl = repl().await;
        let reply = repl.handle("/continue").await;
        assert_eq!(reply.text, "Finish this step before continuing.");
    }

    #[tokio::test]
    async fn repeated_empty_input_offers_examples() {
        let mut repl = repl().await;
        repl.handle("   ").await;
        let reply = repl.handle("").await;
        assert!(reply.text.contains("Some ideas:"), "{}", reply.text);
    }

    #[tokio::test]
    async fn export_is_json() {
        let mut repl = repl().await;
        repl.handle("Sustainability").await;
        let reply = repl.handle("/export").await;
        let doc: serde_json::Value = serde_json::from_str(&reply.text).unwrap();
        assert_eq!(doc["ideation"]["bigIdea"], "Sustainability");
    }

    #[tokio::test]
    async fn quit_stops() {
        let mut repl = repl().await;
        assert!(repl.handle("/quit").await.quit);
        assert!(!repl.handle("/status").await.quit);
    }
}
