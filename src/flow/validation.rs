//! Shallow answer validation for `submit_input`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::InputError;
use crate::graph::{StepDef, StepKind};

/// At least one letter or digit somewhere in the answer.
static WORD_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]").expect("Invalid word-character pattern"));

/// Validate raw text for `step`.
///
/// Returns the trimmed answer to capture, `None` when there is nothing to
/// capture (empty text on a clarify step), or the rejection.
pub fn validate_answer(step: &StepDef, raw: &str) -> Result<Option<String>, InputError> {
    if step.kind == StepKind::TransitionOnly {
        return Err(InputError::NotAccepted {
            step: step.id.clone(),
        });
    }

    let text = raw.trim();
    if text.is_empty() {
        return match step.kind {
            StepKind::Clarify => Ok(None),
            _ => Err(InputError::Empty {
                step: step.id.clone(),
            }),
        };
    }

    if !WORD_CHAR.is_match(text) {
        return Err(InputError::Unrecognized {
            step: step.id.clone(),
        });
    }

    let got = text.chars().count();
    if got < step.min_chars {
        return Err(InputError::TooShort {
            step: step.id.clone(),
            min: step.min_chars,
            got,
        });
    }

    Ok(Some(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_trims_and_accepts() {
        let step = StepDef::collect("bigIdea", "");
        assert_eq!(
            validate_answer(&step, "  Sustainability \n"),
            Ok(Some("Sustainability".to_string()))
        );
    }

    #[test]
    fn collect_rejects_blank() {
        let step = StepDef::collect("bigIdea", "");
        let err = validate_answer(&step, "   ").unwrap_err();
        assert!(err.is_empty_submission());
    }

    #[test]
    fn rejects_punctuation_only() {
        let step = StepDef::collect("bigIdea", "");
        assert_eq!(
            validate_answer(&step, "?!..."),
            Err(InputError::Unrecognized {
                step: "bigIdea".into()
            })
        );
        // Non-latin text is fine.
        assert!(validate_answer(&step, "水の循環").is_ok());
    }

    #[test]
    fn enforces_min_chars() {
        let step = StepDef::collect("question", "").with_min_chars(10);
        assert_eq!(
            validate_answer(&step, "Why?"),
            Err(InputError::TooShort {
                step: "question".into(),
                min: 10,
                got: 4
            })
        );
        assert!(validate_answer(&step, "Why does it rain?").is_ok());
    }

    #[test]
    fn clarify_accepts_empty_as_nothing() {
        let step = StepDef::clarify("supports", "");
        assert_eq!(validate_answer(&step, ""), Ok(None));
        assert_eq!(
            validate_answer(&step, "graphic organizers"),
            Ok(Some("graphic organizers".into()))
        );
    }

    #[test]
    fn transition_steps_take_no_answer() {
        let step = StepDef::transition("confirm", "");
        assert!(matches!(
            validate_answer(&step, "ok"),
            Err(InputError::NotAccepted { .. })
        ));
    }
}
