//! Stuck detection: recommends recovery UI from interaction counters.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recovery the UI may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryHint {
    None,
    OfferExamples,
    OfferHelp,
    OfferSkip,
    OfferRestart,
}

impl std::fmt::Display for RecoveryHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::OfferExamples => "offer-examples",
            Self::OfferHelp => "offer-help",
            Self::OfferSkip => "offer-skip",
            Self::OfferRestart => "offer-restart",
        };
        write!(f, "{s}")
    }
}

/// Thresholds at which a hint is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuckThresholds {
    /// Empty submissions before offering examples.
    pub empty_attempts: u32,
    /// Invalid submissions before offering skip (or help).
    pub invalid_attempts: u32,
    /// Invalid submissions before offering a restart.
    pub restart_attempts: u32,
    /// Idle time after which help is offered.
    pub idle: Duration,
}

impl Default for StuckThresholds {
    fn default() -> Self {
        Self {
            empty_attempts: 2,
            invalid_attempts: 3,
            restart_attempts: 6,
            idle: Duration::from_millis(120_000),
        }
    }
}

/// Observations fed to [`recommend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuckSignals {
    pub empty_input_attempts: u32,
    pub invalid_input_attempts: u32,
    pub idle_ms: u64,
    /// Whether the current step may be skipped.
    pub step_skippable: bool,
}

/// Pick a recovery hint. Restart beats skip/help, which beat examples,
/// which beat idle help.
pub fn recommend(signals: &StuckSignals, thresholds: &StuckThresholds) -> RecoveryHint {
    if signals.invalid_input_attempts >= thresholds.restart_attempts {
        return RecoveryHint::OfferRestart;
    }
    if signals.invalid_input_attempts >= thresholds.invalid_attempts {
        return if signals.step_skippable {
            RecoveryHint::OfferSkip
        } else {
            RecoveryHint::OfferHelp
        };
    }
    if signals.empty_input_attempts >= thresholds.empty_attempts {
        return RecoveryHint::OfferExamples;
    }
    if u128::from(signals.idle_ms) > thresholds.idle.as_millis() {
        return RecoveryHint::OfferHelp;
    }
    RecoveryHint::None
}

/// Counters the orchestrator maintains for stuck detection. Kept outside the
/// flow state: rejected input bumps them without touching the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InteractionCounters {
    pub empty_input_attempts: u32,
    pub invalid_input_attempts: u32,
    pub last_interaction_at: DateTime<Utc>,
}

impl InteractionCounters {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            empty_input_attempts: 0,
            invalid_input_attempts: 0,
            last_interaction_at: now,
        }
    }

    pub fn record_empty(&mut self, now: DateTime<Utc>) {
        self.empty_input_attempts = self.empty_input_attempts.saturating_add(1);
        self.last_interaction_at = now;
    }

    pub fn record_invalid(&mut self, now: DateTime<Utc>) {
        self.invalid_input_attempts = self.invalid_input_attempts.saturating_add(1);
        self.last_interaction_at = now;
    }

    /// Clear attempt counters after progress.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Self::new(now);
    }

    pub fn signals(&self, now: DateTime<Utc>, step_skippable: bool) -> StuckSignals {
        let idle_ms = (now - self.last_interaction_at).num_milliseconds().max(0) as u64;
        StuckSignals {
            empty_input_attempts: self.empty_input_attempts,
            invalid_input_attempts: self.invalid_input_attempts,
            idle_ms,
            step_skippable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(empty: u32, invalid: u32, idle_ms: u64, skippable: bool) -> StuckSignals {
        StuckSignals {
            empty_input_attempts: empty,
            invalid_input_attempts: invalid,
            idle_ms,
            step_skippable: skippable,
        }
    }

    #[test]
    fn quiet_session_needs_nothing() {
        let t = StuckThresholds::default();
        assert_eq!(recommend(&signals(0, 0, 0, false), &t), RecoveryHint::None);
        assert_eq!(recommend(&signals(1, 2, 120_000, false), &t), RecoveryHint::None);
    }

    #[test]
    fn empty_submissions_offer_examples() {
        let t = StuckThresholds::default();
        assert_eq!(
            recommend(&signals(2, 0, 0, false), &t),
            RecoveryHint::OfferExamples
        );
    }

    #[test]
    fn invalid_submissions_offer_skip_or_help() {
        let t = StuckThresholds::default();
        assert_eq!(recommend(&signals(0, 3, 0, true), &t), RecoveryHint::OfferSkip);
        assert_eq!(recommend(&signals(0, 3, 0, false), &t), RecoveryHint::OfferHelp);
        assert_eq!(recommend(&signals(5, 3, 0, true), &t), RecoveryHint::OfferSkip);
    }

    #[test]
    fn repeated_failure_offers_restart() {
        let t = StuckThresholds::default();
        assert_eq!(
            recommend(&signals(0, 6, 0, true), &t),
            RecoveryHint::OfferRestart
        );
    }

    #[test]
    fn idle_offers_help() {
        let t = StuckThresholds::default();
        assert_eq!(recommend(&signals(0, 0, 120_001, false), &t), RecoveryHint::OfferHelp);
    }

    #[test]
    fn thresholds_are_configurable() {
        let t = StuckThresholds {
            empty_attempts: 1,
            invalid_attempts: 10,
            restart_attempts: 20,
            idle: Duration::from_secs(5),
        };
        assert_eq!(recommend(&signals(1, 0, 0, false), &t), RecoveryHint::OfferExamples);
        assert_eq!(recommend(&signals(0, 9, 0, true), &t), RecoveryHint::None);
        assert_eq!(recommend(&signals(0, 0, 5_001, false), &t), RecoveryHint::OfferHelp);
    }

    #[test]
    fn counters_track_and_reset() {
        let start = Utc::now();
        let mut counters = InteractionCounters::new(start);
        counters.record_empty(start);
        counters.record_empty(start);
        counters.record_invalid(start);
        let later = start + chrono::Duration::milliseconds(1_500);
        let s = counters.signals(later, false);
        assert_eq!(s.empty_input_attempts, 2);
        assert_eq!(s.invalid_input_attempts, 1);
        assert_eq!(s.idle_ms, 1_500);

        counters.reset(later);
        assert_eq!(counters.empty_input_attempts, 0);
        assert_eq!(counters.invalid_input_attempts, 0);
        assert_eq!(counters.last_interaction_at, later);
    }

    #[test]
    fn hint_display_matches_serde() {
        for hint in [
            RecoveryHint::None,
            RecoveryHint::OfferExamples,
            RecoveryHint::OfferHelp,
            RecoveryHint::OfferSkip,
            RecoveryHint::OfferRestart,
        ] {
            let json = serde_json::to_string(&hint).unwrap();
            assert_eq!(format!("\"{hint}\""), json);
        }
    }
}
