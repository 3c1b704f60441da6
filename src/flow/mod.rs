//! Flow engine: state, guard, and orchestrator for staged authoring.
//!
//! One [`FlowOrchestrator`] owns one session. It captures answers into the
//! blueprint document, consults the transition guard for every navigation
//! action, and tells subscribers about each change. It never performs I/O;
//! persistence and suggestions live in the session layer.

pub mod action;
pub mod events;
pub mod guard;
pub mod orchestrator;
pub mod persisted;
pub mod state;
pub mod stuck;
pub mod validation;

pub use action::{ActionKind, FlowAction, UnknownAction};
pub use events::{FlowEvent, FlowEventKind, Subscription};
pub use guard::{Decision, Effect, GuardPolicy, RejectReason};
pub use orchestrator::{FlowOptions, FlowOrchestrator, SubmitOutcome, TransitionOutcome};
pub use persisted::{FORMAT_VERSION, PersistedBlueprint};
pub use state::{FlowSnapshot, FlowState, Interaction, InteractionEntry, Position};
pub use stuck::{InteractionCounters, RecoveryHint, StuckSignals, StuckThresholds};
