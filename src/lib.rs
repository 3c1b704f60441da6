//! Blueprint Flow: staged authoring of educator blueprints.

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod flow;
pub mod graph;
pub mod session;
pub mod store;
pub mod suggestions;
