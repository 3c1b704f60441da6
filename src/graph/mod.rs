//! Stage graphs: declarative flow configuration.
//!
//! A graph lists stages in traversal order; each stage lists its steps and
//! the document key every step writes to. Graphs never change at runtime.

pub mod model;
pub mod presets;

pub use model::{
    COMPLETED_STAGE, NextStage, NextStep, StageDef, StageGraph, StepDef, StepKind, StepRef,
};
