//! Built-in flow configurations.
//!
//! * `sop`: three authoring stages (ideation, journey, deliverables) of
//!   three steps each.
//! * `pbl`: nine single-step stages walking through a project outline.

use super::model::{StageDef, StageGraph, StepDef};
use crate::error::ConfigError;

pub const SOP_GRAPH_ID: &str = "sop";
pub const PBL_GRAPH_ID: &str = "pbl";

/// The three-stage blueprint flow.
pub fn sop() -> Result<StageGraph, ConfigError> {
    StageGraph::new(
        SOP_GRAPH_ID,
        vec![
            StageDef::new(
                "ideation",
                "Ideation",
                vec![
                    StepDef::collect(
                        "bigIdea",
                        "What's the big idea or theme your students will explore?",
                    )
                    .with_examples(&[
                        "Sustainability in our community",
                        "How stories shape identity",
                        "Designing for accessibility",
                    ]),
                    StepDef::collect(
                        "essentialQuestion",
                        "What essential question will drive the inquiry?",
                    )
                    .with_min_chars(10)
                    .with_examples(&[
                        "How might we reduce waste in our school cafeteria?",
                        "What makes a place feel like home?",
                    ]),
                    StepDef::collect(
                        "challenge",
                        "What authentic challenge will students take on?",
                    )
                    .with_examples(&[
                        "Design a composting program for the school",
                        "Create a podcast series featuring local elders",
                    ]),
                ],
            ),
            StageDef::new(
                "journey",
                "Learning Journey",
                vec![
                    StepDef::collect(
                        "phases",
                        "What phases will the learning journey move through?",
                    )
                    .with_examples(&["Analyze, Brainstorm, Prototype, Evaluate"]),
                    StepDef::collect(
                        "activities",
                        "Which activities happen in each phase?",
                    )
                    .with_examples(&[
                        "Site visit, expert interview, design sprint, peer critique",
                    ]),
                    StepDef::collect(
                        "resources",
                        "Any resources or partners you want to line up?",
                    )
                    .optional()
                    .with_examples(&["Local recycling center, city council member"]),
                ],
            ),
            StageDef::new(
                "deliverables",
                "Deliverables",
                vec![
                    StepDef::collect(
                        "milestones",
                        "What milestones will mark progress along the way?",
                    )
                    .with_examples(&["Research brief, prototype demo, final pitch"]),
                    StepDef::collect(
                        "rubric",
                        "How will you assess the work? Describe the rubric criteria.",
                    )
                    .with_examples(&["Research depth, creativity, collaboration, presentation"]),
                    StepDef::collect(
                        "impact",
                        "Who is the authentic audience and what impact should the work have?",
                    )
                    .with_examples(&["Present to the school board to adopt the plan"]),
                ],
            ),
        ],
    )
}

/// The nine-step project outline flow.
pub fn pbl() -> Result<StageGraph, ConfigError> {
    let single = |id: &str, title: &str, step: StepDef| StageDef::new(id, title, vec![step]);

    StageGraph::new(
        PBL_GRAPH_ID,
        vec![
            single(
                "topic",
                "Topic",
                StepDef::collect("topic", "What topic or subject area is this project about?")
                    .with_examples(&["Water quality", "Local history", "Renewable energy"]),
            ),
            single(
                "drivingQuestion",
                "Driving Question",
                StepDef::collect("question", "What driving question frames the project?")
                    .with_min_chars(10)
                    .with_examples(&["How can we make our river safe to swim in again?"]),
            ),
            single(
                "learningTargets",
                "Learning Targets",
                StepDef::collect("targets", "Which learning targets or standards does it address?")
                    .with_examples(&["Analyze data sets; argue from evidence"]),
            ),
            single(
                "entryEvent",
                "Entry Event",
                StepDef::collect("event", "How will you launch the project?")
                    .with_examples(&["A guest scientist brings river samples to class"]),
            ),
            single(
                "milestones",
                "Milestones",
                StepDef::collect("milestones", "What are the key checkpoints?")
                    .with_examples(&["Proposal, field data, draft report, final presentation"]),
            ),
            single(
                "scaffolds",
                "Scaffolds",
                StepDef::clarify(
                    "supports",
                    "Any scaffolds or supports for students who need them? (optional)",
                )
                .optional()
                .with_examples(&["Sentence starters, graphic organizers, small-group conferences"]),
            ),
            single(
                "assessment",
                "Assessment",
                StepDef::collect("plan", "How will learning be assessed?")
                    .with_examples(&["Rubric-scored report plus peer feedback"]),
            ),
            single(
                "publicProduct",
                "Public Product",
                StepDef::collect("product", "What will students make public, and for whom?")
                    .with_examples(&["A water report presented at the town meeting"]),
            ),
            single(
                "review",
                "Review",
                StepDef::transition("confirm", "Review your blueprint, then continue to finish."),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StepKind;

    #[test]
    fn sop_shape() {
        let g = sop().unwrap();
        assert_eq!(g.id(), SOP_GRAPH_ID);
        assert_eq!(g.stage_count(), 3);
        assert_eq!(g.total_steps(), 9);
        let ideation: Vec<&str> = g
            .steps_of("ideation")
            .unwrap()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ideation, ["bigIdea", "essentialQuestion", "challenge"]);
        assert!(g.steps_of("journey").unwrap()[2].is_skippable());
    }

    #[test]
    fn pbl_shape() {
        let g = pbl().unwrap();
        assert_eq!(g.id(), PBL_GRAPH_ID);
        assert_eq!(g.stage_count(), 9);
        assert_eq!(g.total_steps(), 9);
        assert_eq!(g.steps_of("scaffolds").unwrap()[0].kind, StepKind::Clarify);
        assert_eq!(
            g.steps_of("review").unwrap()[0].kind,
            StepKind::TransitionOnly
        );
    }

    #[test]
    fn every_collect_step_has_examples() {
        for graph in [sop().unwrap(), pbl().unwrap()] {
            for stage in graph.stages() {
                for step in &stage.steps {
                    if step.kind == StepKind::Collect {
                        assert!(
                            !step.examples.is_empty(),
                            "{}/{} should offer examples",
                            stage.id,
                            step.id
                        );
                    }
                }
            }
        }
    }
}
