//! Blueprint document: the structured output being filled in.
//!
//! Top-level keys are stage ids; each stage maps a step's document path to
//! the last value captured for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::StageDef;

/// Location of one value in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub stage: String,
    pub key: String,
}

impl DocumentPath {
    pub fn new(stage: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.stage, self.key)
    }
}

/// The blueprint. Serializes as a plain nested JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    stages: BTreeMap<String, BTreeMap<String, String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value at `path`, overwriting any earlier value.
    ///
    /// Returns `true` if the document content changed.
    pub fn write(&mut self, path: &DocumentPath, value: impl Into<String>) -> bool {
        let value = value.into();
        let stage = self.stages.entry(path.stage.clone()).or_default();
        match stage.get(&path.key) {
            Some(existing) if *existing == value => false,
            _ => {
                stage.insert(path.key.clone(), value);
                true
            }
        }
    }

    pub fn read(&self, path: &DocumentPath) -> Option<&str> {
        self.get(&path.stage, &path.key)
    }

    pub fn get(&self, stage: &str, key: &str) -> Option<&str> {
        self.stages
            .get(stage)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// True iff every required step of `stage` has a captured value.
    pub fn is_stage_satisfied(&self, stage: &StageDef) -> bool {
        stage
            .required_paths()
            .all(|key| self.get(&stage.id, key).is_some())
    }

    pub fn stage_values(&self, stage: &str) -> Option<&BTreeMap<String, String>> {
        self.stages.get(stage)
    }

    /// Every `(stage, key)` pair with a value.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.stages.iter().flat_map(|(stage, values)| {
            values.keys().map(move |key| (stage.as_str(), key.as_str()))
        })
    }

    /// Number of captured values.
    pub fn len(&self) -> usize {
        self.stages.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    /// Deep copy for export; later writes to `self` don't show up in it.
    pub fn snapshot(&self) -> Document {
        self.clone()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StepDef;

    fn ideation() -> StageDef {
        StageDef::new(
            "ideation",
            "Ideation",
            vec![
                StepDef::collect("bigIdea", ""),
                StepDef::collect("challenge", ""),
                StepDef::collect("notes", "").optional(),
                StepDef::clarify("followUp", ""),
            ],
        )
    }

    #[test]
    fn write_then_read() {
        let mut doc = Document::new();
        let path = DocumentPath::new("ideation", "bigIdea");
        assert!(doc.read(&path).is_none());
        assert!(doc.write(&path, "Sustainability"));
        assert_eq!(doc.read(&path), Some("Sustainability"));
    }

    #[test]
    fn last_write_wins() {
        let mut doc = Document::new();
        let path = DocumentPath::new("ideation", "bigIdea");
        doc.write(&path, "first");
        assert!(doc.write(&path, "second"));
        assert_eq!(doc.read(&path), Some("second"));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn identical_write_is_a_no_op() {
        let mut doc = Document::new();
        let path = DocumentPath::new("ideation", "bigIdea");
        doc.write(&path, "same");
        let before = doc.clone();
        assert!(!doc.write(&path, "same"));
        assert_eq!(doc, before);
    }

    #[test]
    fn stage_satisfaction_only_counts_required_collect_steps() {
        let stage = ideation();
        let mut doc = Document::new();
        assert!(!doc.is_stage_satisfied(&stage));

        doc.write(&DocumentPath::new("ideation", "bigIdea"), "idea");
        assert!(!doc.is_stage_satisfied(&stage));

        doc.write(&DocumentPath::new("ideation", "challenge"), "challenge");
        // `notes` is optional and `followUp` is a clarify step.
        assert!(doc.is_stage_satisfied(&stage));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut doc = Document::new();
        let path = DocumentPath::new("ideation", "bigIdea");
        doc.write(&path, "one");
        let snap = doc.snapshot();
        doc.write(&path, "two");
        assert_eq!(snap.read(&path), Some("one"));
    }

    #[test]
    fn json_is_plain_nested_object() {
        let mut doc = Document::new();
        doc.write(&DocumentPath::new("ideation", "bigIdea"), "Sustainability");
        doc.write(&DocumentPath::new("journey", "phases"), "Research, Build");
        let json = doc.to_json();
        assert_eq!(json["ideation"]["bigIdea"], "Sustainability");
        assert_eq!(json["journey"]["phases"], "Research, Build");

        let parsed: Document = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn paths_lists_every_value() {
        let mut doc = Document::new();
        doc.write(&DocumentPath::new("a", "x"), "1");
        doc.write(&DocumentPath::new("b", "y"), "2");
        let paths: Vec<_> = doc.paths().collect();
        assert_eq!(paths, vec![("a", "x"), ("b", "y")]);
    }
}
