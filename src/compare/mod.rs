//! Structural comparison of two snapshots.
//!
//! Both snapshots go through the codec first, so values are compared in
//! their tagged textual form. Each difference is addressed as
//! `(kind, id, attribute)`: collection kinds use three path segments,
//! unique kinds and the global-app entity use two (the attribute name then
//! sits in the `id` slot). Anything deeper is reported as one `modified`
//! entry for the enclosing attribute.
//!
//! Differences are split by kind into `unblocked` (kinds explicitly
//! allowed to change) and `blocked` (everything else).

pub mod tree;

use crate::codec::snapshot_to_tree;
use crate::config::section::{GLOBAL_DISPLAY_NAME, GLOBAL_KIND, KindNature};
use crate::config::snapshot::Snapshot;
use crate::error::{ConfigError, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::{error, info};
use tree::TreeChange;

/// An added or removed entity or attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub kind: String,
    pub id: String,
    pub attribute: Option<String>,
    pub value: JsonValue,
}

/// A changed entity or attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifiedEntry {
    pub kind: String,
    pub id: String,
    pub attribute: Option<String>,
    pub old: JsonValue,
    pub new: JsonValue,
}

/// `KIND "id" has attribute "attr"` or `KIND "id" was`.
fn subject(kind: &str, id: &str, attribute: Option<&str>) -> String {
    match attribute {
        Some(attribute) => format!("{} \"{}\" has attribute \"{}\"", kind, id, attribute),
        None => format!("{} \"{}\" was", kind, id),
    }
}

/// Tagged strings are shown bare, anything else as JSON.
fn render(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DiffEntry {
    fn added_message(&self) -> String {
        format!(
            "{} added: {}",
            subject(&self.kind, &self.id, self.attribute.as_deref()),
            render(&self.value)
        )
    }

    fn removed_message(&self) -> String {
        format!("{} removed", subject(&self.kind, &self.id, self.attribute.as_deref()))
    }
}

impl ModifiedEntry {
    fn message(&self) -> String {
        format!(
            "{} modified: {} -> {}",
            subject(&self.kind, &self.id, self.attribute.as_deref()),
            render(&self.old),
            render(&self.new)
        )
    }
}

/// Differences of one classification group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffSections {
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    pub modified: Vec<ModifiedEntry>,
}

impl DiffSections {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// One human-readable line per entry: added, then removed, then modified.
    pub fn messages(&self) -> Vec<String> {
        self.added
            .iter()
            .map(DiffEntry::added_message)
            .chain(self.removed.iter().map(DiffEntry::removed_message))
            .chain(self.modified.iter().map(ModifiedEntry::message))
            .collect()
    }

    fn sort_by_kind(&mut self) {
        self.added.sort_by(|a, b| a.kind.cmp(&b.kind));
        self.removed.sort_by(|a, b| a.kind.cmp(&b.kind));
        self.modified.sort_by(|a, b| a.kind.cmp(&b.kind));
    }
}

/// Per-kind entry counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: String,
    pub blocked: bool,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

/// Outcome of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparatorResult {
    pub blocked: DiffSections,
    pub unblocked: DiffSections,
}

impl ComparatorResult {
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty() && self.unblocked.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.blocked.is_empty()
    }

    /// Entry counts per displayed kind, blocked groups first.
    pub fn summary(&self) -> Vec<KindSummary> {
        let mut summary = Vec::new();
        for (blocked, sections) in [(true, &self.blocked), (false, &self.unblocked)] {
            let mut counts: BTreeMap<&str, [usize; 3]> = BTreeMap::new();
            for entry in &sections.added {
                counts.entry(entry.kind.as_str()).or_default()[0] += 1;
            }
            for entry in &sections.removed {
                counts.entry(entry.kind.as_str()).or_default()[1] += 1;
            }
            for entry in &sections.modified {
                counts.entry(entry.kind.as_str()).or_default()[2] += 1;
            }
            summary.extend(counts.into_iter().map(|(kind, [added, removed, modified])| {
                KindSummary {
                    kind: kind.to_string(),
                    blocked,
                    added,
                    removed,
                    modified,
                }
            }));
        }
        summary
    }
}

impl fmt::Display for ComparatorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            writeln!(f, "No differences found.")?;
            return Ok(());
        }

        for (label, sections) in [("Blocked", &self.blocked), ("Unblocked", &self.unblocked)] {
            if sections.is_empty() {
                continue;
            }
            writeln!(f, "{} changes", label)?;
            writeln!(f, "{}", "=".repeat(60))?;

            if !sections.added.is_empty() {
                writeln!(f, "  Added ({}):", sections.added.len())?;
                for entry in &sections.added {
                    writeln!(f, "    + {}", entry.added_message())?;
                }
            }
            if !sections.removed.is_empty() {
                writeln!(f, "  Removed ({}):", sections.removed.len())?;
                for entry in &sections.removed {
                    writeln!(f, "    - {}", entry.removed_message())?;
                }
            }
            if !sections.modified.is_empty() {
                writeln!(f, "  Modified ({}):", sections.modified.len())?;
                for entry in &sections.modified {
                    writeln!(f, "    ~ {}", entry.message())?;
                }
            }
            writeln!(f)?;
        }

        writeln!(
            f,
            "Summary: {} blocked, {} unblocked changes",
            self.blocked.len(),
            self.unblocked.len()
        )
    }
}

/// Labels and failure mode of one comparison.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    /// Fail with [`ConfigError::ConflictedConfiguration`] on blocked changes.
    pub raise_error: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            old_version: None,
            new_version: None,
            raise_error: true,
        }
    }
}

fn version_label(version: Option<&str>) -> String {
    match version {
        Some(version) => format!("version {} Configuration", version),
        None => "current Configuration".to_string(),
    }
}

/// Compares snapshots, treating every kind outside its unblocked set as
/// a conflict.
#[derive(Debug, Clone, Default)]
pub struct ConfigComparator {
    unblocked: BTreeSet<String>,
}

impl ConfigComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unblocked<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unblocked: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Allow changes in `kind`. The global-app entity is named `GLOBAL`.
    pub fn add_unblocked(&mut self, kind: impl Into<String>) {
        self.unblocked.insert(kind.into());
    }

    pub fn is_unblocked(&self, kind: &str) -> bool {
        self.unblocked.contains(kind)
    }

    pub fn compare(&self, old: &Snapshot, new: &Snapshot) -> Result<ComparatorResult> {
        self.compare_with(old, new, &CompareOptions::default())
    }

    pub fn compare_with(
        &self,
        old: &Snapshot,
        new: &Snapshot,
        options: &CompareOptions,
    ) -> Result<ComparatorResult> {
        let old_tree = snapshot_to_tree(old);
        let new_tree = snapshot_to_tree(new);

        let mut result = ComparatorResult::default();
        let mut collapsed: HashSet<Vec<String>> = HashSet::new();

        for change in tree::diff(&old_tree, &new_tree) {
            let path = change.path().to_vec();
            let Some(kind) = path.first().cloned() else {
                continue;
            };
            let depth = match old.nature(&kind).or_else(|| new.nature(&kind)) {
                Some(KindNature::Collection) => 3,
                _ => 2,
            };

            if path.len() > depth {
                let prefix = path[..depth].to_vec();
                if collapsed.insert(prefix.clone()) {
                    let old_value = tree::lookup(&old_tree, &prefix).cloned();
                    let new_value = tree::lookup(&new_tree, &prefix).cloned();
                    self.push_modified(
                        &mut result,
                        &prefix,
                        old_value.unwrap_or(JsonValue::Null),
                        new_value.unwrap_or(JsonValue::Null),
                    );
                }
                continue;
            }

            if path.len() == 1 {
                // a whole kind appeared or vanished
                match change {
                    TreeChange::Added { value, .. } => {
                        for (key, child) in value.as_object().into_iter().flatten() {
                            self.push_added(&mut result, &[kind.clone(), key.clone()], child.clone());
                        }
                    }
                    TreeChange::Removed { value, .. } => {
                        for (key, child) in value.as_object().into_iter().flatten() {
                            self.push_removed(&mut result, &[kind.clone(), key.clone()], child.clone());
                        }
                    }
                    TreeChange::Modified { .. } => {}
                }
                continue;
            }

            match change {
                TreeChange::Added { path, value } => self.push_added(&mut result, &path, value),
                TreeChange::Removed { path, value } => self.push_removed(&mut result, &path, value),
                TreeChange::Modified { path, old, new } => {
                    self.push_modified(&mut result, &path, old, new)
                }
            }
        }

        result.blocked.sort_by_kind();
        result.unblocked.sort_by_kind();

        let old_label = version_label(options.old_version.as_deref());
        let new_label = version_label(options.new_version.as_deref());
        log_result(&result, &old_label, &new_label);

        if options.raise_error && result.has_conflicts() {
            return Err(ConfigError::ConflictedConfiguration(Box::new(result)));
        }
        Ok(result)
    }

    /// Group for a raw kind name and its displayed name.
    fn target<'r>(&self, result: &'r mut ComparatorResult, kind: &str) -> (&'r mut DiffSections, String) {
        let display = if kind == GLOBAL_KIND {
            GLOBAL_DISPLAY_NAME.to_string()
        } else {
            kind.to_string()
        };
        if self.is_unblocked(kind) {
            (&mut result.unblocked, display)
        } else {
            (&mut result.blocked, display)
        }
    }

    fn push_added(&self, result: &mut ComparatorResult, path: &[String], value: JsonValue) {
        let (sections, kind) = self.target(result, &path[0]);
        sections.added.push(DiffEntry {
            kind,
            id: path[1].clone(),
            attribute: path.get(2).cloned(),
            value,
        });
    }

    fn push_removed(&self, result: &mut ComparatorResult, path: &[String], value: JsonValue) {
        let (sections, kind) = self.target(result, &path[0]);
        sections.removed.push(DiffEntry {
            kind,
            id: path[1].clone(),
            attribute: path.get(2).cloned(),
            value,
        });
    }

    fn push_modified(
        &self,
        result: &mut ComparatorResult,
        path: &[String],
        old: JsonValue,
        new: JsonValue,
    ) {
        let (sections, kind) = self.target(result, &path[0]);
        sections.modified.push(ModifiedEntry {
            kind,
            id: path[1].clone(),
            attribute: path.get(2).cloned(),
            old,
            new,
        });
    }
}

fn log_result(result: &ComparatorResult, old_label: &str, new_label: &str) {
    if !result.unblocked.is_empty() {
        info!(
            "There are non-conflicting changes between the {} and the {}:\n\t{}",
            old_label,
            new_label,
            result.unblocked.messages().join("\n\t")
        );
    }
    if !result.blocked.is_empty() {
        error!(
            "The {} is conflicted with the {}:\n\t{}",
            old_label,
            new_label,
            result.blocked.messages().join("\n\t")
        );
        error!("To accept these changes, unblock their kinds or compare without raising an error.");
    }
}

/// Compare with every kind blocked.
pub fn compare(old: &Snapshot, new: &Snapshot) -> Result<ComparatorResult> {
    ConfigComparator::new().compare(old, new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::config::section::Section;
    use crate::types::Value;
    use serde_json::json;

    fn snapshot(sections: Vec<Section>) -> Snapshot {
        let mut snapshot = Snapshot::empty();
        for section in sections {
            snapshot.put(section);
        }
        snapshot
    }

    fn k(id: &str, attributes: crate::types::AttrMap) -> Section {
        Section::collection("K", id, attributes).unwrap()
    }

    fn no_raise() -> CompareOptions {
        CompareOptions {
            raise_error: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_snapshot_is_empty() {
        let s = snapshot(vec![k("x", attrs! {"attr" => "A", "n" => 1})]);
        let result = compare(&s, &s).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.to_string(), "No differences found.\n");
    }

    #[test]
    fn test_single_attribute_modified() {
        let old = snapshot(vec![k("x", attrs! {"attr" => "A"})]);
        let new = snapshot(vec![k("x", attrs! {"attr" => "B"})]);
        let result = ConfigComparator::new().compare_with(&old, &new, &no_raise()).unwrap();
        assert_eq!(
            result.blocked.modified,
            vec![ModifiedEntry {
                kind: "K".into(),
                id: "x".into(),
                attribute: Some("attr".into()),
                old: json!("A"),
                new: json!("B"),
            }]
        );
        assert!(result.blocked.added.is_empty() && result.blocked.removed.is_empty());
    }

    #[test]
    fn test_list_shrink_is_one_modification() {
        let old = snapshot(vec![k("x", attrs! {"l" => vec![1, 2, 3]})]);
        let new = snapshot(vec![k("x", attrs! {"l" => vec![1, 2]})]);
        let result = ConfigComparator::new().compare_with(&old, &new, &no_raise()).unwrap();
        assert_eq!(result.blocked.len(), 1);
        assert_eq!(result.blocked.modified[0].old, json!(["1:int", "2:int", "3:int"]));
        assert_eq!(result.blocked.modified[0].new, json!(["1:int", "2:int"]));
    }

    #[test]
    fn test_blocked_changes_raise() {
        let old = snapshot(vec![k("x", attrs! {"attr" => "A"})]);
        let new = snapshot(vec![k("x", attrs! {"attr" => "B"})]);
        match compare(&old, &new) {
            Err(ConfigError::ConflictedConfiguration(result)) => assert_eq!(result.blocked.len(), 1),
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_unblocked_kind_does_not_raise() {
        let old = snapshot(vec![k("x", attrs! {"attr" => "A"})]);
        let new = snapshot(vec![k("x", attrs! {"attr" => "B"}), k("y", attrs! {})]);
        let result = ConfigComparator::with_unblocked(["K"]).compare(&old, &new).unwrap();
        assert!(result.blocked.is_empty());
        assert_eq!(result.unblocked.added.len(), 1);
        assert_eq!(result.unblocked.added[0].attribute, None);
        assert_eq!(result.unblocked.modified.len(), 1);
    }

    #[test]
    fn test_global_is_renamed_but_classified_raw() {
        let old = snapshot(vec![Section::global(attrs! {"root_folder" => "./a/"})]);
        let new = snapshot(vec![Section::global(attrs! {"root_folder" => "./b/"})]);
        let mut comparator = ConfigComparator::new();
        let result = comparator.compare_with(&old, &new, &no_raise()).unwrap();
        assert_eq!(result.blocked.modified[0].kind, "Global Configuration");
        assert_eq!(result.blocked.modified[0].id, "root_folder");
        assert_eq!(result.blocked.modified[0].attribute, None);

        comparator.add_unblocked("GLOBAL");
        let result = comparator.compare(&old, &new).unwrap();
        assert_eq!(result.unblocked.len(), 1);
    }

    #[test]
    fn test_nested_map_change_collapses() {
        let old = snapshot(vec![k("x", attrs! {"m" => attrs! {"a" => 1, "b" => 2}})]);
        let new = snapshot(vec![k("x", attrs! {"m" => attrs! {"a" => 3, "c" => 2}})]);
        let result = ConfigComparator::new().compare_with(&old, &new, &no_raise()).unwrap();
        assert_eq!(result.blocked.len(), 1);
        let entry = &result.blocked.modified[0];
        assert_eq!(entry.attribute.as_deref(), Some("m"));
        assert_eq!(entry.old, json!({"a": "1:int", "b": "2:int"}));
    }

    #[test]
    fn test_whole_kind_added_is_reported_per_entity() {
        let old = snapshot(vec![]);
        let new = snapshot(vec![k("x", attrs! {}), k("y", attrs! {"a" => true})]);
        let result = ConfigComparator::new().compare_with(&old, &new, &no_raise()).unwrap();
        let ids: Vec<&str> = result.blocked.added.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(result.blocked.added[1].value, json!({"a": "True:bool"}));
    }

    #[test]
    fn test_unique_kind_uses_two_segments() {
        let old = snapshot(vec![Section::unique("JOB", attrs! {"mode" => "standalone"}).unwrap()]);
        let new = snapshot(vec![
            Section::unique("JOB", attrs! {"mode" => "development", "n" => 2}).unwrap(),
        ]);
        let result = ConfigComparator::new().compare_with(&old, &new, &no_raise()).unwrap();
        assert_eq!(result.blocked.added[0].id, "n");
        assert_eq!(result.blocked.modified[0].id, "mode");
        assert_eq!(result.blocked.modified[0].attribute, None);
    }

    #[test]
    fn test_messages() {
        let old = snapshot(vec![k("x", attrs! {"attr" => "A"}), k("gone", attrs! {})]);
        let new = snapshot(vec![k("x", attrs! {"attr" => Value::Int(4)})]);
        let result = ConfigComparator::new().compare_with(&old, &new, &no_raise()).unwrap();
        assert_eq!(
            result.blocked.messages(),
            vec![
                "K \"gone\" was removed".to_string(),
                "K \"x\" has attribute \"attr\" modified: A -> 4:int".to_string(),
            ]
        );
    }

    #[test]
    fn test_results_sorted_by_displayed_kind() {
        let old = snapshot(vec![
            Section::collection("ZED", "a", attrs! {"v" => 1}).unwrap(),
            Section::global(attrs! {"root_folder" => "./a/"}),
            Section::collection("ALPHA", "a", attrs! {"v" => 1}).unwrap(),
        ]);
        let new = snapshot(vec![
            Section::collection("ZED", "a", attrs! {"v" => 2}).unwrap(),
            Section::global(attrs! {"root_folder" => "./b/"}),
            Section::collection("ALPHA", "a", attrs! {"v" => 2}).unwrap(),
        ]);
        let result = ConfigComparator::new().compare_with(&old, &new, &no_raise()).unwrap();
        let kinds: Vec<&str> = result.blocked.modified.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["ALPHA", "Global Configuration", "ZED"]);
        let summary = result.summary();
        assert_eq!(summary.len(), 3);
        assert!(summary.iter().all(|s| s.blocked && s.modified == 1));
    }
}
