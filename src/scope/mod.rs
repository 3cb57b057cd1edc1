//! Layered variable scopes merged into a single precedence-ordered lookup.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::collection::{Collection, Environment, VariableEntry};

/// One accepted variable and the scope it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedVariable {
    pub key: String,
    pub value: String,
    pub source: String,
}

/// Merged view of all active variables, highest priority first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSnapshot {
    entries: Vec<ScopedVariable>,
    seen: HashSet<String>,
}

impl ScopeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a lower-priority scope. Keys already accepted from a
    /// higher-priority scope are skipped.
    pub fn push_scope<'a, I>(&mut self, source: &str, entries: I)
    where
        I: IntoIterator<Item = &'a VariableEntry>,
    {
        for entry in entries {
            if self.seen.contains(&entry.key) {
                continue;
            }
            self.seen.insert(entry.key.clone());
            self.entries.push(ScopedVariable {
                key: entry.key.clone(),
                value: entry.value.clone(),
                source: source.to_string(),
            });
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.source.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopedVariable> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }
}

/// Merges environment, collection and folder variables.
///
/// Precedence: enabled environment entries, then collection variables, then
/// folder variables walked from the outermost breadcrumb folder inwards. An
/// outer folder therefore shadows a same-named variable of a nested folder.
pub fn build_scope_snapshot(
    collection: Option<&Collection>,
    breadcrumb: &[String],
    environment: Option<&Environment>,
) -> ScopeSnapshot {
    let mut snapshot = ScopeSnapshot::new();

    if let Some(environment) = environment {
        snapshot.push_scope(
            &format!("Environment: {}", environment.name),
            environment.values.iter().filter(|entry| entry.enabled),
        );
    }

    if let Some(collection) = collection {
        snapshot.push_scope(
            &format!("Collection: {}", collection.info.name),
            &collection.variable,
        );

        let chain = collection.folder_chain(breadcrumb);
        for (depth, folder) in chain.iter().enumerate() {
            let path = breadcrumb[..=depth].join(" / ");
            snapshot.push_scope(&format!("Folder: {path}"), &folder.variable);
        }
    }

    debug!(variables = snapshot.len(), "built scope snapshot");
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{CollectionInfo, Item};
    use pretty_assertions::assert_eq;

    fn environment(values: Vec<VariableEntry>) -> Environment {
        Environment {
            id: None,
            name: "Dev".to_string(),
            values,
        }
    }

    fn folder(name: &str, variable: Vec<VariableEntry>, items: Vec<Item>) -> Item {
        Item {
            name: name.to_string(),
            item: Some(items),
            variable,
            ..Item::default()
        }
    }

    fn collection(variable: Vec<VariableEntry>, item: Vec<Item>) -> Collection {
        Collection {
            info: CollectionInfo {
                name: "API".to_string(),
                ..CollectionInfo::default()
            },
            item,
            variable,
            event: Vec::new(),
        }
    }

    fn crumbs(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn environment_wins_over_collection_and_folder() {
        let env = environment(vec![VariableEntry::new("override", "envValue")]);
        let coll = collection(
            vec![VariableEntry::new("override", "collectionValue")],
            vec![folder(
                "Users",
                vec![VariableEntry::new("override", "folderValue")],
                vec![],
            )],
        );

        let snapshot = build_scope_snapshot(Some(&coll), &crumbs(&["Users"]), Some(&env));
        assert_eq!(snapshot.get("override"), Some("envValue"));
        assert_eq!(snapshot.source_of("override"), Some("Environment: Dev"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn disabled_environment_entries_are_invisible() {
        let env = environment(vec![
            VariableEntry::disabled("token", "stale"),
            VariableEntry::new("host", "localhost"),
        ]);
        let coll = collection(vec![VariableEntry::new("token", "fresh")], vec![]);

        let snapshot = build_scope_snapshot(Some(&coll), &[], Some(&env));
        assert_eq!(snapshot.get("token"), Some("fresh"));
        assert!(snapshot
            .iter()
            .all(|entry| !(entry.key == "token" && entry.source.starts_with("Environment"))));
    }

    #[test]
    fn outer_folder_shadows_inner_folder() {
        let coll = collection(
            vec![],
            vec![folder(
                "Outer",
                vec![VariableEntry::new("shared", "outer")],
                vec![folder(
                    "Inner",
                    vec![
                        VariableEntry::new("shared", "inner"),
                        VariableEntry::new("innerOnly", "yes"),
                    ],
                    vec![],
                )],
            )],
        );

        let snapshot = build_scope_snapshot(Some(&coll), &crumbs(&["Outer", "Inner"]), None);
        assert_eq!(snapshot.get("shared"), Some("outer"));
        assert_eq!(snapshot.get("innerOnly"), Some("yes"));
        assert_eq!(snapshot.source_of("innerOnly"), Some("Folder: Outer / Inner"));
    }

    #[test]
    fn unmatched_breadcrumb_stops_folder_inclusion() {
        let coll = collection(
            vec![],
            vec![folder(
                "Outer",
                vec![VariableEntry::new("a", "1")],
                vec![folder("Inner", vec![VariableEntry::new("b", "2")], vec![])],
            )],
        );

        let snapshot =
            build_scope_snapshot(Some(&coll), &crumbs(&["Outer", "Missing", "Inner"]), None);
        assert_eq!(snapshot.get("a"), Some("1"));
        assert_eq!(snapshot.get("b"), None);
    }

    #[test]
    fn ordering_follows_precedence() {
        let env = environment(vec![VariableEntry::new("e", "1")]);
        let coll = collection(
            vec![VariableEntry::new("c", "2")],
            vec![folder("F", vec![VariableEntry::new("f", "3")], vec![])],
        );

        let snapshot = build_scope_snapshot(Some(&coll), &crumbs(&["F"]), Some(&env));
        let keys: Vec<&str> = snapshot.iter().map(|entry| entry.key.as_str()).collect();
        assert_eq!(keys, vec!["e", "c", "f"]);
    }

    #[test]
    fn empty_inputs_give_empty_snapshot() {
        let snapshot = build_scope_snapshot(None, &crumbs(&["x"]), None);
        assert!(snapshot.is_empty());
        assert!(snapshot.to_map().is_empty());
    }
}
