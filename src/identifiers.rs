use crate::types::{SectionKind, eq_ignore_case};
use std::collections::BTreeMap;

/// One `(identifier, position)` pair of an identified section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierEntry {
    pub identifier: String,
    pub position: usize,
}

/// Identifier lookup for the kinds that require one
///
/// Kept in lock-step with the sections of the document: every identified
/// section has exactly one entry, in position order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierIndex {
    entries: BTreeMap<SectionKind, Vec<IdentifierEntry>>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Record the identifier of the section at `position`
    pub fn insert(&mut self, kind: SectionKind, identifier: impl Into<String>, position: usize) {
        let list = self.entries.entry(kind).or_default();
        list.retain(|e| e.position != position);
        let at = list.partition_point(|e| e.position < position);
        list.insert(
            at,
            IdentifierEntry {
                identifier: identifier.into(),
                position,
            },
        );
    }

    /// Drop the entry of the section at `position`
    pub fn remove(&mut self, kind: SectionKind, position: usize) -> Option<IdentifierEntry> {
        let list = self.entries.get_mut(&kind)?;
        let at = list.iter().position(|e| e.position == position)?;
        Some(list.remove(at))
    }

    /// Replace the identifier of the section at `position`
    pub fn rename(&mut self, kind: SectionKind, position: usize, identifier: impl Into<String>) -> bool {
        match self
            .entries
            .get_mut(&kind)
            .and_then(|list| list.iter_mut().find(|e| e.position == position))
        {
            Some(entry) => {
                entry.identifier = identifier.into();
                true
            }
            None => false,
        }
    }

    /// Position of the first section whose identifier matches, ignoring case
    pub fn position_of(&self, kind: SectionKind, identifier: &str) -> Option<usize> {
        let wanted = identifier.trim();
        self.entries(kind)
            .iter()
            .find(|e| eq_ignore_case(e.identifier.trim(), wanted))
            .map(|e| e.position)
    }

    pub fn identifier_at(&self, kind: SectionKind, position: usize) -> Option<&str> {
        self.entries(kind)
            .iter()
            .find(|e| e.position == position)
            .map(|e| e.identifier.as_str())
    }

    pub fn contains(&self, kind: SectionKind, identifier: &str) -> bool {
        self.position_of(kind, identifier).is_some()
    }

    /// All entries of a kind, in position order
    pub fn entries(&self, kind: SectionKind) -> &[IdentifierEntry] {
        self.entries.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Identifiers used by more than one section of the same kind
    ///
    /// Counting ignores case; the first spelling seen is reported.
    pub fn duplicates(&self) -> BTreeMap<SectionKind, BTreeMap<String, usize>> {
        let mut duplicates = BTreeMap::new();

        for (kind, list) in &self.entries {
            let mut counts: Vec<(&str, usize)> = Vec::new();
            for entry in list {
                let id = entry.identifier.trim();
                match counts.iter_mut().find(|(seen, _)| eq_ignore_case(seen, id)) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((id, 1)),
                }
            }

            let found: BTreeMap<String, usize> = counts
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(id, count)| (id.to_string(), count))
                .collect();

            if !found.is_empty() {
                duplicates.insert(*kind, found);
            }
        }

        duplicates
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
