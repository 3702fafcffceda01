//! Document model for xorg.conf files.
//!
//! Sections are stored per kind, keyed by their position. Subsections live in
//! a parallel map and point back at their parent section; comment blocks are
//! attached either to a section or to a subsection. Lines are kept trimmed and
//! re-indented with tabs on output.
//!
//! The main types are:
//! - [`Document`] - The whole configuration
//! - [`Section`] - A `Section "Kind"` ... `EndSection` block
//! - [`SubSection`] - A `SubSection "Id"` ... `EndSubSection` block
//! - [`CommentTarget`] - Where a comment block is attached

use crate::types::{SectionKind, eq_ignore_case};
use std::collections::BTreeMap;

/// A section body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub position: usize,
    /// Option lines, trimmed
    pub options: Vec<String>,
}

/// Handle of a subsection inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubSectionId(pub usize);

/// A subsection body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSection {
    /// Kind of the enclosing section
    pub parent: SectionKind,
    /// Position of the enclosing section
    pub position: usize,
    /// e.g. `Display` in `SubSection "Display"`
    pub identifier: String,
    /// Option lines, trimmed
    pub options: Vec<String>,
}

/// Owner of a comment block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentTarget {
    pub kind: SectionKind,
    pub position: usize,
    /// Set when the block belongs to a subsection of the section
    pub subsection: Option<SubSectionId>,
}

impl CommentTarget {
    pub fn section(kind: SectionKind, position: usize) -> Self {
        Self {
            kind,
            position,
            subsection: None,
        }
    }

    pub fn subsection(kind: SectionKind, position: usize, id: SubSectionId) -> Self {
        Self {
            kind,
            position,
            subsection: Some(id),
        }
    }
}

/// In-memory xorg.conf
///
/// Equality compares content. Subsections are compared per parent section in
/// order, together with their comment blocks; handle values are ignored.
#[derive(Debug, Clone, Default)]
pub struct Document {
    sections: BTreeMap<SectionKind, BTreeMap<usize, Section>>,

    /// Kinds in the order their first section appeared
    kind_order: Vec<SectionKind>,

    subsections: BTreeMap<SubSectionId, SubSection>,
    next_subsection: usize,

    comments: BTreeMap<CommentTarget, Vec<String>>,

    /// Comment lines found outside of any section, verbatim
    top_comments: Vec<String>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.sections == other.sections
            && self.kind_order == other.kind_order
            && self.top_comments == other.top_comments
            && self.section_comments().eq(other.section_comments())
            && self.nested_view() == other.nested_view()
    }
}

impl Eq for Document {}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the document holds no section at all
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(|s| s.is_empty())
    }

    /// Section kinds present, in output order
    pub fn kinds(&self) -> &[SectionKind] {
        &self.kind_order
    }

    pub fn sections(&self, kind: SectionKind) -> impl Iterator<Item = &Section> {
        self.sections.get(&kind).into_iter().flat_map(|m| m.values())
    }

    pub fn section(&self, kind: SectionKind, position: usize) -> Option<&Section> {
        self.sections.get(&kind)?.get(&position)
    }

    pub fn section_mut(&mut self, kind: SectionKind, position: usize) -> Option<&mut Section> {
        self.sections.get_mut(&kind)?.get_mut(&position)
    }

    pub fn has_section(&self, kind: SectionKind, position: usize) -> bool {
        self.section(kind, position).is_some()
    }

    /// Positions of the sections of a kind, ascending
    pub fn positions(&self, kind: SectionKind) -> Vec<usize> {
        self.sections
            .get(&kind)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn section_count(&self, kind: SectionKind) -> usize {
        self.sections.get(&kind).map(|m| m.len()).unwrap_or(0)
    }

    /// Position a newly created section of this kind would get
    pub fn next_position(&self, kind: SectionKind) -> usize {
        self.sections
            .get(&kind)
            .and_then(|m| m.keys().next_back())
            .map(|last| last + 1)
            .unwrap_or(0)
    }

    /// Insert (or replace) the section at `position`
    pub fn insert_section(&mut self, kind: SectionKind, position: usize, options: Vec<String>) {
        if !self.kind_order.contains(&kind) {
            self.kind_order.push(kind);
        }
        self.sections.entry(kind).or_default().insert(
            position,
            Section {
                kind,
                position,
                options,
            },
        );
    }

    /// Remove a section together with its subsections and comment blocks
    pub fn remove_section(&mut self, kind: SectionKind, position: usize) -> Option<Section> {
        let removed = self.sections.get_mut(&kind)?.remove(&position)?;

        for id in self.subsections_of(kind, position) {
            self.subsections.remove(&id);
        }
        self.comments
            .retain(|target, _| !(target.kind == kind && target.position == position));

        if self.section_count(kind) == 0 {
            self.sections.remove(&kind);
            self.kind_order.retain(|k| *k != kind);
        }

        Some(removed)
    }

    /// Subsections of a section, in creation order
    pub fn subsections_of(&self, kind: SectionKind, position: usize) -> Vec<SubSectionId> {
        self.subsections
            .iter()
            .filter(|(_, sub)| sub.parent == kind && sub.position == position)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Subsections named `identifier` (ignoring case), optionally limited to one section
    pub fn find_subsections(
        &self,
        kind: SectionKind,
        identifier: &str,
        position: Option<usize>,
    ) -> Vec<SubSectionId> {
        let identifier = identifier.trim();
        self.subsections
            .iter()
            .filter(|(_, sub)| {
                sub.parent == kind
                    && position.is_none_or(|p| sub.position == p)
                    && eq_ignore_case(&sub.identifier, identifier)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn subsection(&self, id: SubSectionId) -> Option<&SubSection> {
        self.subsections.get(&id)
    }

    pub fn subsection_mut(&mut self, id: SubSectionId) -> Option<&mut SubSection> {
        self.subsections.get_mut(&id)
    }

    pub fn subsections(&self) -> impl Iterator<Item = (SubSectionId, &SubSection)> {
        self.subsections.iter().map(|(id, sub)| (*id, sub))
    }

    /// Append an empty subsection to a section
    pub fn add_subsection(
        &mut self,
        parent: SectionKind,
        position: usize,
        identifier: impl Into<String>,
    ) -> SubSectionId {
        let id = SubSectionId(self.next_subsection);
        self.next_subsection += 1;
        self.subsections.insert(
            id,
            SubSection {
                parent,
                position,
                identifier: identifier.into(),
                options: Vec::new(),
            },
        );
        id
    }

    /// Remove a subsection and the comments attached to it
    pub fn remove_subsection(&mut self, id: SubSectionId) -> Option<SubSection> {
        let removed = self.subsections.remove(&id)?;
        self.comments.retain(|target, _| target.subsection != Some(id));
        Some(removed)
    }

    pub fn comments(&self, target: &CommentTarget) -> &[String] {
        self.comments.get(target).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every comment block, by owner
    pub fn comment_blocks(&self) -> impl Iterator<Item = (&CommentTarget, &Vec<String>)> {
        self.comments.iter()
    }

    pub fn push_comment(&mut self, target: CommentTarget, line: impl Into<String>) {
        self.comments.entry(target).or_default().push(line.into());
    }

    pub fn take_comments(&mut self, target: &CommentTarget) -> Vec<String> {
        self.comments.remove(target).unwrap_or_default()
    }

    pub fn top_comments(&self) -> &[String] {
        &self.top_comments
    }

    pub fn push_top_comment(&mut self, line: impl Into<String>) {
        self.top_comments.push(line.into());
    }

    fn section_comments(&self) -> impl Iterator<Item = (&CommentTarget, &Vec<String>)> {
        self.comments
            .iter()
            .filter(|(target, lines)| target.subsection.is_none() && !lines.is_empty())
    }

    /// Subsections as (parent, position, identifier, options, comments),
    /// grouped by parent section and in creation order within each
    fn nested_view(&self) -> Vec<(SectionKind, usize, &str, &[String], &[String])> {
        let mut view: Vec<_> = self
            .subsections
            .iter()
            .map(|(id, sub)| {
                let target = CommentTarget::subsection(sub.parent, sub.position, *id);
                (
                    sub.parent,
                    sub.position,
                    sub.identifier.as_str(),
                    sub.options.as_slice(),
                    self.comments(&target),
                )
            })
            .collect();
        view.sort_by_key(|(parent, position, ..)| (*parent, *position));
        view
    }

    /// Render the document as xorg.conf text
    ///
    /// Top-level comments come first, followed by one blank line. Each section
    /// lists its options, then its subsections, then its comment block.
    pub fn serialize(&self) -> String {
        let mut output = String::new();

        for comment in &self.top_comments {
            output.push_str(comment);
            output.push('\n');
        }
        output.push('\n');

        for kind in &self.kind_order {
            for section in self.sections(*kind) {
                self.serialize_section(section, &mut output);
            }
        }

        output
    }

    fn serialize_section(&self, section: &Section, output: &mut String) {
        output.push_str(&format!("Section \"{}\"\n", section.kind));

        for option in &section.options {
            output.push_str(&format!("\t{}\n", option));
        }

        for id in self.subsections_of(section.kind, section.position) {
            let Some(sub) = self.subsections.get(&id) else {
                continue;
            };
            output.push_str(&format!("\tSubSection \"{}\"\n", sub.identifier));
            for option in &sub.options {
                output.push_str(&format!("\t\t{}\n", option));
            }
            let target = CommentTarget::subsection(section.kind, section.position, id);
            for comment in self.comments(&target) {
                output.push_str(&format!("\t\t{}\n", comment));
            }
            output.push_str("\tEndSubSection\n");
        }

        for comment in self.comments(&CommentTarget::section(section.kind, section.position)) {
            output.push_str(&format!("\t{}\n", comment));
        }

        output.push_str("EndSection\n\n");
    }
}
