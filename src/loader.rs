use crate::document::{CommentTarget, Document, SubSectionId};
use crate::error::{XorgError, XorgResult};
use crate::extract::Extractor;
use crate::identifiers::IdentifierIndex;
use crate::parser::{Line, XorgParser};
use crate::types::{OptionValue, SectionKind};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Where the loader currently is in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TopLevel,
    InSection {
        kind: SectionKind,
        position: usize,
    },
    InSubSection {
        kind: SectionKind,
        position: usize,
        id: SubSectionId,
    },
}

/// Line-driven state machine building a [`Document`]
pub(crate) struct Loader {
    document: Document,
    state: State,
    /// Sections of each kind closed so far
    counters: BTreeMap<SectionKind, usize>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            document: Document::new(),
            state: State::TopLevel,
            counters: BTreeMap::new(),
        }
    }

    /// Consume the whole source and return the document it describes
    pub fn load(mut self, input: &str) -> XorgResult<Document> {
        for (index, raw) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = XorgParser::classify_line(raw, line_no)?;
            trace!(line = line_no, ?line, "classified");
            self.feed(line, raw, line_no)?;
        }

        if self.state != State::TopLevel {
            return Err(XorgError::parse("The last section is incomplete"));
        }

        Ok(self.document)
    }

    fn feed(&mut self, line: Line, raw: &str, line_no: usize) -> XorgResult<()> {
        if line == Line::Blank {
            return Ok(());
        }

        match self.state {
            State::TopLevel => match line {
                Line::Comment(text) => self.document.push_top_comment(text),
                Line::SectionBegin(kind) => {
                    let position = self.counters.get(&kind).copied().unwrap_or(0);
                    self.document.insert_section(kind, position, Vec::new());
                    self.state = State::InSection { kind, position };
                }
                Line::SectionEnd => {
                    return Err(XorgError::parse_at(line_no, "EndSection without a matching Section"));
                }
                Line::SubSectionBegin(_) => {
                    return Err(XorgError::parse_at(
                        line_no,
                        "SubSections can be nested only in well formed sections",
                    ));
                }
                Line::SubSectionEnd => {
                    return Err(XorgError::parse_at(
                        line_no,
                        "SubSections can be closed only after being opened",
                    ));
                }
                Line::Option(_) => {
                    return Err(XorgError::parse_at(
                        line_no,
                        format!("Option outside of a section: {}", raw.trim()),
                    ));
                }
                Line::Blank => {}
            },

            State::InSection { kind, position } => match line {
                Line::Comment(text) => {
                    self.document
                        .push_comment(CommentTarget::section(kind, position), text.trim());
                }
                Line::Option(text) => {
                    if let Some(section) = self.document.section_mut(kind, position) {
                        section.options.push(text);
                    }
                }
                Line::SubSectionBegin(identifier) => {
                    let id = self.document.add_subsection(kind, position, identifier);
                    self.state = State::InSubSection { kind, position, id };
                }
                Line::SectionEnd => {
                    *self.counters.entry(kind).or_insert(0) += 1;
                    debug!(kind = %kind, position, "section closed");
                    self.state = State::TopLevel;
                }
                Line::SectionBegin(_) => {
                    return Err(XorgError::parse_at(
                        line_no,
                        "Sections cannot be nested in other sections",
                    ));
                }
                Line::SubSectionEnd => {
                    return Err(XorgError::parse_at(
                        line_no,
                        "SubSections can be closed only after being opened",
                    ));
                }
                Line::Blank => {}
            },

            State::InSubSection { kind, position, id } => match line {
                Line::Comment(text) => {
                    self.document
                        .push_comment(CommentTarget::subsection(kind, position, id), text.trim());
                }
                Line::Option(text) => {
                    if let Some(sub) = self.document.subsection_mut(id) {
                        sub.options.push(text);
                    }
                }
                Line::SubSectionEnd => self.state = State::InSection { kind, position },
                Line::SubSectionBegin(_) => {
                    return Err(XorgError::parse_at(line_no, "SubSections cannot be nested"));
                }
                Line::SectionBegin(_) => {
                    return Err(XorgError::parse_at(
                        line_no,
                        "Sections cannot be nested in other sections",
                    ));
                }
                Line::SectionEnd => {
                    return Err(XorgError::parse_at(
                        line_no,
                        "EndSection found before EndSubSection",
                    ));
                }
                Line::Blank => {}
            },
        }

        Ok(())
    }
}

/// The identifier of a section whose kind requires one
///
/// Fails unless the section has exactly one non-empty `Identifier` line.
pub(crate) fn section_identifier(
    document: &Document,
    kind: SectionKind,
    position: usize,
) -> XorgResult<String> {
    let section = document
        .section(kind, position)
        .ok_or_else(|| XorgError::section(kind.name(), Some(position)))?;

    let empty = IdentifierIndex::new();
    let extractor = Extractor::new(&empty);
    let mut found = Vec::new();

    for line in &section.options {
        let tokens = XorgParser::tokenize_option(line)?;
        if tokens
            .keyword()
            .is_some_and(|k| k.eq_ignore_ascii_case("identifier"))
        {
            found.push(extractor.extract(&tokens, "Identifier", Some(kind)));
        }
    }

    match found.as_slice() {
        [] => Err(XorgError::parse(format!(
            "No Identifier in {} section {}",
            kind, position
        ))),
        [value] => match value {
            OptionValue::Absent => Err(XorgError::parse(format!(
                "Empty Identifier in {} section {}",
                kind, position
            ))),
            value => {
                let identifier = value.first().unwrap_or_default().trim();
                if identifier.is_empty() {
                    Err(XorgError::parse(format!(
                        "Empty Identifier in {} section {}",
                        kind, position
                    )))
                } else {
                    Ok(identifier.to_string())
                }
            }
        },
        _ => Err(XorgError::parse(format!(
            "More than one Identifier in {} section {}",
            kind, position
        ))),
    }
}

/// Build the identifier index of every section that requires one
pub(crate) fn index_identifiers(document: &Document) -> XorgResult<IdentifierIndex> {
    let mut index = IdentifierIndex::new();

    for kind in SectionKind::IDENTIFIED {
        for position in document.positions(kind) {
            let identifier = section_identifier(document, kind, position)?;
            index.insert(kind, identifier, position);
        }
    }

    debug!(entries = index.len(), "identifiers indexed");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(input: &str) -> XorgResult<Document> {
        Loader::new().load(input)
    }

    #[test]
    fn test_positions_count_per_kind() {
        let doc = load(
            "Section \"Device\"\nIdentifier \"a\"\nEndSection\n\
             Section \"Screen\"\nIdentifier \"s\"\nEndSection\n\
             Section \"Device\"\nIdentifier \"b\"\nEndSection\n",
        )
        .unwrap();

        assert_eq!(doc.positions(SectionKind::Device), vec![0, 1]);
        assert_eq!(doc.positions(SectionKind::Screen), vec![0]);
        assert_eq!(doc.kinds(), &[SectionKind::Device, SectionKind::Screen]);
    }

    #[test]
    fn test_options_and_comments_are_trimmed() {
        let doc = load("# top\nSection \"Module\"\n    Load  \"glx\"  \n   # note\nEndSection\n").unwrap();

        assert_eq!(doc.top_comments(), &["# top".to_string()]);
        let module = doc.section(SectionKind::Module, 0).unwrap();
        assert_eq!(module.options, vec!["Load  \"glx\"".to_string()]);
        assert_eq!(
            doc.comments(&CommentTarget::section(SectionKind::Module, 0)),
            &["# note".to_string()]
        );
    }

    #[test]
    fn test_empty_section_is_kept() {
        let doc = load("Section \"Extensions\"\nEndSection\n").unwrap();
        assert!(doc.has_section(SectionKind::Extensions, 0));
    }

    #[test]
    fn test_subsection_lines() {
        let doc = load(
            "Section \"Screen\"\nIdentifier \"s\"\nSubSection \"Display\"\nDepth 24\n# sub note\nEndSubSection\nEndSection\n",
        )
        .unwrap();

        let ids = doc.subsections_of(SectionKind::Screen, 0);
        assert_eq!(ids.len(), 1);
        let sub = doc.subsection(ids[0]).unwrap();
        assert_eq!(sub.identifier, "Display");
        assert_eq!(sub.options, vec!["Depth 24".to_string()]);
        assert_eq!(
            doc.comments(&CommentTarget::subsection(SectionKind::Screen, 0, ids[0])),
            &["# sub note".to_string()]
        );
    }

    #[test]
    fn test_structural_errors_carry_line_numbers() {
        let err = load("Section \"Device\"\nSection \"Screen\"\n").unwrap_err();
        assert_eq!(err, XorgError::parse_at(2, "Sections cannot be nested in other sections"));

        let err = load("Driver \"nv\"\n").unwrap_err();
        assert!(matches!(err, XorgError::Parse { line: Some(1), .. }));

        let err = load("\nEndSubSection\n").unwrap_err();
        assert!(matches!(err, XorgError::Parse { line: Some(2), .. }));
    }

    #[test]
    fn test_unterminated_section() {
        let err = load("Section \"Device\"\nIdentifier \"x\"\n").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_identifier_rules() {
        let doc = load("Section \"Device\"\nDriver \"nv\"\nEndSection\n").unwrap();
        assert!(index_identifiers(&doc).unwrap_err().is_parse());

        let doc = load("Section \"Device\"\nIdentifier \"a\"\nIdentifier \"b\"\nEndSection\n").unwrap();
        assert!(index_identifiers(&doc).is_err());

        let doc = load("Section \"Device\"\nIdentifier \"\"\nEndSection\n").unwrap();
        assert!(index_identifiers(&doc).is_err());

        let doc = load("Section \"Device\"\nIdentifier \"card0\"\nEndSection\n").unwrap();
        let index = index_identifiers(&doc).unwrap();
        assert_eq!(index.position_of(SectionKind::Device, "CARD0"), Some(0));
    }

    #[test]
    fn test_unidentified_kinds_are_not_indexed() {
        let doc = load("Section \"Files\"\nModulePath \"/usr/lib\"\nEndSection\n").unwrap();
        assert!(index_identifiers(&doc).unwrap().is_empty());
    }
}
