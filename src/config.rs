use crate::document::{CommentTarget, Document, Section, SubSection, SubSectionId};
use crate::error::{XorgError, XorgResult};
use crate::extract::{Extractor, merge};
use crate::identifiers::IdentifierIndex;
use crate::loader::{Loader, index_identifiers};
use crate::parser::XorgParser;
use crate::types::{OptionValue, SectionKind, SectionSelector, eq_ignore_case};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Main configuration manager
#[derive(Debug, Clone, Default)]
pub struct XorgConfig {
    /// Sections, subsections and comments
    pub(crate) document: Document,

    /// Identifier index, in lock-step with `document`
    pub(crate) identifiers: IdentifierIndex,

    /// Parser options
    pub(crate) options: ParserOptions,
}

/// Parser options
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Run the compliance checker after loading a non-empty source
    pub check_compliance: bool,

    /// Also fail the compliance check on duplicate options
    pub reject_duplicate_options: bool,

    /// Option keywords allowed to stand alone on a line
    pub option_whitelist: Vec<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            check_compliance: true,
            reject_duplicate_options: false,
            option_whitelist: vec!["EndMode".to_string()],
        }
    }
}

/// Where to read an xorg.conf from
pub enum Source<'a> {
    /// A file on disk
    Path(&'a Path),
    /// An already opened reader
    Reader(&'a mut dyn Read),
    /// The text itself
    Text(&'a str),
}

impl<'a> From<&'a Path> for Source<'a> {
    fn from(path: &'a Path) -> Self {
        Source::Path(path)
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Text(text)
    }
}

impl XorgConfig {
    /// Create an empty configuration with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty configuration with custom options
    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Load a configuration from any [`Source`]
    pub fn load<'a>(&mut self, source: impl Into<Source<'a>>) -> XorgResult<()> {
        match source.into() {
            Source::Path(path) => self.parse_file(path),
            Source::Reader(reader) => self.parse_reader(reader),
            Source::Text(text) => self.parse(text),
        }
    }

    /// Parse a file
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()), level = "debug")]
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> XorgResult<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| XorgError::io(path.display().to_string(), e.to_string()))?;

        self.parse(&content)
    }

    /// Parse everything a reader yields
    pub fn parse_reader(&mut self, reader: &mut dyn Read) -> XorgResult<()> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| XorgError::io("<reader>", e.to_string()))?;

        self.parse(&content)
    }

    /// Parse configuration text
    ///
    /// Replaces the current model. On error the previous model is kept.
    #[instrument(skip(self, input), fields(bytes = input.len()), level = "debug")]
    pub fn parse(&mut self, input: &str) -> XorgResult<()> {
        let document = Loader::new().load(input)?;
        let identifiers = index_identifiers(&document)?;

        let candidate = XorgConfig {
            document,
            identifiers,
            options: self.options.clone(),
        };

        if self.options.check_compliance && !candidate.document.is_empty() {
            candidate.check_compliance()?;
        }

        debug!(kinds = candidate.document.kinds().len(), "configuration loaded");
        *self = candidate;
        Ok(())
    }

    /// The underlying document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The identifier index
    pub fn identifiers(&self) -> &IdentifierIndex {
        &self.identifiers
    }

    pub fn sections(&self, kind: SectionKind) -> impl Iterator<Item = &Section> {
        self.document.sections(kind)
    }

    pub fn section(&self, kind: SectionKind, position: usize) -> Option<&Section> {
        self.document.section(kind, position)
    }

    pub fn positions(&self, kind: SectionKind) -> Vec<usize> {
        self.document.positions(kind)
    }

    pub fn subsection(&self, id: SubSectionId) -> Option<&SubSection> {
        self.document.subsection(id)
    }

    /// Subsections of the section at `position`
    pub fn get_subsections(&self, kind: SectionKind, position: usize) -> XorgResult<Vec<SubSectionId>> {
        self.require_section(kind, position)?;
        Ok(self.document.subsections_of(kind, position))
    }

    /// Comment lines attached to a section, or to one of its subsections
    pub fn comments(&self, target: &CommentTarget) -> &[String] {
        self.document.comments(target)
    }

    pub fn top_comments(&self) -> &[String] {
        self.document.top_comments()
    }

    pub(crate) fn require_section(&self, kind: SectionKind, position: usize) -> XorgResult<&Section> {
        self.document
            .section(kind, position)
            .ok_or_else(|| XorgError::section(kind.name(), Some(position)))
    }

    /// Value of an option in a section
    ///
    /// Several matching lines are merged into a list.
    pub fn get_value(&self, kind: SectionKind, name: &str, position: usize) -> XorgResult<OptionValue> {
        self.lookup(kind, name, position, false)
    }

    /// Value of a reference to another section, e.g. `Device` in a `Screen`
    ///
    /// Only lines starting with `name` match; `Option "Name"` lines are skipped.
    pub fn get_reference_value(
        &self,
        kind: SectionKind,
        name: &str,
        position: usize,
    ) -> XorgResult<OptionValue> {
        self.lookup(kind, name, position, true)
    }

    fn lookup(&self, kind: SectionKind, name: &str, position: usize, reference: bool) -> XorgResult<OptionValue> {
        let section = self.require_section(kind, position)?;

        Extractor::new(&self.identifiers)
            .scan(&section.options, name, Some(kind), reference)?
            .ok_or_else(|| XorgError::option(kind.name(), name, position))
    }

    /// Value of an option in a subsection
    ///
    /// All subsections named `subsection` in the section are scanned.
    pub fn get_sub_value(
        &self,
        parent: SectionKind,
        subsection: &str,
        name: &str,
        position: usize,
    ) -> XorgResult<OptionValue> {
        self.require_section(parent, position)?;

        let ids = self.document.find_subsections(parent, subsection, Some(position));
        if ids.is_empty() {
            return Err(XorgError::section(
                format!("{} SubSection \"{}\"", parent, subsection),
                Some(position),
            ));
        }

        let extractor = Extractor::new(&self.identifiers);
        let mut found = Vec::new();
        for id in ids {
            let Some(sub) = self.document.subsection(id) else {
                continue;
            };
            for line in &sub.options {
                let tokens = XorgParser::tokenize_option(line)?;
                if Extractor::matches(&tokens, name, false) {
                    found.push(extractor.extract(&tokens, name, None));
                }
            }
        }

        merge(found).ok_or_else(|| XorgError::option(format!("{} SubSection", parent), name, position))
    }

    /// Whether a section exists
    pub fn is_section(&self, kind: SectionKind, selector: SectionSelector<'_>) -> bool {
        match selector {
            SectionSelector::All => self.document.section_count(kind) > 0,
            SectionSelector::Identifier(identifier) => self.find_by_identifier(kind, identifier).is_some(),
            SectionSelector::Position(position) => self.document.has_section(kind, position),
        }
    }

    /// Position of the section with the given identifier
    pub fn get_position(&self, kind: SectionKind, identifier: &str) -> XorgResult<usize> {
        self.find_by_identifier(kind, identifier).ok_or_else(|| {
            XorgError::identifier(format!("No {} section named \"{}\"", kind, identifier))
        })
    }

    /// Identifier of the section at `position`
    pub fn get_identifier(&self, kind: SectionKind, position: usize) -> XorgResult<String> {
        if let Some(identifier) = self.identifiers.identifier_at(kind, position) {
            return Ok(identifier.to_string());
        }

        let section = self.document.section(kind, position).ok_or_else(|| {
            XorgError::identifier(format!("No {} section at position {}", kind, position))
        })?;

        Extractor::new(&self.identifiers)
            .scan(&section.options, "Identifier", Some(kind), true)?
            .and_then(|value| value.first().map(str::to_string))
            .filter(|identifier| !identifier.trim().is_empty())
            .ok_or_else(|| {
                XorgError::identifier(format!("{} section {} has no Identifier", kind, position))
            })
    }

    /// Position lookup covering kinds outside the identifier index
    pub(crate) fn find_by_identifier(&self, kind: SectionKind, identifier: &str) -> Option<usize> {
        if kind.requires_identifier() {
            return self.identifiers.position_of(kind, identifier);
        }

        let wanted = identifier.trim();
        self.document.positions(kind).into_iter().find(|&position| {
            self.get_identifier(kind, position)
                .is_ok_and(|found| eq_ignore_case(found.trim(), wanted))
        })
    }

    /// References held by a section, per referenced kind
    ///
    /// `kinds` defaults to every kind that requires an identifier. Numeric
    /// references that do not resolve are left out.
    pub fn get_references(
        &self,
        kind: SectionKind,
        position: usize,
        kinds: Option<&[SectionKind]>,
    ) -> XorgResult<BTreeMap<SectionKind, Vec<String>>> {
        let section = self.require_section(kind, position)?;
        let extractor = Extractor::new(&self.identifiers);
        let kinds = kinds.unwrap_or(&SectionKind::IDENTIFIED);

        let mut references = BTreeMap::new();
        for &reference in kinds {
            let mut found: Vec<String> = Vec::new();
            if let Some(value) = extractor.scan(&section.options, reference.name(), Some(kind), true)? {
                for identifier in value.into_values() {
                    if !found.iter().any(|f| eq_ignore_case(f, &identifier)) {
                        found.push(identifier);
                    }
                }
            }
            references.insert(reference, found);
        }

        Ok(references)
    }

    /// Render the configuration as xorg.conf text
    pub fn serialize(&self) -> String {
        self.document.serialize()
    }

    /// Write the rendered configuration to a writer
    pub fn write_to(&self, writer: &mut dyn Write) -> XorgResult<()> {
        writer
            .write_all(self.serialize().as_bytes())
            .map_err(|e| XorgError::io("<writer>", e.to_string()))
    }

    /// Write the configuration to a file, replacing its content
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()), level = "debug")]
    pub fn save_as(&self, path: impl AsRef<Path>) -> XorgResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.serialize())
            .map_err(|e| XorgError::io(path.display().to_string(), e.to_string()))?;

        info!(path = %path.display(), "configuration written");
        Ok(())
    }

    /// Append the configuration to a file, creating it if needed
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()), level = "debug")]
    pub fn save_append(&self, path: impl AsRef<Path>) -> XorgResult<()> {
        let path = path.as_ref();
        let io_error = |e: std::io::Error| XorgError::io(path.display().to_string(), e.to_string());

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        file.write_all(self.serialize().as_bytes()).map_err(io_error)?;

        info!(path = %path.display(), "configuration appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# sample
Section "Device"
    Identifier "dev0"
    Driver "nvidia"
    Option "AddARGBGLXVisuals"
EndSection

Section "Screen"
    Identifier "scr0"
    Device "dev0"
    SubSection "Display"
        Depth 24
        Modes "1024x768"
    EndSubSection
EndSection

Section "ServerLayout"
    Identifier "layout0"
    Screen 0
    InputDevice "stylus" "SendCoreEvents"
EndSection

Section "InputDevice"
    Identifier "stylus"
    Option "Device" "/dev/input/wacom"
EndSection
"#;

    fn sample() -> XorgConfig {
        let mut config = XorgConfig::new();
        config.parse(SAMPLE).unwrap();
        config
    }

    #[test]
    fn test_get_value() {
        let config = sample();
        assert_eq!(
            config.get_value(SectionKind::Device, "driver", 0).unwrap(),
            OptionValue::Scalar("nvidia".to_string())
        );
        assert_eq!(
            config.get_value(SectionKind::Device, "AddARGBGLXVisuals", 0).unwrap(),
            OptionValue::Scalar("True".to_string())
        );
    }

    #[test]
    fn test_get_value_errors() {
        let config = sample();
        assert!(config.get_value(SectionKind::Device, "Driver", 3).unwrap_err().is_section());
        assert!(config.get_value(SectionKind::Device, "BusID", 0).unwrap_err().is_option());
    }

    #[test]
    fn test_numeric_screen_reference() {
        let config = sample();
        let refs = config.get_references(SectionKind::ServerLayout, 0, None).unwrap();
        assert_eq!(refs[&SectionKind::Screen], vec!["scr0".to_string()]);
        assert_eq!(refs[&SectionKind::InputDevice], vec!["stylus".to_string()]);
        assert!(refs[&SectionKind::Device].is_empty());
    }

    #[test]
    fn test_reference_lookup_skips_option_lines() {
        let config = sample();
        assert!(config
            .get_reference_value(SectionKind::InputDevice, "Device", 0)
            .unwrap_err()
            .is_option());
        assert_eq!(
            config.get_value(SectionKind::InputDevice, "Device", 0).unwrap(),
            OptionValue::Scalar("/dev/input/wacom".to_string())
        );
    }

    #[test]
    fn test_sub_value() {
        let config = sample();
        assert_eq!(
            config.get_sub_value(SectionKind::Screen, "display", "Depth", 0).unwrap(),
            OptionValue::Scalar("24".to_string())
        );
        assert!(config.get_sub_value(SectionKind::Screen, "Other", "Depth", 0).unwrap_err().is_section());
        assert!(config.get_sub_value(SectionKind::Screen, "Display", "Visual", 0).unwrap_err().is_option());
    }

    #[test]
    fn test_identifier_lookups() {
        let config = sample();
        assert_eq!(config.get_position(SectionKind::Screen, "SCR0").unwrap(), 0);
        assert!(config.get_position(SectionKind::Screen, "nope").unwrap_err().is_identifier());
        assert_eq!(config.get_identifier(SectionKind::Device, 0).unwrap(), "dev0");
        assert!(config.get_identifier(SectionKind::Device, 9).unwrap_err().is_identifier());

        assert!(config.is_section(SectionKind::Device, SectionSelector::Identifier("dev0")));
        assert!(config.is_section(SectionKind::Device, SectionSelector::Position(0)));
        assert!(!config.is_section(SectionKind::Monitor, SectionSelector::All));
    }

    #[test]
    fn test_failed_parse_keeps_previous_model() {
        let mut config = sample();
        let before = config.serialize();

        assert!(config.parse("Section \"Device\"\n").is_err());
        assert_eq!(config.serialize(), before);
    }

    #[test]
    fn test_load_from_reader() {
        let mut reader = std::io::Cursor::new(SAMPLE.as_bytes().to_vec());
        let mut config = XorgConfig::new();
        config.load(Source::Reader(&mut reader)).unwrap();
        assert_eq!(config.positions(SectionKind::Device), vec![0]);
    }

    #[test]
    fn test_write_to() {
        let config = sample();
        let mut out = Vec::new();
        config.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), config.serialize());
    }
}
