//! Editing operations on a loaded configuration.
//!
//! Every operation checks everything that can fail before touching the
//! document, so a failed call leaves the configuration as it was.
//! Referential consistency (broken references, ServerLayouts without a
//! Screen) is not enforced while editing; use
//! [`XorgConfig::get_broken_references`] or [`XorgConfig::check_compliance`].

use crate::config::XorgConfig;
use crate::document::{CommentTarget, SubSectionId};
use crate::error::{XorgError, XorgResult};
use crate::extract::Extractor;
use crate::parser::{OptionTokens, XorgParser};
use crate::types::{OptionType, Quote, SectionKind, SectionSelector, eq_ignore_case};
use tracing::{debug, warn};

const DEFAULT_LAYOUT: &str = "DefaultServerLayout";

/// How [`XorgConfig::add_option`] renders and places a line
///
/// # Example
///
/// ```rust
/// use xorgconf::AddOptions;
///
/// let options = AddOptions::new().option().at(0);
/// assert_eq!(options.position, Some(0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// `Name "value"` or `Option "Name" "value"`
    pub option_type: OptionType,

    /// Target section; every section of the kind when `None`
    pub position: Option<usize>,

    /// The value names another section
    pub reference: bool,

    /// Quoting around the value
    pub quote: Quote,
}

impl AddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only apply to the section at `position`
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Render as `Option "Name" "value"`
    pub fn option(mut self) -> Self {
        self.option_type = OptionType::Option;
        self
    }

    /// Treat the value as a reference to another section
    pub fn reference(mut self) -> Self {
        self.reference = true;
        self
    }

    /// Leave the value unquoted
    pub fn unquoted(mut self) -> Self {
        self.quote = Quote::None;
        self
    }
}

impl XorgConfig {
    /// Set an option in one or every section of a kind
    ///
    /// Existing lines for the same option are replaced; for references only
    /// the line naming the same section is. When the kind has no section yet,
    /// one is created.
    pub fn add_option(&mut self, kind: SectionKind, name: &str, value: &str, opts: AddOptions) -> XorgResult<()> {
        if let Some(position) = opts.position {
            self.require_section(kind, position)?;
        }

        if kind.requires_identifier() && opts.option_type == OptionType::Plain && is_identifier(name) {
            return self.set_identifiers(kind, value, opts.position);
        }

        let line = render_option(kind, name, value, &opts);
        self.check_new_line(&line, name, opts.option_type, kind != SectionKind::Files)?;

        let positions = match opts.position {
            Some(position) => vec![position],
            None => self.document.positions(kind),
        };

        let mut plan = Vec::with_capacity(positions.len());
        for position in positions {
            if let Some(section) = self.document.section(kind, position) {
                let hits = same_option_hits(&section.options, name, value, &opts)?;
                plan.push((position, hits));
            }
        }

        if plan.is_empty() {
            let position = self.create_default_section(kind);
            plan.push((position, Vec::new()));
        }

        for (position, hits) in plan {
            if let Some(section) = self.document.section_mut(kind, position) {
                let (_, mut kept) = split_lines(std::mem::take(&mut section.options), &hits);
                kept.push(line.clone());
                section.options = kept;
            }
        }

        debug!(kind = %kind, option = name, "option set");
        Ok(())
    }

    /// Remove the option lines containing `name`, ignoring case
    ///
    /// With `value`, lines must contain it too. Returns the number of lines removed.
    pub fn remove_option(
        &mut self,
        kind: SectionKind,
        name: &str,
        value: Option<&str>,
        position: Option<usize>,
    ) -> XorgResult<usize> {
        let removed = self.take_options(kind, name, value, position)?;
        Ok(removed.iter().map(|(_, lines)| lines.len()).sum())
    }

    /// Move the option lines containing `name` into the section's comments
    pub fn comment_out_option(
        &mut self,
        kind: SectionKind,
        name: &str,
        value: Option<&str>,
        position: Option<usize>,
    ) -> XorgResult<usize> {
        let removed = self.take_options(kind, name, value, position)?;
        let mut count = 0;

        for (position, lines) in removed {
            for line in lines {
                self.document
                    .push_comment(CommentTarget::section(kind, position), format!("#{}", line));
                count += 1;
            }
        }

        Ok(count)
    }

    /// Add a reference to another section, e.g. `Device "card0"` in a Screen
    pub fn add_reference(
        &mut self,
        kind: SectionKind,
        referenced: SectionKind,
        identifier: &str,
        position: Option<usize>,
    ) -> XorgResult<()> {
        let mut opts = AddOptions::new().reference();
        opts.position = position;
        self.add_option(kind, referenced.name(), identifier, opts)
    }

    /// Remove a reference to another section
    pub fn remove_reference(
        &mut self,
        kind: SectionKind,
        referenced: SectionKind,
        identifier: &str,
        position: Option<usize>,
    ) -> XorgResult<usize> {
        self.remove_option(kind, referenced.name(), Some(identifier), position)
    }

    /// Create a section and return its position
    ///
    /// Kinds that require an identifier need one. If a section with the same
    /// identifier already exists, its position is returned instead.
    pub fn make_section(&mut self, kind: SectionKind, identifier: Option<&str>) -> XorgResult<usize> {
        let identifier = identifier.map(str::trim).filter(|i| !i.is_empty());

        if kind.requires_identifier() && identifier.is_none() {
            return Err(XorgError::identifier(format!(
                "{} sections require an identifier",
                kind
            )));
        }

        if let Some(identifier) = identifier {
            if let Some(position) = self.find_by_identifier(kind, identifier) {
                return Ok(position);
            }
        }

        let position = self.document.next_position(kind);
        let options = identifier
            .map(|i| vec![identifier_line(i)])
            .unwrap_or_default();
        self.document.insert_section(kind, position, options);

        if let Some(identifier) = identifier.filter(|_| kind.requires_identifier()) {
            self.identifiers.insert(kind, identifier, position);
        }

        debug!(kind = %kind, position, "section created");
        Ok(position)
    }

    /// Remove sections, with their subsections and comments
    ///
    /// Returns the number of sections removed.
    pub fn remove_section(&mut self, kind: SectionKind, selector: SectionSelector<'_>) -> usize {
        let positions = self.select_positions(kind, selector);
        if positions.is_empty() {
            warn!(kind = %kind, ?selector, "no section to remove");
        }

        for &position in &positions {
            self.document.remove_section(kind, position);
            self.identifiers.remove(kind, position);
            debug!(kind = %kind, position, "section removed");
        }

        positions.len()
    }

    /// Move sections into the top-level comments, then remove them
    pub fn comment_out_section(&mut self, kind: SectionKind, selector: SectionSelector<'_>) -> usize {
        let positions = self.select_positions(kind, selector);
        if positions.is_empty() {
            warn!(kind = %kind, ?selector, "no section to comment out");
        }

        for &position in &positions {
            for line in self.commented_section(kind, position) {
                self.document.push_top_comment(line);
            }
            self.document.remove_section(kind, position);
            self.identifiers.remove(kind, position);
            debug!(kind = %kind, position, "section commented out");
        }

        positions.len()
    }

    /// Rename a section, rewriting the references other sections hold to it
    pub fn rename_section(&mut self, kind: SectionKind, position: usize, identifier: &str) -> XorgResult<()> {
        self.require_section(kind, position)?;
        if !kind.requires_identifier() {
            return Err(XorgError::identifier(format!("{} sections are not identified", kind)));
        }

        let old = self.get_identifier(kind, position)?;
        let new = identifier.trim();
        self.check_identifier(kind, position, new)?;

        let mut rewrites = Vec::new();
        for other in SectionKind::IDENTIFIED {
            rewrites.extend(self.reference_rewrites(other, &old, new, |tokens| {
                Extractor::matches(tokens, kind.name(), true).then_some(0)
            })?);
        }
        if kind == SectionKind::ServerLayout {
            rewrites.extend(self.reference_rewrites(SectionKind::ServerFlags, &old, new, |tokens| {
                Extractor::matches(tokens, DEFAULT_LAYOUT, false).then(|| usize::from(tokens.is_option_form()))
            })?);
        }

        self.set_identifier(kind, position, new)?;
        for (other, at, index, line) in rewrites {
            if let Some(slot) = self
                .document
                .section_mut(other, at)
                .and_then(|s| s.options.get_mut(index))
            {
                *slot = line;
            }
        }

        debug!(kind = %kind, position, from = %old, to = new, "section renamed");
        Ok(())
    }

    /// Create a subsection in one or every section of a kind
    ///
    /// Existing subsections with the same identifier are reused. Returns the
    /// handles of the subsections, new or not.
    pub fn make_subsection(
        &mut self,
        kind: SectionKind,
        identifier: &str,
        position: Option<usize>,
    ) -> XorgResult<Vec<SubSectionId>> {
        let identifier = identifier.trim();
        let positions = self.target_positions(kind, position)?;
        if positions.is_empty() {
            warn!(kind = %kind, subsection = identifier, "no section to hold the subsection");
        }

        let mut ids = Vec::with_capacity(positions.len());
        for position in positions {
            let existing = self.document.find_subsections(kind, identifier, Some(position));
            match existing.first() {
                Some(id) => ids.push(*id),
                None => {
                    ids.push(self.document.add_subsection(kind, position, identifier));
                    debug!(kind = %kind, position, subsection = identifier, "subsection created");
                }
            }
        }

        Ok(ids)
    }

    /// Remove matching subsections, returning how many were removed
    pub fn remove_subsection(&mut self, kind: SectionKind, identifier: &str, position: Option<usize>) -> usize {
        let ids = self.document.find_subsections(kind, identifier, position);
        for &id in &ids {
            self.document.remove_subsection(id);
        }
        ids.len()
    }

    /// Move matching subsections into their section's comments
    pub fn comment_out_subsection(&mut self, kind: SectionKind, identifier: &str, position: Option<usize>) -> usize {
        let ids = self.document.find_subsections(kind, identifier, position);

        for &id in &ids {
            let Some(sub) = self.document.subsection(id) else {
                continue;
            };
            let target = CommentTarget::section(sub.parent, sub.position);

            let mut lines = vec![format!("#SubSection \"{}\"", sub.identifier)];
            lines.extend(sub.options.iter().map(|o| format!("#\t{}", o)));
            lines.extend(
                self.document
                    .comments(&CommentTarget::subsection(sub.parent, sub.position, id))
                    .iter()
                    .map(|c| format!("#\t{}", c)),
            );
            lines.push("#EndSubSection".to_string());

            for line in lines {
                self.document.push_comment(target, line);
            }
            self.document.remove_subsection(id);
        }

        ids.len()
    }

    /// Set an option in the matching subsections, creating them when missing
    ///
    /// `opts.reference` is ignored.
    pub fn add_sub_option(
        &mut self,
        kind: SectionKind,
        identifier: &str,
        name: &str,
        value: &str,
        opts: AddOptions,
    ) -> XorgResult<()> {
        let opts = AddOptions {
            reference: false,
            ..opts
        };
        let line = render_option(kind, name, value, &opts);
        self.check_new_line(&line, name, opts.option_type, true)?;

        let positions = self.target_positions(kind, opts.position)?;
        if positions.is_empty() {
            return Err(XorgError::section(kind.name(), None));
        }

        let mut plan = Vec::new();
        for position in positions {
            let ids = self.document.find_subsections(kind, identifier, Some(position));
            if ids.is_empty() {
                plan.push((position, None, Vec::new()));
            }
            for id in ids {
                if let Some(sub) = self.document.subsection(id) {
                    plan.push((position, Some(id), same_option_hits(&sub.options, name, value, &opts)?));
                }
            }
        }

        for (position, id, hits) in plan {
            let id = match id {
                Some(id) => id,
                None => self.document.add_subsection(kind, position, identifier.trim()),
            };
            if let Some(sub) = self.document.subsection_mut(id) {
                let (_, mut kept) = split_lines(std::mem::take(&mut sub.options), &hits);
                kept.push(line.clone());
                sub.options = kept;
            }
        }

        debug!(kind = %kind, subsection = identifier, option = name, "suboption set");
        Ok(())
    }

    /// Remove subsection option lines containing `name`, ignoring case
    pub fn remove_sub_option(
        &mut self,
        kind: SectionKind,
        identifier: &str,
        name: &str,
        position: Option<usize>,
    ) -> usize {
        self.take_sub_options(kind, identifier, name, position)
            .iter()
            .map(|(_, lines)| lines.len())
            .sum()
    }

    /// Move subsection option lines containing `name` into the subsection's comments
    pub fn comment_out_sub_option(
        &mut self,
        kind: SectionKind,
        identifier: &str,
        name: &str,
        position: Option<usize>,
    ) -> usize {
        let mut count = 0;

        for (id, lines) in self.take_sub_options(kind, identifier, name, position) {
            let Some(sub) = self.document.subsection(id) else {
                continue;
            };
            let target = CommentTarget::subsection(sub.parent, sub.position, id);
            for line in lines {
                self.document.push_comment(target, format!("#{}", line));
                count += 1;
            }
        }

        count
    }

    fn take_options(
        &mut self,
        kind: SectionKind,
        name: &str,
        value: Option<&str>,
        position: Option<usize>,
    ) -> XorgResult<Vec<(usize, Vec<String>)>> {
        if kind.requires_identifier() && is_identifier(name) {
            return Err(XorgError::parse(format!(
                "The Identifier of a {} section cannot be removed",
                kind
            )));
        }

        let positions = match position {
            Some(p) if !self.document.has_section(kind, p) => {
                warn!(kind = %kind, position = p, "no such section");
                Vec::new()
            }
            Some(p) => vec![p],
            None => self.document.positions(kind),
        };

        let mut plan = Vec::with_capacity(positions.len());
        for position in positions {
            let Some(section) = self.document.section(kind, position) else {
                continue;
            };
            let mut hits = Vec::with_capacity(section.options.len());
            for line in &section.options {
                let protected = kind.requires_identifier() && is_identifier_line(line)?;
                hits.push(!protected && contains_ignore_case(line, name) && value.is_none_or(|v| contains_ignore_case(line, v)));
            }
            plan.push((position, hits));
        }

        let mut removed = Vec::new();
        for (position, hits) in plan {
            if let Some(section) = self.document.section_mut(kind, position) {
                let (gone, kept) = split_lines(std::mem::take(&mut section.options), &hits);
                section.options = kept;
                if !gone.is_empty() {
                    debug!(kind = %kind, position, lines = gone.len(), "options removed");
                    removed.push((position, gone));
                }
            }
        }

        Ok(removed)
    }

    fn take_sub_options(
        &mut self,
        kind: SectionKind,
        identifier: &str,
        name: &str,
        position: Option<usize>,
    ) -> Vec<(SubSectionId, Vec<String>)> {
        let mut removed = Vec::new();

        for id in self.document.find_subsections(kind, identifier, position) {
            if let Some(sub) = self.document.subsection_mut(id) {
                let hits: Vec<bool> = sub.options.iter().map(|l| contains_ignore_case(l, name)).collect();
                let (gone, kept) = split_lines(std::mem::take(&mut sub.options), &hits);
                sub.options = kept;
                if !gone.is_empty() {
                    removed.push((id, gone));
                }
            }
        }

        removed
    }

    fn set_identifiers(&mut self, kind: SectionKind, value: &str, position: Option<usize>) -> XorgResult<()> {
        let positions = match position {
            Some(position) => vec![position],
            None => self.document.positions(kind),
        };

        match positions.as_slice() {
            [] => self.make_section(kind, Some(value)).map(|_| ()),
            [position] => {
                self.check_identifier(kind, *position, value.trim())?;
                self.set_identifier(kind, *position, value.trim())
            }
            _ => Err(XorgError::parse(format!(
                "{} sections cannot share the identifier \"{}\"",
                kind,
                value.trim()
            ))),
        }
    }

    /// Lines of `holder` sections whose quoted `old` reference becomes `new`
    ///
    /// `matcher` accepts a line by returning how many leading quoted runs are
    /// names rather than references.
    fn reference_rewrites(
        &self,
        holder: SectionKind,
        old: &str,
        new: &str,
        matcher: impl Fn(&OptionTokens) -> Option<usize>,
    ) -> XorgResult<Vec<(SectionKind, usize, usize, String)>> {
        let mut rewrites = Vec::new();

        for section in self.document.sections(holder) {
            for (index, line) in section.options.iter().enumerate() {
                let tokens = XorgParser::tokenize_option(line)?;
                let Some(skip) = matcher(&tokens) else {
                    continue;
                };
                if tokens.quoted_tokens().skip(skip).any(|t| eq_ignore_case(t.trim(), old)) {
                    rewrites.push((holder, section.position, index, replace_quoted(line, old, new, skip)));
                }
            }
        }

        Ok(rewrites)
    }

    fn check_identifier(&self, kind: SectionKind, position: usize, identifier: &str) -> XorgResult<()> {
        if identifier.is_empty() {
            return Err(XorgError::parse(format!("Empty Identifier for {} section {}", kind, position)));
        }

        match self.identifiers.position_of(kind, identifier) {
            Some(other) if other != position => Err(XorgError::parse(format!(
                "A {} section named \"{}\" already exists",
                kind, identifier
            ))),
            _ => Ok(()),
        }
    }

    /// Replace the Identifier line of a section and update the index
    fn set_identifier(&mut self, kind: SectionKind, position: usize, identifier: &str) -> XorgResult<()> {
        let section = self
            .document
            .section(kind, position)
            .ok_or_else(|| XorgError::section(kind.name(), Some(position)))?;

        let mut hits = Vec::with_capacity(section.options.len());
        for line in &section.options {
            hits.push(is_identifier_line(line)?);
        }
        let at = hits.iter().position(|h| *h).unwrap_or(0);

        if let Some(section) = self.document.section_mut(kind, position) {
            let (_, mut kept) = split_lines(std::mem::take(&mut section.options), &hits);
            kept.insert(at.min(kept.len()), identifier_line(identifier));
            section.options = kept;
        }
        self.identifiers.insert(kind, identifier, position);

        Ok(())
    }

    fn create_default_section(&mut self, kind: SectionKind) -> usize {
        let position = self.document.next_position(kind);
        let mut options = Vec::new();

        if kind.requires_identifier() {
            let identifier = format!("Default {}", kind);
            options.push(identifier_line(&identifier));
            self.identifiers.insert(kind, identifier, position);
        }

        self.document.insert_section(kind, position, options);
        debug!(kind = %kind, position, "default section created");
        position
    }

    fn select_positions(&self, kind: SectionKind, selector: SectionSelector<'_>) -> Vec<usize> {
        match selector {
            SectionSelector::All => self.document.positions(kind),
            SectionSelector::Identifier(identifier) => self.find_by_identifier(kind, identifier).into_iter().collect(),
            SectionSelector::Position(position) if self.document.has_section(kind, position) => vec![position],
            SectionSelector::Position(_) => Vec::new(),
        }
    }

    fn target_positions(&self, kind: SectionKind, position: Option<usize>) -> XorgResult<Vec<usize>> {
        match position {
            Some(position) => {
                self.require_section(kind, position)?;
                Ok(vec![position])
            }
            None => Ok(self.document.positions(kind)),
        }
    }

    /// A rendered line must be found again under `name` and pass option validation
    fn check_new_line(&self, line: &str, name: &str, option_type: OptionType, validate: bool) -> XorgResult<()> {
        let tokens = XorgParser::tokenize_option(line)?;
        let name = name.trim();

        let found = match option_type {
            OptionType::Plain => tokens.keyword() == Some(name),
            OptionType::Option => tokens.is_option_form() && tokens.tokens.get(1).is_some_and(|t| t.text == name),
        };
        if name.is_empty() || !found {
            return Err(XorgError::parse(format!("Invalid option name: \"{}\"", name)));
        }

        if validate {
            self.validate_option_line(line)?;
        }
        Ok(())
    }

    fn commented_section(&self, kind: SectionKind, position: usize) -> Vec<String> {
        let Some(section) = self.document.section(kind, position) else {
            return Vec::new();
        };

        let mut lines = vec![format!("#Section \"{}\"", kind)];
        lines.extend(section.options.iter().map(|o| format!("#\t{}", o)));

        for id in self.document.subsections_of(kind, position) {
            let Some(sub) = self.document.subsection(id) else {
                continue;
            };
            lines.push(format!("#\tSubSection \"{}\"", sub.identifier));
            lines.extend(sub.options.iter().map(|o| format!("#\t\t{}", o)));
            lines.extend(
                self.document
                    .comments(&CommentTarget::subsection(kind, position, id))
                    .iter()
                    .map(|c| format!("#\t\t{}", c)),
            );
            lines.push("#\tEndSubSection".to_string());
        }

        lines.extend(
            self.document
                .comments(&CommentTarget::section(kind, position))
                .iter()
                .map(|c| format!("#\t{}", c)),
        );
        lines.push("#EndSection".to_string());
        lines
    }
}

fn render_option(kind: SectionKind, name: &str, value: &str, opts: &AddOptions) -> String {
    let name = name.trim();
    let quote = opts.quote.as_str();

    match opts.option_type {
        OptionType::Option => format!("Option\t\"{}\"\t{}{}{}", name, quote, value, quote),
        // Device sections use the bare `Screen 0` form
        OptionType::Plain if opts.reference && kind == SectionKind::Device => format!("{}\t{}", name, value),
        OptionType::Plain => format!("{}\t{}{}{}", name, quote, value, quote),
    }
}

fn identifier_line(identifier: &str) -> String {
    format!("Identifier\t\"{}\"", identifier)
}

fn is_identifier(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case("identifier")
}

fn is_identifier_line(line: &str) -> XorgResult<bool> {
    let tokens = XorgParser::tokenize_option(line)?;
    Ok(tokens.keyword().is_some_and(is_identifier))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

/// Lines a new `name` option replaces
fn same_option_hits(lines: &[String], name: &str, value: &str, opts: &AddOptions) -> XorgResult<Vec<bool>> {
    let name = name.trim();
    let mut hits = Vec::with_capacity(lines.len());

    for line in lines {
        let tokens = XorgParser::tokenize_option(line)?;
        let hit = if opts.reference {
            Extractor::matches(&tokens, name, true)
                && tokens.arguments().any(|a| eq_ignore_case(a.trim(), value.trim()))
        } else {
            match opts.option_type {
                OptionType::Plain => tokens.keyword().is_some_and(|k| eq_ignore_case(k, name)),
                OptionType::Option => {
                    tokens.is_option_form()
                        && tokens.tokens.get(1).is_some_and(|t| eq_ignore_case(&t.text, name))
                }
            }
        };
        hits.push(hit);
    }

    Ok(hits)
}

/// Split lines into (hit, kept)
fn split_lines(lines: Vec<String>, hits: &[bool]) -> (Vec<String>, Vec<String>) {
    let mut gone = Vec::new();
    let mut kept = Vec::new();

    for (index, line) in lines.into_iter().enumerate() {
        if hits.get(index).copied().unwrap_or(false) {
            gone.push(line);
        } else {
            kept.push(line);
        }
    }

    (gone, kept)
}

/// Replace every quoted `old` (ignoring case and surrounding blanks) with
/// `"new"`, leaving the first `skip` quoted runs and any trailing comment alone
fn replace_quoted(line: &str, old: &str, new: &str, skip: usize) -> String {
    let mut output = String::with_capacity(line.len());
    let mut rest = line;
    let mut seen = 0;

    while let Some(open) = rest.find(['"', '#']) {
        if rest[open..].starts_with('#') {
            break;
        }
        output.push_str(&rest[..open]);

        let after = &rest[open + 1..];
        let Some(close) = after.find('"') else {
            output.push_str(&rest[open..]);
            return output;
        };

        let inner = &after[..close];
        output.push('"');
        if seen >= skip && eq_ignore_case(inner.trim(), old) {
            output.push_str(new);
        } else {
            output.push_str(inner);
        }
        output.push('"');

        seen += 1;
        rest = &after[close + 1..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OptionValue;

    fn config(input: &str) -> XorgConfig {
        let mut config = XorgConfig::new();
        config.parse(input).unwrap();
        config
    }

    const BASE: &str = "Section \"Device\"\n\tIdentifier \"dev0\"\n\tDriver \"nvidia\"\nEndSection\n";

    #[test]
    fn test_render_option() {
        let plain = AddOptions::new();
        assert_eq!(render_option(SectionKind::Screen, "DefaultDepth", "24", &plain), "DefaultDepth\t\"24\"");
        assert_eq!(
            render_option(SectionKind::Screen, "DefaultDepth", "24", &plain.unquoted()),
            "DefaultDepth\t24"
        );
        assert_eq!(
            render_option(SectionKind::Device, "DPMS", "true", &plain.option()),
            "Option\t\"DPMS\"\t\"true\""
        );
        assert_eq!(render_option(SectionKind::Device, "Screen", "0", &plain.reference()), "Screen\t0");
        assert_eq!(
            render_option(SectionKind::Screen, "Device", "dev0", &plain.reference()),
            "Device\t\"dev0\""
        );
    }

    #[test]
    fn test_replace_quoted() {
        assert_eq!(replace_quoted("Screen \"SCR0\" 0 0", "scr0", "main", 0), "Screen \"main\" 0 0");
        assert_eq!(replace_quoted("Screen \"scr01\"", "scr0", "main", 0), "Screen \"scr01\"");
        assert_eq!(replace_quoted("Device \" dev0 \"", "dev0", "card0", 0), "Device \"card0\"");
        assert_eq!(
            replace_quoted("Screen \"scr0\" # was \"scr0\"", "scr0", "main", 0),
            "Screen \"main\" # was \"scr0\""
        );
        assert_eq!(
            replace_quoted("Option \"x\" \"x\"", "x", "y", 1),
            "Option \"x\" \"y\""
        );
    }

    #[test]
    fn test_rename_rewrites_padded_reference() {
        let mut config = config(
            "Section \"Device\"\n\tIdentifier \"dev0\"\nEndSection\n\
             Section \"Screen\"\n\tIdentifier \"scr0\"\n\tDevice \" dev0 \"\nEndSection\n",
        );
        config.rename_section(SectionKind::Device, 0, "card0").unwrap();

        let screen = config.section(SectionKind::Screen, 0).unwrap();
        assert_eq!(screen.options[1], "Device \"card0\"");
        assert!(config.check_compliance().is_ok());
    }

    #[test]
    fn test_add_option_replaces_same_name() {
        let mut config = config(BASE);
        config.add_option(SectionKind::Device, "Driver", "nouveau", AddOptions::new()).unwrap();

        let section = config.section(SectionKind::Device, 0).unwrap();
        assert_eq!(section.options, vec!["Identifier \"dev0\"".to_string(), "Driver\t\"nouveau\"".to_string()]);
    }

    #[test]
    fn test_add_option_to_missing_section() {
        let mut config = config(BASE);
        let err = config
            .add_option(SectionKind::Device, "Driver", "nv", AddOptions::new().at(4))
            .unwrap_err();
        assert!(err.is_section());
    }

    #[test]
    fn test_add_option_creates_default_section() {
        let mut config = XorgConfig::new();
        config.add_option(SectionKind::Monitor, "VendorName", "ACME", AddOptions::new()).unwrap();

        assert_eq!(config.get_identifier(SectionKind::Monitor, 0).unwrap(), "Default Monitor");
        assert_eq!(config.get_position(SectionKind::Monitor, "Default Monitor").unwrap(), 0);
    }

    #[test]
    fn test_invalid_option_names() {
        let mut config = config(BASE);
        let before = config.serialize();

        assert!(config.add_option(SectionKind::Device, "1st", "x", AddOptions::new()).is_err());
        assert!(config.add_option(SectionKind::Device, "Two Words", "x", AddOptions::new()).is_err());
        assert!(config.add_option(SectionKind::Device, "", "x", AddOptions::new()).is_err());
        assert_eq!(config.serialize(), before);
    }

    #[test]
    fn test_identifier_is_protected() {
        let mut config = config(BASE);
        assert!(config.remove_option(SectionKind::Device, "Identifier", None, None).unwrap_err().is_parse());

        // `dev` is a substring of the Identifier line, which stays
        assert_eq!(config.remove_option(SectionKind::Device, "dev", None, None).unwrap(), 0);
        assert_eq!(config.get_identifier(SectionKind::Device, 0).unwrap(), "dev0");
    }

    #[test]
    fn test_add_identifier_updates_index() {
        let mut config = config(BASE);
        config.add_option(SectionKind::Device, "Identifier", "card", AddOptions::new()).unwrap();

        assert_eq!(config.get_position(SectionKind::Device, "card").unwrap(), 0);
        assert!(config.get_position(SectionKind::Device, "dev0").is_err());
        assert!(config.add_option(SectionKind::Device, "Identifier", " ", AddOptions::new()).is_err());
    }

    #[test]
    fn test_comment_out_option() {
        let mut config = config(BASE);
        assert_eq!(config.comment_out_option(SectionKind::Device, "driver", None, Some(0)).unwrap(), 1);

        assert!(config.get_value(SectionKind::Device, "Driver", 0).unwrap_err().is_option());
        assert_eq!(
            config.comments(&CommentTarget::section(SectionKind::Device, 0)),
            &["#Driver \"nvidia\"".to_string()]
        );
    }

    #[test]
    fn test_missing_position_is_a_no_op() {
        let mut config = config(BASE);
        assert_eq!(config.remove_option(SectionKind::Device, "Driver", None, Some(3)).unwrap(), 0);
    }

    #[test]
    fn test_make_section_requires_identifier() {
        let mut config = XorgConfig::new();
        assert!(config.make_section(SectionKind::Screen, None).unwrap_err().is_identifier());
        assert!(config.make_section(SectionKind::Screen, Some("  ")).unwrap_err().is_identifier());
        assert_eq!(config.make_section(SectionKind::Module, None).unwrap(), 0);
        assert_eq!(config.make_section(SectionKind::Module, None).unwrap(), 1);
    }

    #[test]
    fn test_make_section_after_removal_uses_next_free_position() {
        let mut config = XorgConfig::new();
        config.make_section(SectionKind::Device, Some("a")).unwrap();
        config.make_section(SectionKind::Device, Some("b")).unwrap();
        config.remove_section(SectionKind::Device, SectionSelector::Position(0));

        let position = config.make_section(SectionKind::Device, Some("c")).unwrap();
        assert_eq!(position, 2);
        assert_eq!(config.get_identifier(SectionKind::Device, 1).unwrap(), "b");
    }

    #[test]
    fn test_rename_section_rewrites_references() {
        let mut config = config(
            "Section \"Device\"\nIdentifier \"dev0\"\nEndSection\n\
             Section \"Screen\"\nIdentifier \"scr0\"\nDevice \"DEV0\"\nEndSection\n",
        );
        config.rename_section(SectionKind::Device, 0, "card").unwrap();

        assert_eq!(
            config.get_reference_value(SectionKind::Screen, "Device", 0).unwrap(),
            OptionValue::Scalar("card".to_string())
        );
        assert!(config.get_broken_references().unwrap().is_empty());
        assert!(config.rename_section(SectionKind::Device, 3, "x").unwrap_err().is_section());
        assert!(config.rename_section(SectionKind::Device, 0, "").unwrap_err().is_parse());
    }

    #[test]
    fn test_subsection_round() {
        let mut config = config("Section \"Screen\"\nIdentifier \"scr0\"\nEndSection\n");

        let first = config.make_subsection(SectionKind::Screen, "Display", Some(0)).unwrap();
        let again = config.make_subsection(SectionKind::Screen, "Display", Some(0)).unwrap();
        assert_eq!(first, again);

        config
            .add_sub_option(SectionKind::Screen, "Display", "Depth", "24", AddOptions::new().unquoted())
            .unwrap();
        config
            .add_sub_option(SectionKind::Screen, "Display", "Depth", "16", AddOptions::new().unquoted())
            .unwrap();
        assert_eq!(
            config.get_sub_value(SectionKind::Screen, "Display", "Depth", 0).unwrap(),
            OptionValue::Scalar("16".to_string())
        );

        assert_eq!(config.comment_out_sub_option(SectionKind::Screen, "Display", "depth", Some(0)), 1);
        assert_eq!(
            config.comments(&CommentTarget::subsection(SectionKind::Screen, 0, first[0])),
            &["#Depth\t16".to_string()]
        );

        assert_eq!(config.comment_out_subsection(SectionKind::Screen, "Display", None), 1);
        assert_eq!(
            config.comments(&CommentTarget::section(SectionKind::Screen, 0)),
            &[
                "#SubSection \"Display\"".to_string(),
                "#\t#Depth\t16".to_string(),
                "#EndSubSection".to_string()
            ]
        );
    }

    #[test]
    fn test_add_sub_option_needs_a_section() {
        let mut config = XorgConfig::new();
        let err = config
            .add_sub_option(SectionKind::Screen, "Display", "Depth", "24", AddOptions::new())
            .unwrap_err();
        assert!(err.is_section());
    }

    #[test]
    fn test_remove_sub_option() {
        let mut config = config(
            "Section \"Screen\"\nIdentifier \"s\"\nSubSection \"Display\"\nDepth 24\nModes \"800x600\"\nEndSubSection\nEndSection\n",
        );
        assert_eq!(config.remove_sub_option(SectionKind::Screen, "Display", "modes", None), 1);
        assert_eq!(config.remove_subsection(SectionKind::Screen, "display", Some(0)), 1);
        assert!(config.get_subsections(SectionKind::Screen, 0).unwrap().is_empty());
    }
}
