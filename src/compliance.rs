//! Compliance checks and consistency reports.
//!
//! [`XorgConfig::check_compliance`] runs after every load of a non-empty
//! source and can be called again after editing. The report functions never
//! fail on a broken document; they describe what is wrong with it.

use crate::config::XorgConfig;
use crate::document::SubSectionId;
use crate::error::{XorgError, XorgResult};
use crate::extract::Extractor;
use crate::loader::section_identifier;
use crate::parser::XorgParser;
use crate::types::{SectionKind, eq_ignore_case};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Options that may only be set once per section, besides `Option "Name"` lines
const SINGLE_VALUED: [&str; 3] = ["driver", "busid", "identifier"];

impl XorgConfig {
    /// Options set more than once in a section
    ///
    /// Covers `Driver`, `BusID`, `Identifier` and `Option "Name"` lines.
    /// References may repeat freely.
    pub fn get_duplicate_options(&self, kind: SectionKind, position: usize) -> XorgResult<Vec<String>> {
        let section = self.require_section(kind, position)?;
        duplicate_names(&section.options)
    }

    /// Options set more than once in a subsection
    pub fn get_duplicate_sub_options(&self, id: SubSectionId) -> XorgResult<Vec<String>> {
        let sub = self
            .document
            .subsection(id)
            .ok_or_else(|| XorgError::section("SubSection", Some(id.0)))?;
        duplicate_names(&sub.options)
    }

    /// Duplicate options of every section, by kind and position
    pub fn check_duplicate_options(&self) -> XorgResult<BTreeMap<SectionKind, BTreeMap<usize, Vec<String>>>> {
        let mut report: BTreeMap<SectionKind, BTreeMap<usize, Vec<String>>> = BTreeMap::new();

        for &kind in self.document.kinds() {
            for position in self.document.positions(kind) {
                let duplicates = self.get_duplicate_options(kind, position)?;
                if !duplicates.is_empty() {
                    report.entry(kind).or_default().insert(position, duplicates);
                }
            }
        }

        Ok(report)
    }

    /// Identifiers shared by several sections of the same kind, with their count
    pub fn get_duplicate_sections(&self) -> BTreeMap<SectionKind, BTreeMap<String, usize>> {
        self.identifiers.duplicates()
    }

    /// References to sections that do not exist, per referenced kind
    pub fn get_broken_references(&self) -> XorgResult<BTreeMap<SectionKind, BTreeSet<String>>> {
        let mut broken: BTreeMap<SectionKind, BTreeSet<String>> = BTreeMap::new();

        for kind in SectionKind::IDENTIFIED {
            for position in self.document.positions(kind) {
                for (referenced, identifiers) in self.get_references(kind, position, None)? {
                    for identifier in identifiers {
                        if !self.identifiers.contains(referenced, &identifier) {
                            broken.entry(referenced).or_default().insert(identifier);
                        }
                    }
                }
            }
        }

        Ok(broken)
    }

    /// Positions of the ServerLayouts named by `DefaultServerLayout`
    ///
    /// Fails when a named layout does not exist.
    pub fn get_default_server_layout(&self) -> XorgResult<Vec<usize>> {
        let extractor = Extractor::new(&self.identifiers);
        let mut layouts = Vec::new();

        for section in self.document.sections(SectionKind::ServerFlags) {
            let Some(value) = extractor.scan(
                &section.options,
                "DefaultServerLayout",
                Some(SectionKind::ServerFlags),
                false,
            )?
            else {
                continue;
            };

            for name in value.values() {
                let position = self
                    .identifiers
                    .position_of(SectionKind::ServerLayout, name)
                    .ok_or_else(|| {
                        XorgError::parse(format!(
                            "The default ServerLayout \"{}\" does not exist",
                            name
                        ))
                    })?;
                layouts.push(position);
            }
        }

        Ok(layouts)
    }

    /// Check every document invariant, failing on the first violation
    pub fn check_compliance(&self) -> XorgResult<()> {
        for kind in SectionKind::IDENTIFIED {
            for position in self.document.positions(kind) {
                let identifier = section_identifier(&self.document, kind, position)?;
                let indexed = self.identifiers.identifier_at(kind, position);
                if indexed != Some(identifier.as_str()) {
                    return Err(XorgError::parse(format!(
                        "Identifier index out of date for {} section {}",
                        kind, position
                    )));
                }
            }
        }

        if let Some((kind, identifiers)) = self.get_duplicate_sections().into_iter().next() {
            let names: Vec<String> = identifiers.into_keys().collect();
            return Err(XorgError::parse(format!(
                "Duplicate {} sections with identifier(s): {}",
                kind,
                names.join(", ")
            )));
        }

        self.validate_options()?;

        if let Some((kind, identifiers)) = self.get_broken_references()?.into_iter().next() {
            let names: Vec<String> = identifiers.into_iter().collect();
            return Err(XorgError::parse(format!(
                "Broken {} reference(s): {}",
                kind,
                names.join(", ")
            )));
        }

        for position in self.document.positions(SectionKind::ServerLayout) {
            let screens = [SectionKind::Screen];
            let references = self.get_references(SectionKind::ServerLayout, position, Some(&screens[..]))?;
            let has_screen = references
                .get(&SectionKind::Screen)
                .is_some_and(|screens| !screens.is_empty());
            if !has_screen {
                return Err(XorgError::parse(format!(
                    "ServerLayout section {} does not reference any Screen",
                    position
                )));
            }
        }

        if self.get_default_server_layout()?.len() > 1 {
            return Err(XorgError::parse("No more than one default ServerLayout can be set"));
        }

        if self.options.reject_duplicate_options {
            if let Some((kind, positions)) = self.check_duplicate_options()?.into_iter().next() {
                let (position, names) = positions.into_iter().next().unwrap_or_default();
                return Err(XorgError::parse(format!(
                    "Duplicate option(s) {} in {} section {}",
                    names.join(", "),
                    kind,
                    position
                )));
            }
        }

        debug!("compliance check passed");
        Ok(())
    }

    /// Every option line outside `Files` needs two tokens and an alphabetic keyword
    fn validate_options(&self) -> XorgResult<()> {
        for &kind in self.document.kinds() {
            if kind == SectionKind::Files {
                continue;
            }
            for section in self.document.sections(kind) {
                for line in &section.options {
                    self.validate_option_line(line)?;
                }
            }
        }

        for (_, sub) in self.document.subsections() {
            for line in &sub.options {
                self.validate_option_line(line)?;
            }
        }

        Ok(())
    }

    pub(crate) fn validate_option_line(&self, line: &str) -> XorgResult<()> {
        let tokens = XorgParser::tokenize_option(line)?;
        let keyword = tokens.keyword().unwrap_or_default();

        let whitelisted = self
            .options
            .option_whitelist
            .iter()
            .any(|allowed| eq_ignore_case(allowed, keyword));
        if tokens.len() < 2 && !whitelisted {
            return Err(XorgError::parse(format!("The following option is invalid: {}", line)));
        }

        if !keyword.chars().next().is_some_and(char::is_alphabetic) {
            return Err(XorgError::parse(format!(
                "The option name must start with a letter: {}",
                line
            )));
        }

        Ok(())
    }
}

/// Names of single-valued options that occur on more than one line
fn duplicate_names(lines: &[String]) -> XorgResult<Vec<String>> {
    let mut seen: Vec<(String, usize)> = Vec::new();

    for line in lines {
        let tokens = XorgParser::tokenize_option(line)?;
        let name = match tokens.keyword() {
            Some(keyword) if SINGLE_VALUED.iter().any(|n| n.eq_ignore_ascii_case(keyword)) => keyword,
            Some(_) if tokens.is_option_form() && tokens.len() > 1 => tokens.tokens[1].text.as_str(),
            _ => continue,
        };

        match seen.iter_mut().find(|(s, _)| eq_ignore_case(s, name)) {
            Some((_, count)) => *count += 1,
            None => seen.push((name.to_string(), 1)),
        }
    }

    Ok(seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserOptions;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_duplicate_names() {
        let found = duplicate_names(&lines(&[
            "Driver \"nv\"",
            "driver \"nvidia\"",
            "Option \"DPMS\" \"on\"",
            "Option \"dpms\" \"off\"",
            "Screen \"a\"",
            "Screen \"b\"",
        ]))
        .unwrap();

        assert_eq!(found, vec!["Driver".to_string(), "DPMS".to_string()]);
    }

    #[test]
    fn test_option_validation() {
        let config = XorgConfig::new();
        assert!(config.validate_option_line("Driver \"nv\"").is_ok());
        assert!(config.validate_option_line("EndMode").is_ok());
        assert!(config.validate_option_line("Lonely").is_err());
        assert!(config.validate_option_line("1Driver \"nv\"").is_err());
    }

    #[test]
    fn test_whitelist_is_configurable() {
        let config = XorgConfig::with_options(ParserOptions {
            option_whitelist: vec!["Lonely".to_string()],
            ..ParserOptions::default()
        });
        assert!(config.validate_option_line("Lonely").is_ok());
        assert!(config.validate_option_line("EndMode").is_err());
    }

    #[test]
    fn test_files_section_is_not_validated() {
        let mut config = XorgConfig::new();
        config.parse("Section \"Files\"\n    FontPath\nEndSection\n").unwrap();
        assert!(config.check_compliance().is_ok());
    }

    #[test]
    fn test_reject_duplicate_options() {
        let input = "Section \"Device\"\nIdentifier \"d\"\nDriver \"a\"\nDriver \"b\"\nEndSection\n";

        let mut lenient = XorgConfig::new();
        assert!(lenient.parse(input).is_ok());
        assert_eq!(
            lenient.get_duplicate_options(SectionKind::Device, 0).unwrap(),
            vec!["Driver".to_string()]
        );

        let mut strict = XorgConfig::with_options(ParserOptions {
            reject_duplicate_options: true,
            ..ParserOptions::default()
        });
        assert!(strict.parse(input).unwrap_err().is_parse());
    }
}
