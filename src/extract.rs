//! Option value extraction.
//!
//! Turns the option lines of a section into [`OptionValue`]s. The shape of the
//! result depends on the number of quotes on the line, on the section the line
//! lives in, and on whether the caller is looking for a reference to another
//! section.

use crate::error::XorgResult;
use crate::identifiers::IdentifierIndex;
use crate::parser::{OptionTokens, XorgParser};
use crate::types::{OptionValue, SectionKind, eq_ignore_case};

/// Value extractor bound to the identifier index used for numeric references
pub(crate) struct Extractor<'a> {
    index: &'a IdentifierIndex,
}

impl<'a> Extractor<'a> {
    pub fn new(index: &'a IdentifierIndex) -> Self {
        Self { index }
    }

    /// Whether a tokenized line is an occurrence of `name`
    ///
    /// References only match on the leading keyword, so that
    /// `Option "Device" "/dev/input/mice"` is never taken for a reference and
    /// `InputDevice` never for `Device`.
    pub fn matches(tokens: &OptionTokens, name: &str, reference: bool) -> bool {
        let name = name.trim();
        let Some(keyword) = tokens.keyword() else {
            return false;
        };

        if eq_ignore_case(keyword, name) {
            return true;
        }

        !reference
            && tokens.is_option_form()
            && tokens
                .tokens
                .get(1)
                .is_some_and(|t| eq_ignore_case(&t.text, name))
    }

    /// Extract the value of a line already known to match `name`
    pub fn extract(&self, tokens: &OptionTokens, name: &str, section: Option<SectionKind>) -> OptionValue {
        let count = tokens.len();
        if count < 2 {
            return OptionValue::Absent;
        }

        let keyword = tokens.keyword().unwrap_or_default();
        let reference_kind = SectionKind::from_name(keyword).filter(|k| k.is_referenceable());

        // `Screen 1` refers to the Screen section at position 1
        if tokens.quotes == 0 && count == 2 {
            if let Some(kind) = reference_kind {
                if let Ok(position) = tokens.tokens[1].text.parse::<usize>() {
                    return match self.index.identifier_at(kind, position) {
                        Some(identifier) => OptionValue::Scalar(identifier.to_string()),
                        None => OptionValue::Absent,
                    };
                }
            }
        }

        // `Option "AddARGBGLXVisuals"` means the option is enabled
        if count == 2 && tokens.is_option_form() {
            return OptionValue::Scalar("True".to_string());
        }

        if section == Some(SectionKind::ServerLayout)
            && matches!(tokens.quotes, 2 | 4)
            && reference_kind.is_some()
        {
            let mut values: Vec<String> = Vec::new();
            for value in tokens.quoted_tokens() {
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
            // InputDevice "stylus" "SendCoreEvents": the flag is not a reference
            if name.trim().eq_ignore_ascii_case("inputdevice") && values.len() == 2 {
                values.truncate(1);
            }
            return OptionValue::List(values);
        }

        match tokens.quotes {
            0 => OptionValue::Scalar(tokens.arguments().collect::<Vec<_>>().join(" ")),
            1..=4 => OptionValue::Scalar(tokens.tokens[count - 1].text.clone()),
            _ => OptionValue::List(tokens.arguments().map(|s| s.to_string()).collect()),
        }
    }

    /// Scan option lines for `name`
    ///
    /// Returns `None` when no line matches.
    pub fn scan(
        &self,
        lines: &[String],
        name: &str,
        section: Option<SectionKind>,
        reference: bool,
    ) -> XorgResult<Option<OptionValue>> {
        let mut found = Vec::new();

        for line in lines {
            let tokens = XorgParser::tokenize_option(line)?;
            if Self::matches(&tokens, name, reference) {
                found.push(self.extract(&tokens, name, section));
            }
        }

        Ok(merge(found))
    }
}

/// Fold the values of several matching lines into one
pub(crate) fn merge(mut found: Vec<OptionValue>) -> Option<OptionValue> {
    match found.len() {
        0 => None,
        1 => found.pop(),
        _ => {
            let values: Vec<String> = found.into_iter().flat_map(OptionValue::into_values).collect();
            if values.is_empty() {
                Some(OptionValue::Absent)
            } else {
                Some(OptionValue::List(values))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(line: &str, name: &str, section: Option<SectionKind>, index: &IdentifierIndex) -> OptionValue {
        let tokens = XorgParser::tokenize_option(line).unwrap();
        Extractor::new(index).extract(&tokens, name, section)
    }

    fn scalar(s: &str) -> OptionValue {
        OptionValue::Scalar(s.to_string())
    }

    #[test]
    fn test_quoted_scalar() {
        let index = IdentifierIndex::new();
        assert_eq!(value("Driver \"nvidia\"", "Driver", Some(SectionKind::Device), &index), scalar("nvidia"));
        assert_eq!(
            value("Option \"DPMS\" \"false\"", "DPMS", Some(SectionKind::Monitor), &index),
            scalar("false")
        );
    }

    #[test]
    fn test_unquoted_values_are_joined() {
        let index = IdentifierIndex::new();
        assert_eq!(value("DefaultDepth 24", "DefaultDepth", Some(SectionKind::Screen), &index), scalar("24"));
        assert_eq!(
            value("HorizSync 28-51 # comment", "HorizSync", Some(SectionKind::Monitor), &index),
            scalar("28-51")
        );
        assert_eq!(
            value("Modeline 1024x768 65.0 1024 1048", "Modeline", Some(SectionKind::Monitor), &index),
            scalar("1024x768 65.0 1024 1048")
        );
    }

    #[test]
    fn test_option_without_value_is_true() {
        let index = IdentifierIndex::new();
        assert_eq!(
            value("Option \"AddARGBGLXVisuals\"", "AddARGBGLXVisuals", Some(SectionKind::Screen), &index),
            scalar("True")
        );
    }

    #[test]
    fn test_hash_inside_quotes_is_value() {
        let index = IdentifierIndex::new();
        assert_eq!(
            value("Identifier \"card #1\" # trailing", "Identifier", Some(SectionKind::Device), &index),
            scalar("card #1")
        );
    }

    #[test]
    fn test_server_layout_input_device_drops_flag() {
        let index = IdentifierIndex::new();
        assert_eq!(
            value(
                "InputDevice \"stylus\" \"SendCoreEvents\"",
                "InputDevice",
                Some(SectionKind::ServerLayout),
                &index
            ),
            OptionValue::List(vec!["stylus".to_string()])
        );
        assert_eq!(
            value("Screen 0 \"scr0\" 0 0", "Screen", Some(SectionKind::ServerLayout), &index),
            OptionValue::List(vec!["scr0".to_string()])
        );
    }

    #[test]
    fn test_numeric_reference_resolution() {
        let mut index = IdentifierIndex::new();
        index.insert(SectionKind::Screen, "scr1", 1);

        assert_eq!(value("Screen 1", "Screen", Some(SectionKind::ServerLayout), &index), scalar("scr1"));
        assert_eq!(value("Screen 4", "Screen", Some(SectionKind::ServerLayout), &index), OptionValue::Absent);
    }

    #[test]
    fn test_many_quotes_return_list() {
        let index = IdentifierIndex::new();
        assert_eq!(
            value("Option \"XkbLayout\" \"us\" \"de\"", "XkbLayout", Some(SectionKind::InputDevice), &index),
            OptionValue::List(vec!["XkbLayout".to_string(), "us".to_string(), "de".to_string()])
        );
    }

    #[test]
    fn test_reference_matching_is_keyword_only() {
        let option_device = XorgParser::tokenize_option("Option \"Device\" \"/dev/input/mice\"").unwrap();
        assert!(!Extractor::matches(&option_device, "Device", true));
        assert!(Extractor::matches(&option_device, "Device", false));

        let input_device = XorgParser::tokenize_option("InputDevice \"kbd\"").unwrap();
        assert!(!Extractor::matches(&input_device, "Device", true));
    }

    #[test]
    fn test_scan_merges_multiple_lines() {
        let index = IdentifierIndex::new();
        let lines = vec![
            "Identifier \"layout\"".to_string(),
            "Screen \"left\"".to_string(),
            "Screen \"right\" RightOf \"left\"".to_string(),
        ];

        let merged = Extractor::new(&index)
            .scan(&lines, "Screen", Some(SectionKind::ServerLayout), true)
            .unwrap()
            .unwrap();
        assert_eq!(merged.values(), vec!["left", "right", "left"]);

        let missing = Extractor::new(&index)
            .scan(&lines, "Monitor", Some(SectionKind::ServerLayout), true)
            .unwrap();
        assert!(missing.is_none());
    }
}
