use pest::Parser;
use pest_derive::Parser;
use crate::error::{XorgError, XorgResult};
use crate::types::SectionKind;

#[derive(Parser)]
#[grammar = "xorg.pest"]
pub struct XorgParser;

/// Classification of a single source line
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// `# ...`, the raw line
    Comment(String),

    /// `Section "Kind"`
    SectionBegin(SectionKind),

    /// `EndSection`
    SectionEnd,

    /// `SubSection "Identifier"`
    SubSectionBegin(String),

    /// `EndSubSection`
    SubSectionEnd,

    /// Only whitespace
    Blank,

    /// Anything else, trimmed
    Option(String),
}

/// A single token of an option line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionToken {
    /// Token text with the quotes removed
    pub text: String,
    /// Whether any part of the token was quoted
    pub quoted: bool,
}

/// Tokenized option line, trailing comment stripped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionTokens {
    pub tokens: Vec<OptionToken>,
    /// Number of `"` characters outside the trailing comment
    pub quotes: usize,
}

impl OptionTokens {
    /// The leading keyword, e.g. `Driver` or `Option`
    pub fn keyword(&self) -> Option<&str> {
        self.tokens.first().map(|t| t.text.as_str())
    }

    /// Whether the line has the `Option "Name" ...` form
    pub fn is_option_form(&self) -> bool {
        self.keyword()
            .map(|k| k.eq_ignore_ascii_case("option"))
            .unwrap_or(false)
    }

    /// The option name: the quoted name for `Option` lines, the keyword otherwise
    pub fn name(&self) -> Option<&str> {
        if self.is_option_form() {
            self.tokens.get(1).map(|t| t.text.as_str())
        } else {
            self.keyword()
        }
    }

    pub fn quoted_tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter(|t| t.quoted).map(|t| t.text.as_str())
    }

    pub fn unquoted_tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter(|t| !t.quoted).map(|t| t.text.as_str())
    }

    /// Every token after the keyword
    pub fn arguments(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().skip(1).map(|t| t.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl XorgParser {
    /// Classify one raw line of an xorg.conf
    pub fn classify_line(input: &str, line_no: usize) -> XorgResult<Line> {
        let pairs = XorgParser::parse(Rule::line, input).map_err(|e| {
            XorgError::parse_at(line_no, e.variant.to_string())
        })?;

        for pair in pairs.flatten() {
            match pair.as_rule() {
                Rule::comment => return Ok(Line::Comment(input.to_string())),

                Rule::section_begin => {
                    let name = Self::quoted_text(pair);
                    let kind = name
                        .as_deref()
                        .and_then(SectionKind::from_name)
                        .ok_or_else(|| {
                            XorgError::parse_at(
                                line_no,
                                format!("Invalid section name in line: {}", input.trim()),
                            )
                        })?;
                    return Ok(Line::SectionBegin(kind));
                }

                Rule::section_end => return Ok(Line::SectionEnd),

                Rule::subsection_begin => {
                    let identifier = Self::quoted_text(pair).ok_or_else(|| {
                        XorgError::parse_at(
                            line_no,
                            format!("SubSection without a quoted identifier: {}", input.trim()),
                        )
                    })?;
                    return Ok(Line::SubSectionBegin(identifier.trim().to_string()));
                }

                Rule::subsection_end => return Ok(Line::SubSectionEnd),

                Rule::option => return Ok(Line::Option(pair.as_str().trim().to_string())),

                _ => {}
            }
        }

        Ok(Line::Blank)
    }

    /// Split an option line into tokens, dropping any trailing comment
    pub fn tokenize_option(input: &str) -> XorgResult<OptionTokens> {
        let pairs = XorgParser::parse(Rule::option_tokens, input)?;
        let mut result = OptionTokens::default();

        for pair in pairs.flatten() {
            if pair.as_rule() != Rule::token {
                continue;
            }

            let mut text = String::new();
            let mut quoted = false;
            for piece in pair.into_inner() {
                match piece.as_rule() {
                    Rule::quoted => {
                        quoted = true;
                        let raw = piece.as_str();
                        result.quotes += if raw.len() >= 2 && raw.ends_with('"') { 2 } else { 1 };
                        text.push_str(&Self::inner_text(piece));
                    }
                    Rule::bare => text.push_str(piece.as_str()),
                    _ => {}
                }
            }

            result.tokens.push(OptionToken { text, quoted });
        }

        Ok(result)
    }

    fn quoted_text(pair: pest::iterators::Pair<Rule>) -> Option<String> {
        pair.into_inner()
            .find(|p| p.as_rule() == Rule::quoted)
            .map(Self::inner_text)
    }

    fn inner_text(quoted: pest::iterators::Pair<Rule>) -> String {
        quoted
            .into_inner()
            .find(|p| p.as_rule() == Rule::inner)
            .map(|p| p.as_str().to_string())
            .unwrap_or_default()
    }
}
