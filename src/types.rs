use crate::error::{XorgError, XorgResult};
use std::fmt;
use std::str::FromStr;

/// The closed set of section kinds accepted in an xorg.conf
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    InputDevice,
    Device,
    Module,
    Monitor,
    Screen,
    ServerLayout,
    ServerFlags,
    Extensions,
    Files,
    InputClass,
    DRI,
    VideoAdaptor,
    Vendor,
    Modes,
}

impl SectionKind {
    /// Every section kind, in canonical order
    pub const ALL: [SectionKind; 14] = [
        SectionKind::InputDevice,
        SectionKind::Device,
        SectionKind::Module,
        SectionKind::Monitor,
        SectionKind::Screen,
        SectionKind::ServerLayout,
        SectionKind::ServerFlags,
        SectionKind::Extensions,
        SectionKind::Files,
        SectionKind::InputClass,
        SectionKind::DRI,
        SectionKind::VideoAdaptor,
        SectionKind::Vendor,
        SectionKind::Modes,
    ];

    /// Kinds whose sections must carry a unique `Identifier`
    pub const IDENTIFIED: [SectionKind; 5] = [
        SectionKind::InputDevice,
        SectionKind::Device,
        SectionKind::Monitor,
        SectionKind::Screen,
        SectionKind::ServerLayout,
    ];

    /// Kinds that other sections may refer to by identifier
    pub const REFERENCEABLE: [SectionKind; 4] = [
        SectionKind::Device,
        SectionKind::InputDevice,
        SectionKind::Monitor,
        SectionKind::Screen,
    ];

    /// The keyword used for this kind in `Section "..."`
    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::InputDevice => "InputDevice",
            SectionKind::Device => "Device",
            SectionKind::Module => "Module",
            SectionKind::Monitor => "Monitor",
            SectionKind::Screen => "Screen",
            SectionKind::ServerLayout => "ServerLayout",
            SectionKind::ServerFlags => "ServerFlags",
            SectionKind::Extensions => "Extensions",
            SectionKind::Files => "Files",
            SectionKind::InputClass => "InputClass",
            SectionKind::DRI => "DRI",
            SectionKind::VideoAdaptor => "VideoAdaptor",
            SectionKind::Vendor => "Vendor",
            SectionKind::Modes => "Modes",
        }
    }

    /// Look up a kind by name, ignoring case and surrounding whitespace
    pub fn from_name(name: &str) -> Option<SectionKind> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    pub fn requires_identifier(&self) -> bool {
        Self::IDENTIFIED.contains(self)
    }

    pub fn is_referenceable(&self) -> bool {
        Self::REFERENCEABLE.contains(self)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SectionKind {
    type Err = XorgError;

    fn from_str(s: &str) -> XorgResult<Self> {
        SectionKind::from_name(s).ok_or_else(|| XorgError::section(s, None))
    }
}

/// Value extracted from one or more option lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// The line matched but carries no usable value
    Absent,
    /// A single value, e.g. `Driver "nvidia"`
    Scalar(String),
    /// Several values, e.g. multiple references of the same kind
    List(Vec<String>),
}

impl OptionValue {
    /// The scalar value, or the only element of a one-element list
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Scalar(s) => Some(s),
            OptionValue::List(items) if items.len() == 1 => Some(&items[0]),
            _ => None,
        }
    }

    /// The first value available, whatever the shape
    pub fn first(&self) -> Option<&str> {
        match self {
            OptionValue::Absent => None,
            OptionValue::Scalar(s) => Some(s),
            OptionValue::List(items) => items.first().map(|s| s.as_str()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, OptionValue::Absent)
    }

    /// All values as a flat list
    pub fn values(&self) -> Vec<&str> {
        match self {
            OptionValue::Absent => Vec::new(),
            OptionValue::Scalar(s) => vec![s.as_str()],
            OptionValue::List(items) => items.iter().map(|s| s.as_str()).collect(),
        }
    }

    pub fn into_values(self) -> Vec<String> {
        match self {
            OptionValue::Absent => Vec::new(),
            OptionValue::Scalar(s) => vec![s],
            OptionValue::List(items) => items,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Absent => Ok(()),
            OptionValue::Scalar(s) => f.write_str(s),
            OptionValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// How a new option line is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionType {
    /// `Name "value"`
    #[default]
    Plain,
    /// `Option "Name" "value"`
    Option,
}

/// Quoting applied around a rendered value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    #[default]
    Double,
    None,
}

impl Quote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quote::Double => "\"",
            Quote::None => "",
        }
    }
}

/// Which sections of a kind an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionSelector<'a> {
    /// Every section of the kind
    All,
    /// The section whose identifier matches (case-insensitive)
    Identifier(&'a str),
    /// The section at a position
    Position(usize),
}

/// Compare names, identifiers and values ignoring case (Unicode lowercase)
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
