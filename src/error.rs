use std::fmt;

/// Result type alias for parser and editor operations
pub type XorgResult<T> = Result<T, XorgError>;

/// Errors that can occur while loading, editing or writing an xorg.conf
#[derive(Debug, Clone, PartialEq)]
pub enum XorgError {
    /// The source violates the grammar or a document invariant
    Parse {
        /// 1-based source line, when known
        line: Option<usize>,
        message: String,
    },

    /// No section of this kind exists at the given position
    Section {
        kind: String,
        position: Option<usize>,
    },

    /// No matching option line in an existing section
    Option {
        kind: String,
        option: String,
        position: usize,
    },

    /// A required identifier is missing or cannot be resolved
    Identifier { message: String },

    /// Reading a source or writing a sink failed
    Io { path: String, message: String },
}

impl XorgError {
    /// Create a parse error without line information
    pub fn parse(message: impl Into<String>) -> Self {
        XorgError::Parse {
            line: None,
            message: message.into(),
        }
    }

    /// Create a parse error pointing at a source line
    pub fn parse_at(line: usize, message: impl Into<String>) -> Self {
        XorgError::Parse {
            line: Some(line),
            message: message.into(),
        }
    }

    /// Create a section error
    pub fn section(kind: impl Into<String>, position: Option<usize>) -> Self {
        XorgError::Section {
            kind: kind.into(),
            position,
        }
    }

    /// Create an option error
    pub fn option(kind: impl Into<String>, option: impl Into<String>, position: usize) -> Self {
        XorgError::Option {
            kind: kind.into(),
            option: option.into(),
            position,
        }
    }

    /// Create an identifier error
    pub fn identifier(message: impl Into<String>) -> Self {
        XorgError::Identifier {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        XorgError::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, XorgError::Parse { .. })
    }

    pub fn is_section(&self) -> bool {
        matches!(self, XorgError::Section { .. })
    }

    pub fn is_option(&self) -> bool {
        matches!(self, XorgError::Option { .. })
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, XorgError::Identifier { .. })
    }
}

impl fmt::Display for XorgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XorgError::Parse {
                line: Some(line),
                message,
            } => write!(f, "Parse error at line {}: {}", line, message),
            XorgError::Parse { line: None, message } => write!(f, "Parse error: {}", message),
            XorgError::Section {
                kind,
                position: Some(position),
            } => write!(f, "No {} section at position {}", kind, position),
            XorgError::Section {
                kind,
                position: None,
            } => write!(f, "No {} section available", kind),
            XorgError::Option {
                kind,
                option,
                position,
            } => write!(
                f,
                "Option '{}' not found in {} section {}",
                option, kind, position
            ),
            XorgError::Identifier { message } => write!(f, "Identifier error: {}", message),
            XorgError::Io { path, message } => write!(f, "I/O error for '{}': {}", path, message),
        }
    }
}

impl std::error::Error for XorgError {}

impl From<std::io::Error> for XorgError {
    fn from(err: std::io::Error) -> Self {
        XorgError::Io {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

impl<R: pest::RuleType> From<pest::error::Error<R>> for XorgError {
    fn from(err: pest::error::Error<R>) -> Self {
        let line = match err.line_col {
            pest::error::LineColLocation::Pos((line, _)) => line,
            pest::error::LineColLocation::Span((line, _), _) => line,
        };

        XorgError::Parse {
            line: Some(line),
            message: err.variant.to_string(),
        }
    }
}
