//! # xorgconf
//!
//! A parser and editor for X.Org `xorg.conf` configuration files.
//!
//! A configuration is loaded into a document organized by section kind, can
//! be inspected and edited through [`XorgConfig`], and written back as text.
//! Loading checks that the file is consistent: identified sections carry a
//! unique `Identifier`, references between sections resolve, and every
//! `ServerLayout` uses at least one `Screen`.
//!
//! ## Features
//!
//! - **Line classifier and option tokenizer** built on pest
//! - **Typed values**: scalars, lists, numeric references like `Screen 0`
//! - **Editing**: options, references, sections, subsections, comments
//! - **Consistency reports**: duplicate sections and options, broken references
//! - **Round-trip serialization**: comments and commented-out blocks are kept
//!
//! ## Optional Features
//!
//! ### `xutils` Feature
//!
//! Enabled by default. Adds driver and device helpers such as
//! [`XorgConfig::get_devices_in_use`] and [`XorgConfig::fix_broken_references`].
//!
//! ## Example
//!
//! ```rust
//! use xorgconf::{AddOptions, OptionValue, SectionKind, XorgConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = XorgConfig::new();
//! config.parse(r#"
//! Section "Device"
//!     Identifier "card0"
//!     Driver "nvidia"
//! EndSection
//!
//! Section "Screen"
//!     Identifier "screen0"
//!     Device "card0"
//! EndSection
//! "#)?;
//!
//! assert_eq!(
//!     config.get_value(SectionKind::Device, "Driver", 0)?,
//!     OptionValue::Scalar("nvidia".to_string())
//! );
//!
//! config.add_option(SectionKind::Screen, "DefaultDepth", "24", AddOptions::new().unquoted())?;
//! assert!(config.serialize().contains("\tDefaultDepth\t24\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and spans. It never installs a
//! subscriber; that is up to the application.

// Module declarations
mod compliance;
mod config;
mod document;
mod editor;
mod error;
mod extract;
mod identifiers;
mod loader;
mod parser;
mod types;

// Feature-gated modules
#[cfg(feature = "xutils")]
mod xutils;

// Public API exports
pub use config::{ParserOptions, Source, XorgConfig};
pub use document::{CommentTarget, Document, Section, SubSection, SubSectionId};
pub use editor::AddOptions;
pub use error::{XorgError, XorgResult};
pub use identifiers::{IdentifierEntry, IdentifierIndex};
pub use parser::{Line, OptionToken, OptionTokens, XorgParser};
pub use types::{OptionType, OptionValue, Quote, SectionKind, SectionSelector};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
