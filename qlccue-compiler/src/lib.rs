//! QLC Cue Compiler Library
//!
//! This library turns cue sheets into QLC+ workspace fragments: a show with
//! timed tracks, or a master cue-list chaser backed by generated collections.

pub mod audio;
pub mod compiler;
pub mod cue_list;
pub mod document;
pub mod normalizer;

pub use audio::{AudioProbe, LoftyProbe};
pub use compiler::{compile_show, CueCompiler, ShowTimeline};
pub use cue_list::{compile_cue_list, CollectionResolver, Cue, CueList, CueListCompiler};
pub use document::{Element, Fragment, Node};
pub use normalizer::{CueRow, NormalizedRow, RowNormalizer, SheetFormat};

use qlccue_core::{FadeLabel, FunctionKind, ParseError};
use std::fmt;
use std::path::PathBuf;

/// Result type for qlccue-compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for qlccue-compiler operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("QLC cue core error: {0}")]
    Core(#[from] qlccue_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cue sheet error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Audio function '{0}' not found in workspace")]
    AudioFunctionNotFound(String),

    #[error("Audio function '{0}' missing source")]
    AudioSourceMissing(String),

    #[error("Unable to read audio duration from '{}': {message}", path.display())]
    AudioProbe { path: PathBuf, message: String },

    #[error("{} cue sheet row(s) failed validation", .0.len())]
    Rows(Vec<RowError>),
}

/// A problem with a single cue-sheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Line in the cue sheet, counting the header as line 1
    pub line: u64,
    pub kind: RowErrorKind,
}

impl RowError {
    pub fn new(line: u64, kind: RowErrorKind) -> Self {
        Self { line, kind }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for RowError {}

/// What went wrong with a row
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowErrorKind {
    #[error("Timecode '{0}' does not match required pattern - 00:00.000")]
    InvalidTimecode(String),

    #[error("Fade '{0}' not supported. Supported fades 'NONE,RAPID,QUICK,MEDIUM,SLOW,LONG'")]
    UnknownFade(String),

    #[error("Function type '{0}' not valid")]
    UnknownFunctionKind(String),

    #[error("Column {column} is not valid UTF-8")]
    InvalidUtf8 { column: usize },

    #[error("Expected at least {expected} columns, found {found}")]
    MissingColumns { expected: usize, found: usize },

    #[error("'{kind} - {name}' not found in workspace")]
    FunctionNotFound { kind: FunctionKind, name: String },

    #[error("Function '{0}' not found in workspace")]
    NoSuchFunction(String),

    #[error("Function '{name}' is ambiguous, it exists as {kinds}")]
    AmbiguousFunction { name: String, kinds: String },

    #[error("Function type '{0}' not valid here")]
    UnsupportedKind(FunctionKind),

    #[error("Function '{name}' at {timecode} is missing a duration - {requirement}")]
    MissingDuration {
        name: String,
        timecode: String,
        requirement: &'static str,
    },

    #[error("Function '{name}' at {timecode} has a duration - 'Single Shot Chaser' fires only once for a pre-determined duration")]
    UnexpectedDuration { name: String, timecode: String },

    #[error("Function '{name}' at {timecode} is a 'Single Shot Chaser' without a duration in the workspace")]
    MissingCatalogDuration { name: String, timecode: String },

    #[error("Function '{name}' at {timecode} has a 'Ping Pong' run order. This is not supported. Create a 'Loop' chaser containing this chaser and specify a duration.")]
    PingPong { name: String, timecode: String },

    #[error("Function '{name}' at {timecode} using an unsupported RunOrder '{run_order}'")]
    UnsupportedRunOrder {
        name: String,
        timecode: String,
        run_order: String,
    },

    #[error("No actions specified for cue '{0}'")]
    NoActions(String),

    #[error("Cue '{0}' is defined more than once")]
    DuplicateCue(String),
}

impl From<ParseError> for RowErrorKind {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidTimecode(timecode) => RowErrorKind::InvalidTimecode(timecode),
            ParseError::UnknownFade(label) => RowErrorKind::UnknownFade(label),
            ParseError::UnknownFunctionKind(kind) => RowErrorKind::UnknownFunctionKind(kind),
        }
    }
}

/// Compiler configuration
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Directory the workspace's audio `Source` paths are relative to
    pub audio_root: PathBuf,
    /// Fade out of the last cue in a cue list
    pub final_fade: FadeLabel,
    /// Colour of chaser and scene placements
    pub placement_color: String,
    /// Colour of the audio placement
    pub audio_color: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            audio_root: PathBuf::from("."),
            final_fade: FadeLabel::Slow,
            placement_color: "#556b80".to_string(),
            audio_color: "#608053".to_string(),
        }
    }
}
