//! QLC Cue Core Library
//!
//! This library provides the data structures shared by the cue compiler: the
//! catalog of functions found in a QLC+ workspace, the identifier allocator,
//! the timecode codec and the timeline records produced from a cue sheet.

pub mod allocator;
pub mod catalog;
pub mod context;
pub mod function;
pub mod timecode;
pub mod timeline;

pub use allocator::IdAllocator;
pub use catalog::{CatalogEntry, FunctionCatalog};
pub use context::RunContext;
pub use function::{FadeLabel, FunctionKind, RunOrder};
pub use timeline::{Collection, FunctionInstance, Placement, TimelineEvent, Track, TrackKind};

/// Result type for qlccue-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for qlccue-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("'{element}' missing 'ID', 'Name' or 'Type' attributes")]
    MissingAttributes { element: String },

    #[error("'{element}' has a non-numeric ID")]
    InvalidFunctionId { element: String },

    #[error("Function ID {0} is used more than once")]
    DuplicateFunctionId(u32),

    #[error("No functions found in workspace")]
    NoFunctions,
}

/// A cue-sheet value that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Timecode '{0}' does not match required pattern - 00:00.000")]
    InvalidTimecode(String),

    #[error("Fade '{0}' not supported. Supported fades 'NONE,RAPID,QUICK,MEDIUM,SLOW,LONG'")]
    UnknownFade(String),

    #[error("Function type '{0}' not valid")]
    UnknownFunctionKind(String),
}
