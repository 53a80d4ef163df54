// UAI Finder - Core Library
// Exposes all modules for use in the CLI and tests

pub mod academie;
pub mod io;
pub mod matcher;
pub mod pipeline;
pub mod reference;

// Re-export commonly used types
pub use academie::{AcademieOutcome, AcademieTable};
pub use io::{load_input, load_reference, write_output, RawTable};
pub use matcher::{FuzzyMatcher, MatchResult, NOT_FOUND_LABEL};
pub use pipeline::{InputRecord, OutputRecord, PipelineError, ResolutionPipeline};
pub use reference::{
    QualityWarning, ReferenceError, ReferenceIndex, ReferenceIndexBuilder, ReferenceRecord,
    SearchEntry, SearchIndex,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
