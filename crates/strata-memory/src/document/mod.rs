pub mod features;
pub mod fingerprint;
pub mod loader;
pub mod processor;
pub mod splitter;
pub mod types;

pub use fingerprint::{fingerprint, normalize};
pub use loader::{DEFAULT_MAX_FILE_SIZE, ParsedSource, load_source, parse_source};
pub use processor::ChunkProcessor;
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Document, PresetTags, SourceEntry};
