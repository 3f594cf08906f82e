//! penny-ingest: statement text extraction, layout reconstruction and
//! bank-specific parsers.

pub mod config;
pub mod error;
pub mod extract;
pub mod layout;
pub mod parsers;
pub mod registry;
pub mod segments;
pub mod tokens;
pub mod types;
pub mod vendor;

pub use config::{LayoutConfig, ParserConfig};
pub use error::IngestError;
pub use extract::{extract_many, extract_pages, extract_pages_from_bytes};
pub use parsers::StatementParser;
pub use registry::ParserRegistry;
pub use types::{FragmentDocument, TextFragment};
