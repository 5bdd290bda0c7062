pub mod header;
pub mod table;
pub mod record;
pub mod codec;
pub mod store;
pub mod manifest;
pub mod report;
pub mod arch;
pub mod extract;
pub mod error;

pub use error::{Error, Result};
pub use header::{FormatError, StoreHeader};
pub use record::{EntryKey, Hash32Record, Hash64Record, PayloadRecord, Span};
pub use store::{ExtractionError, Store};
pub use manifest::{Manifest, ManifestEntry, ManifestIndex};
pub use extract::{ExtractOptions, Extractor, unpack_bundle};
pub use report::RunReport;
