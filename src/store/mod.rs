//! Persistence seams for segmented papers.
//!
//! The core never talks to a database or object store directly. Callers
//! supply a [`BlobStore`] for image bytes and a [`PaperStore`] for records;
//! [`publish`] drives both.

mod blob;
mod memory;
mod publish;
mod record;

pub use blob::DirectoryBlobStore;
pub use memory::MemoryPaperStore;
pub use publish::{image_key, publish, IngestReport};
pub use record::{ContentBody, ContentRecord, PaperRecord, QuestionRecord};

use crate::error::Result;

/// Storage for image bytes.
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return a resolvable reference (URL or
    /// path).
    fn put_image(&self, key: &str, data: &[u8], format: &str) -> Result<String>;
}

/// Storage for paper records.
pub trait PaperStore: Send + Sync {
    /// Store a paper and return its identifier.
    ///
    /// Implementations assign identifiers to the paper, its questions and
    /// their content items where the record leaves them empty.
    fn insert_paper(&self, paper: PaperRecord) -> Result<String>;

    /// Fetch a paper with questions in sequence order.
    fn get_paper(&self, id: &str) -> Result<Option<PaperRecord>>;
}
