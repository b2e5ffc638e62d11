//! `C3`: the metadata resolver. Given an absolute PDF path, looks up the
//! reference-manager record (title, authors, citekey, abstract, …) it
//! belongs to — or reports that resolution is not yet possible.
//!
//! The resolver does not distinguish a transient failure (network error,
//! service not running) from a permanent one (file simply not catalogued)
//! to its caller: both return `Ok(None)`, and the backoff policy in
//! `zotomatic-daemon`'s pending queue processor (C8) absorbs the
//! difference uniformly (`spec.md` §4.3).

mod error;
mod record;
mod zotero;

pub use error::ResolverError;
pub use record::MetadataRecord;
pub use zotero::{ZoteroResolver, ZoteroResolverConfig};

use std::path::Path;

use async_trait::async_trait;

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolves `pdf_path` to a bibliographic record, or `None` if the file
    /// isn't (yet) catalogued. An `Err` means the *attempt* failed — the
    /// caller should retry later, not treat it as "never resolvable".
    async fn resolve(&self, pdf_path: &Path) -> Result<Option<MetadataRecord>, ResolverError>;
}
