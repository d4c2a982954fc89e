use async_trait::async_trait;

use crate::error::Result;
use crate::models::{LicenseFilter, NewLicense, StoredLicense};

/// Append-only license persistence.
///
/// `insert` is not idempotent: two calls write two documents. Implementations
/// report failures and never retry on their own.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Persist a license, stamping `createdAt`. Returns the document id.
    async fn insert(&self, license: NewLicense) -> Result<String>;

    /// First license matching every present field of `filter`, if any.
    async fn find_one(&self, filter: &LicenseFilter) -> Result<Option<StoredLicense>>;

    /// Cheap round trip used by the health probe.
    async fn ping(&self) -> Result<()>;
}
