//! Invoice attachments for purchase orders.
//!
//! Orders only keep an [`InvoiceRef`]; the bytes live behind an
//! [`InvoiceStorage`]. Releasing is best-effort: callers log a failure and
//! carry on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use solo_core::{new_id, InvoiceRef};

use crate::error::{DbError, DbResult};

#[async_trait]
pub trait InvoiceStorage: Send + Sync {
    /// Saves the file and returns the reference to keep on the order.
    async fn store(&self, file_name: &str, bytes: &[u8]) -> DbResult<InvoiceRef>;

    /// Removes a stored file. A file that is already gone is not an error.
    async fn release(&self, invoice: &InvoiceRef) -> DbResult<()>;
}

/// Invoices stored as files under one directory, named by key.
#[derive(Debug, Clone)]
pub struct FsInvoiceStorage {
    root: PathBuf,
}

impl FsInvoiceStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsInvoiceStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

/// Key = random id + the original extension, so two uploads of
/// `facture.pdf` never collide.
fn invoice_key(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}.{}", new_id(), ext.to_ascii_lowercase()),
        None => new_id(),
    }
}

#[async_trait]
impl InvoiceStorage for FsInvoiceStorage {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> DbResult<InvoiceRef> {
        let key = invoice_key(file_name);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DbError::InvoiceStorage(format!("{}: {}", self.root.display(), e)))?;
        tokio::fs::write(self.path_of(&key), bytes)
            .await
            .map_err(|e| DbError::InvoiceStorage(format!("{}: {}", key, e)))?;

        debug!(key = %key, file_name = %file_name, size = bytes.len(), "Stored invoice");
        Ok(InvoiceRef {
            key,
            file_name: file_name.to_string(),
        })
    }

    async fn release(&self, invoice: &InvoiceRef) -> DbResult<()> {
        match tokio::fs::remove_file(self.path_of(&invoice.key)).await {
            Ok(()) => {
                debug!(key = %invoice.key, "Released invoice");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key = %invoice.key, "Invoice file already gone");
                Ok(())
            }
            Err(e) => Err(DbError::InvoiceStorage(format!("{}: {}", invoice.key, e))),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// Keeps invoices in memory; can be told to fail releases.
    #[derive(Default)]
    pub struct MemoryInvoices {
        pub files: Mutex<HashMap<String, Vec<u8>>>,
        pub fail_release: bool,
    }

    #[async_trait]
    impl InvoiceStorage for MemoryInvoices {
        async fn store(&self, file_name: &str, bytes: &[u8]) -> DbResult<InvoiceRef> {
            let key = invoice_key(file_name);
            self.files.lock().await.insert(key.clone(), bytes.to_vec());
            Ok(InvoiceRef {
                key,
                file_name: file_name.to_string(),
            })
        }

        async fn release(&self, invoice: &InvoiceRef) -> DbResult<()> {
            if self.fail_release {
                return Err(DbError::InvoiceStorage("disk unavailable".into()));
            }
            self.files.lock().await.remove(&invoice.key);
            Ok(())
        }
    }
}
