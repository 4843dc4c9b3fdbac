//! Storage collaborator contracts.
//!
//! Pages and attachments are split into two capability traits. A deployment
//! without attachment support simply has no [`AttachmentStore`].

use crate::config::{ProviderKind, StoreConfig};
use crate::file_store::FileStore;
use crate::memory_store::MemoryStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("page not found: {0}")]
    NotFound(String),

    #[error("page already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid page name: {0:?}")]
    InvalidName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad properties for {page}: {message}")]
    Properties { page: String, message: String },

    /// Anything a provider wants to report that has no better home.
    #[error("{0}")]
    Provider(String),
}

/// Who is writing a revision and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionInfo {
    pub author: Option<String>,
    pub change_note: Option<String>,
}

impl RevisionInfo {
    pub fn by(author: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            change_note: None,
        }
    }

    pub fn with_change_note(mut self, note: impl Into<String>) -> Self {
        self.change_note = Some(note.into());
        self
    }
}

/// Metadata of a stored revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRevision {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_note: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl PageRevision {
    /// The revision that follows `previous` (or the first one).
    pub fn next(previous: Option<&PageRevision>, info: &RevisionInfo) -> Self {
        Self {
            version: previous.map_or(1, |p| p.version + 1),
            author: info.author.clone(),
            change_note: info.change_note.clone(),
            saved_at: Utc::now(),
        }
    }
}

/// A file attached to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub parent: String,
    pub file_name: String,
    pub size: u64,
}

impl AttachmentRef {
    /// Graph name of the attachment, `Parent/file`.
    pub fn name(&self) -> String {
        crate::page_name::attachment_name(&self.parent, &self.file_name)
    }
}

pub trait PageStore: Send + Sync {
    /// Short identifier used in logs (`memory`, `filesystem`).
    fn provider_name(&self) -> &'static str;

    fn page_exists(&self, name: &str) -> Result<bool>;

    /// Latest text of `name`, `None` if there is no such page.
    fn page_text(&self, name: &str) -> Result<Option<String>>;

    /// Store a new revision of `name`, creating the page if needed.
    fn put_page_text(&self, name: &str, text: &str, info: &RevisionInfo) -> Result<()>;

    fn delete_page(&self, name: &str) -> Result<()>;

    /// Move a page and its history. Fails with `NotFound` / `AlreadyExists`.
    fn move_page(&self, from: &str, to: &str) -> Result<()>;

    /// All page names, sorted.
    fn list_pages(&self) -> Result<Vec<String>>;

    fn latest_revision(&self, name: &str) -> Result<Option<PageRevision>>;
}

pub trait AttachmentStore: Send + Sync {
    fn list_attachments(&self, parent: &str) -> Result<Vec<AttachmentRef>>;

    fn put_attachment(&self, parent: &str, file_name: &str, data: &[u8]) -> Result<AttachmentRef>;

    /// Re-home every attachment of `from` under `to`. No-op if there are none.
    fn move_attachments(&self, from: &str, to: &str) -> Result<()>;

    fn delete_attachments(&self, parent: &str) -> Result<()>;
}

/// The storage collaborators a repository runs against.
#[derive(Clone)]
pub struct Providers {
    pub pages: Arc<dyn PageStore>,
    pub attachments: Option<Arc<dyn AttachmentStore>>,
}

impl Providers {
    /// Memory-backed providers with attachments enabled.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            pages: store.clone(),
            attachments: Some(store),
        }
    }
}

/// Build the providers named by `config.provider`.
pub fn open_providers(config: &StoreConfig) -> Result<Providers> {
    let providers = match config.provider {
        ProviderKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            Providers {
                pages: store.clone(),
                attachments: config
                    .attachments
                    .then(|| store as Arc<dyn AttachmentStore>),
            }
        }
        ProviderKind::Filesystem => {
            let store = Arc::new(FileStore::open(&config.root)?);
            Providers {
                pages: store.clone(),
                attachments: config
                    .attachments
                    .then(|| store as Arc<dyn AttachmentStore>),
            }
        }
    };
    tracing::info!(
        "Opened {} page store (attachments {})",
        providers.pages.provider_name(),
        if providers.attachments.is_some() { "on" } else { "off" }
    );
    Ok(providers)
}
