use crate::page_store::{
    AttachmentRef, AttachmentStore, PageRevision, PageStore, Result, RevisionInfo, StoreError,
};
use dashmap::DashMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct StoredRevision {
    meta: PageRevision,
    text: String,
}

/// In-memory provider. Keeps every revision of every page.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pages: DashMap<String, Vec<StoredRevision>>,
    attachments: DashMap<String, BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All revisions of `name`, oldest first.
    pub fn history(&self, name: &str) -> Vec<PageRevision> {
        self.pages
            .get(name)
            .map(|revs| revs.iter().map(|r| r.meta.clone()).collect())
            .unwrap_or_default()
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl PageStore for MemoryStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    fn page_exists(&self, name: &str) -> Result<bool> {
        Ok(self.pages.contains_key(name))
    }

    fn page_text(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .pages
            .get(name)
            .and_then(|revs| revs.last().map(|r| r.text.clone())))
    }

    fn put_page_text(&self, name: &str, text: &str, info: &RevisionInfo) -> Result<()> {
        check_name(name)?;
        let mut revs = self.pages.entry(name.to_string()).or_default();
        let meta = PageRevision::next(revs.last().map(|r| &r.meta), info);
        revs.push(StoredRevision {
            meta,
            text: text.to_string(),
        });
        Ok(())
    }

    fn delete_page(&self, name: &str) -> Result<()> {
        self.pages
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn move_page(&self, from: &str, to: &str) -> Result<()> {
        check_name(to)?;
        if self.pages.contains_key(to) {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }
        let (_, revs) = self
            .pages
            .remove(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        self.pages.insert(to.to_string(), revs);
        Ok(())
    }

    fn list_pages(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.pages.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn latest_revision(&self, name: &str) -> Result<Option<PageRevision>> {
        Ok(self
            .pages
            .get(name)
            .and_then(|revs| revs.last().map(|r| r.meta.clone())))
    }
}

impl AttachmentStore for MemoryStore {
    fn list_attachments(&self, parent: &str) -> Result<Vec<AttachmentRef>> {
        Ok(self
            .attachments
            .get(parent)
            .map(|files| {
                files
                    .iter()
                    .map(|(file_name, data)| AttachmentRef {
                        parent: parent.to_string(),
                        file_name: file_name.clone(),
                        size: data.len() as u64,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn put_attachment(&self, parent: &str, file_name: &str, data: &[u8]) -> Result<AttachmentRef> {
        check_name(parent)?;
        if file_name.is_empty() || file_name.contains('/') {
            return Err(StoreError::InvalidName(file_name.to_string()));
        }
        self.attachments
            .entry(parent.to_string())
            .or_default()
            .insert(file_name.to_string(), data.to_vec());
        Ok(AttachmentRef {
            parent: parent.to_string(),
            file_name: file_name.to_string(),
            size: data.len() as u64,
        })
    }

    fn move_attachments(&self, from: &str, to: &str) -> Result<()> {
        let Some((_, files)) = self.attachments.remove(from) else {
            return Ok(());
        };
        self.attachments.entry(to.to_string()).or_default().extend(files);
        Ok(())
    }

    fn delete_attachments(&self, parent: &str) -> Result<()> {
        self.attachments.remove(parent);
        Ok(())
    }
}
