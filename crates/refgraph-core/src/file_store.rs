//! Directory-backed provider.
//!
//! Layout under the root, with names percent-encoded:
//!
//! ```text
//! Test%20Page.txt               latest text
//! Test%20Page.properties.toml   latest revision metadata
//! Test%20Page-att/foo.txt       attachments
//! ```

use crate::page_store::{
    AttachmentRef, AttachmentStore, PageRevision, PageStore, Result, RevisionInfo, StoreError,
};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TEXT_EXT: &str = ".txt";
const PROPERTIES_EXT: &str = ".properties.toml";
const ATTACHMENT_DIR_SUFFIX: &str = "-att";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Use `root` as the page directory, creating it if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn encode(name: &str) -> Result<String> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(urlencoding::encode(name).into_owned())
    }

    fn text_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}{}", Self::encode(name)?, TEXT_EXT)))
    }

    fn properties_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(format!("{}{}", Self::encode(name)?, PROPERTIES_EXT)))
    }

    fn attachment_dir(&self, parent: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(format!("{}{}", Self::encode(parent)?, ATTACHMENT_DIR_SUFFIX)))
    }

    fn read_properties(&self, name: &str) -> Result<Option<PageRevision>> {
        let raw = match fs::read_to_string(self.properties_path(name)?) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Properties {
                page: name.to_string(),
                message: e.to_string(),
            })
    }

    fn write_properties(&self, name: &str, revision: &PageRevision) -> Result<()> {
        let raw = toml::to_string(revision).map_err(|e| StoreError::Properties {
            page: name.to_string(),
            message: e.to_string(),
        })?;
        fs::write(self.properties_path(name)?, raw)?;
        Ok(())
    }
}

/// Remove a file, treating "already gone" as success.
fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl PageStore for FileStore {
    fn provider_name(&self) -> &'static str {
        "filesystem"
    }

    fn page_exists(&self, name: &str) -> Result<bool> {
        Ok(self.text_path(name)?.is_file())
    }

    fn page_text(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.text_path(name)?) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_page_text(&self, name: &str, text: &str, info: &RevisionInfo) -> Result<()> {
        let previous = self.read_properties(name)?;
        let revision = PageRevision::next(previous.as_ref(), info);
        fs::write(self.text_path(name)?, text)?;
        self.write_properties(name, &revision)
    }

    fn delete_page(&self, name: &str) -> Result<()> {
        let text = self.text_path(name)?;
        if !text.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_file(text)?;
        remove_if_present(&self.properties_path(name)?)?;
        Ok(())
    }

    fn move_page(&self, from: &str, to: &str) -> Result<()> {
        let from_text = self.text_path(from)?;
        let to_text = self.text_path(to)?;
        if !from_text.is_file() {
            return Err(StoreError::NotFound(from.to_string()));
        }
        if to_text.exists() {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }
        fs::rename(&from_text, &to_text)?;
        let from_props = self.properties_path(from)?;
        if from_props.is_file() {
            fs::rename(from_props, self.properties_path(to)?)?;
        }
        Ok(())
    }

    fn list_pages(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(encoded) = file_name.to_str().and_then(|f| f.strip_suffix(TEXT_EXT)) else {
                continue;
            };
            match urlencoding::decode(encoded) {
                Ok(name) => names.push(name.into_owned()),
                Err(e) => tracing::warn!("Skipping undecodable page file {:?}: {}", file_name, e),
            }
        }
        names.sort();
        Ok(names)
    }

    fn latest_revision(&self, name: &str) -> Result<Option<PageRevision>> {
        if !self.page_exists(name)? {
            return Ok(None);
        }
        self.read_properties(name)
    }
}

impl AttachmentStore for FileStore {
    fn list_attachments(&self, parent: &str) -> Result<Vec<AttachmentRef>> {
        let dir = self.attachment_dir(parent)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let Some(encoded) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(file_name) = urlencoding::decode(&encoded) else {
                continue;
            };
            found.push(AttachmentRef {
                parent: parent.to_string(),
                file_name: file_name.into_owned(),
                size: meta.len(),
            });
        }
        found.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(found)
    }

    fn put_attachment(&self, parent: &str, file_name: &str, data: &[u8]) -> Result<AttachmentRef> {
        if file_name.is_empty() || file_name.contains('/') {
            return Err(StoreError::InvalidName(file_name.to_string()));
        }
        let dir = self.attachment_dir(parent)?;
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(urlencoding::encode(file_name).as_ref()), data)?;
        Ok(AttachmentRef {
            parent: parent.to_string(),
            file_name: file_name.to_string(),
            size: data.len() as u64,
        })
    }

    fn move_attachments(&self, from: &str, to: &str) -> Result<()> {
        let from_dir = self.attachment_dir(from)?;
        if !from_dir.is_dir() {
            return Ok(());
        }
        let to_dir = self.attachment_dir(to)?;
        if to_dir.exists() {
            return Err(StoreError::AlreadyExists(format!("{}/", to)));
        }
        fs::rename(from_dir, to_dir)?;
        Ok(())
    }

    fn delete_attachments(&self, parent: &str) -> Result<()> {
        match fs::remove_dir_all(self.attachment_dir(parent)?) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
