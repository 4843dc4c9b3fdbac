//! Page rename: moves the page and its attachments in storage, rewrites the
//! links in every page that refers to it and brings the reference graph up
//! to date.

use crate::events::EventBus;
use crate::link_parser::LinkExtractor;
use crate::link_rewriter::{rewrite_links, RewriteOptions};
use crate::page_name::clean_name;
use crate::page_store::{
    AttachmentRef, AttachmentStore, PageStore, Providers, RevisionInfo, StoreError,
};
use crate::reference_graph::ReferenceGraph;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenameError {
    #[error("invalid rename request: {0}")]
    InvalidArgument(String),

    #[error("page {0} is already called that")]
    NoOpRename(String),

    #[error("page not found: {0}")]
    NotFound(String),

    #[error("page already exists: {0}")]
    AlreadyExists(String),

    #[error("storage failed while renaming {from} to {to}: {source}")]
    Store {
        from: String,
        to: String,
        source: StoreError,
    },

    #[error("page {to} (renamed from {from}) could not be saved: {message}")]
    Internal {
        from: String,
        to: String,
        message: String,
    },
}

/// A referring page whose links could not be updated.
#[derive(Error, Debug)]
#[error("failed to update links in {page}: {source}")]
pub struct RewriteFailed {
    pub page: String,
    pub source: StoreError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerOutcome {
    /// Links were rewritten and a new revision saved.
    Rewritten,
    /// Nothing in the text pointed at the old name.
    Unchanged,
}

#[derive(Debug)]
pub struct ReferrerUpdate {
    pub page: String,
    pub outcome: Result<ReferrerOutcome, RewriteFailed>,
}

/// What a rename did.
#[derive(Debug)]
pub struct RenameResult {
    pub old_name: String,
    pub new_name: String,
    pub attachments_moved: usize,
    /// One entry per referring page, in name order. Empty when referrers
    /// were not changed.
    pub referrers: Vec<ReferrerUpdate>,
}

impl RenameResult {
    pub fn rewritten_count(&self) -> usize {
        self.referrers
            .iter()
            .filter(|r| matches!(r.outcome, Ok(ReferrerOutcome::Rewritten)))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RewriteFailed> {
        self.referrers.iter().filter_map(|r| r.outcome.as_ref().err())
    }
}

/// Orchestrates a rename across storage, the reference graph and events.
///
/// Holds no lock for the duration of a rename; only the graph steps take
/// the graph's lock. Concurrent edits to a referrer during a rename are last
/// writer wins.
pub struct PageRenamer {
    pages: Arc<dyn PageStore>,
    attachments: Option<Arc<dyn AttachmentStore>>,
    graph: Arc<ReferenceGraph>,
    extractor: Arc<dyn LinkExtractor>,
    events: Arc<EventBus>,
    rewrite: RewriteOptions,
}

impl PageRenamer {
    pub fn new(
        providers: &Providers,
        graph: Arc<ReferenceGraph>,
        extractor: Arc<dyn LinkExtractor>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            pages: providers.pages.clone(),
            attachments: providers.attachments.clone(),
            graph,
            extractor,
            events,
            rewrite: RewriteOptions::default(),
        }
    }

    pub fn with_rewrite_options(mut self, rewrite: RewriteOptions) -> Self {
        self.rewrite = rewrite;
        self
    }

    /// Rename `from` to `to` and return the name the page ended up with
    /// (`to` after cleaning).
    pub fn rename(
        &self,
        actor: &str,
        from: &str,
        to: &str,
        change_referrers: bool,
    ) -> Result<String, RenameError> {
        self.rename_with_report(actor, from, to, change_referrers)
            .map(|result| result.new_name)
    }

    pub fn rename_with_report(
        &self,
        actor: &str,
        from: &str,
        to: &str,
        change_referrers: bool,
    ) -> Result<RenameResult, RenameError> {
        // 1. Arguments
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(RenameError::InvalidArgument(format!(
                "cannot rename {:?} to {:?}",
                from, to
            )));
        }

        // 2. Clean the new name
        let to = clean_name(to);
        if to.is_empty() {
            return Err(RenameError::InvalidArgument(
                "new name has no usable characters".to_string(),
            ));
        }
        if to == from {
            return Err(RenameError::NoOpRename(to));
        }

        let store_err = |source: StoreError| RenameError::Store {
            from: from.to_string(),
            to: to.clone(),
            source,
        };

        // 3-4. Source must exist, target must not
        if !self.pages.page_exists(from).map_err(store_err)? {
            return Err(RenameError::NotFound(from.to_string()));
        }
        if self.pages.page_exists(&to).map_err(store_err)? {
            return Err(RenameError::AlreadyExists(to.clone()));
        }

        tracing::info!("Renaming page {} to {} (actor: {})", from, to, actor);

        // 5. Referrers, collected before anything moves
        let attachments = self.list_attachments(from);
        let mut referrers = self.graph.find_referrers(from).unwrap_or_default();
        for att in &attachments {
            if let Some(more) = self.graph.find_referrers(&att.name()) {
                referrers.extend(more);
            }
        }

        // 6. Attachments leave the graph under their old names
        for att in &attachments {
            self.graph.page_removed(&att.name());
        }

        // 7. Storage move
        if let Err(e) = self.move_in_storage(from, &to, !attachments.is_empty()) {
            for att in &attachments {
                self.graph.register_page(&att.name());
            }
            return Err(store_err(e));
        }

        // 8. Save the moved page once more so the rename shows in its history
        let info = RevisionInfo::by(actor).with_change_note(format!("{} ==> {}", from, to));
        let saved = match self.pages.page_text(&to) {
            Ok(Some(text)) => self
                .pages
                .put_page_text(&to, &text, &info)
                .map(|_| text)
                .map_err(|e| e.to_string()),
            Ok(None) => Err("page vanished after move".to_string()),
            Err(e) => Err(e.to_string()),
        };
        let text = match saved {
            Ok(text) => text,
            Err(message) => {
                // Storage already holds `to`; the graph still lists `from`.
                let registered = self.reregister_attachments(&to, &attachments);
                tracing::error!(
                    "Rename {} -> {} stopped after the storage move: {}. \
                     Graph still lists {} as existing and not {}; {} attachment(s) registered under {}",
                    from,
                    to,
                    message,
                    from,
                    to,
                    registered,
                    to
                );
                return Err(RenameError::Internal {
                    from: from.to_string(),
                    to,
                    message,
                });
            }
        };

        // 9. Graph: old name goes, new page is scanned
        self.graph.page_removed(from);
        self.graph
            .update_references(&to, self.extractor.scan(&to, &text));

        // 10. Rewrite referrers
        let mut updates = Vec::new();
        if change_referrers {
            let targets: BTreeSet<String> = referrers
                .into_iter()
                .map(|page| if page == from { to.clone() } else { page })
                .collect();
            for page in targets {
                let outcome = self.update_referrer(&page, from, &to, &info);
                match &outcome {
                    Ok(ReferrerOutcome::Rewritten) => {
                        tracing::info!("Updated links to {} in {}", to, page)
                    }
                    Ok(ReferrerOutcome::Unchanged) => {
                        tracing::debug!("No links to {} found in {}", from, page)
                    }
                    Err(e) => tracing::error!("{}", e),
                }
                updates.push(ReferrerUpdate { page, outcome });
            }
        }

        // 11. Attachments come back under the new name
        let attachments_moved = self.reregister_attachments(&to, &attachments);

        // 12. Notify
        self.events.notify_renamed(from, &to);

        let result = RenameResult {
            old_name: from.to_string(),
            new_name: to,
            attachments_moved,
            referrers: updates,
        };
        tracing::info!(
            "Renamed {} to {}: {} referrer(s) rewritten, {} failed",
            result.old_name,
            result.new_name,
            result.rewritten_count(),
            result.failures().count()
        );
        Ok(result)
    }

    fn list_attachments(&self, parent: &str) -> Vec<AttachmentRef> {
        let Some(store) = &self.attachments else {
            return Vec::new();
        };
        store.list_attachments(parent).unwrap_or_else(|e| {
            tracing::warn!("Could not list attachments of {}: {}", parent, e);
            Vec::new()
        })
    }

    /// Move the page, then its attachments. An attachment failure puts the
    /// page back where it was.
    fn move_in_storage(&self, from: &str, to: &str, has_attachments: bool) -> Result<(), StoreError> {
        self.pages.move_page(from, to)?;

        let Some(store) = self.attachments.as_ref().filter(|_| has_attachments) else {
            return Ok(());
        };
        if let Err(e) = store.move_attachments(from, to) {
            if let Err(rollback) = self.pages.move_page(to, from) {
                tracing::error!(
                    "Could not move {} back to {} after attachment move failed: {}",
                    to,
                    from,
                    rollback
                );
            }
            return Err(e);
        }
        Ok(())
    }

    fn update_referrer(
        &self,
        page: &str,
        from: &str,
        to: &str,
        info: &RevisionInfo,
    ) -> Result<ReferrerOutcome, RewriteFailed> {
        let failed = |source: StoreError| RewriteFailed {
            page: page.to_string(),
            source,
        };
        let text = self
            .pages
            .page_text(page)
            .map_err(failed)?
            .ok_or_else(|| failed(StoreError::NotFound(page.to_string())))?;

        let rewritten = rewrite_links(&text, from, to, self.rewrite);
        let outcome = if rewritten == text {
            ReferrerOutcome::Unchanged
        } else {
            self.pages
                .put_page_text(page, &rewritten, info)
                .map_err(failed)?;
            ReferrerOutcome::Rewritten
        };
        self.graph
            .update_references(page, self.extractor.scan(page, &rewritten));
        Ok(outcome)
    }

    fn reregister_attachments(&self, parent: &str, previous: &[AttachmentRef]) -> usize {
        if self.attachments.is_none() || previous.is_empty() {
            return 0;
        }
        let names: Vec<String> = match self.list_attachments_strict(parent) {
            Some(current) => current.iter().map(AttachmentRef::name).collect(),
            None => previous
                .iter()
                .map(|att| crate::page_name::attachment_name(parent, &att.file_name))
                .collect(),
        };
        for name in &names {
            self.graph.register_page(name);
        }
        names.len()
    }

    fn list_attachments_strict(&self, parent: &str) -> Option<Vec<AttachmentRef>> {
        let store = self.attachments.as_ref()?;
        match store.list_attachments(parent) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(
                    "Could not list attachments of {} after rename, using previous listing: {}",
                    parent,
                    e
                );
                None
            }
        }
    }
}
