use crate::config::{Config, ReferenceConfig, RenameConfig};
use crate::events::{EventBus, PageEvent};
use crate::link_parser::{LinkExtractor, WikiLinkExtractor};
use crate::link_rewriter::RewriteOptions;
use crate::page_name::{attachment_name, clean_name};
use crate::page_store::{
    open_providers, AttachmentRef, PageStore, Providers, RevisionInfo, StoreError,
};
use crate::reference_graph::ReferenceGraph;
use crate::rename::{PageRenamer, RenameError, RenameResult};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

/// One page collection: storage, its reference graph, and the event bus.
///
/// The graph only reflects storage if every write goes through here (or
/// [`rebuild_references`](Self::rebuild_references) is run afterwards).
pub struct PageRepository {
    providers: Providers,
    graph: Arc<ReferenceGraph>,
    extractor: Arc<dyn LinkExtractor>,
    events: Arc<EventBus>,
    rewrite: RewriteOptions,
    rename_config: RenameConfig,
}

impl PageRepository {
    pub fn new(providers: Providers, references: &ReferenceConfig, rename: &RenameConfig) -> Self {
        Self {
            providers,
            graph: Arc::new(ReferenceGraph::new(references.match_english_plurals)),
            extractor: Arc::new(WikiLinkExtractor::new(references.camel_case_links)),
            events: Arc::new(EventBus::new()),
            rewrite: RewriteOptions {
                camel_case_links: references.camel_case_links,
            },
            rename_config: rename.clone(),
        }
    }

    /// Open the configured store and build the reference graph from it.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let providers = open_providers(&config.store).with_context(|| {
            format!("failed to open page store at {}", config.store.root.display())
        })?;
        let repo = Self::new(providers, &config.references, &config.rename);
        repo.rebuild_references()
            .context("failed to build reference graph")?;
        Ok(repo)
    }

    /// Memory-backed repository with default settings.
    pub fn in_memory() -> Self {
        let config = Config::default();
        Self::new(Providers::in_memory(), &config.references, &config.rename)
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn graph(&self) -> Arc<ReferenceGraph> {
        self.graph.clone()
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn page_store(&self) -> &dyn PageStore {
        self.providers.pages.as_ref()
    }

    pub fn attachments_enabled(&self) -> bool {
        self.providers.attachments.is_some()
    }

    pub fn rename_config(&self) -> &RenameConfig {
        &self.rename_config
    }

    pub fn page_text(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.providers.pages.page_text(&clean_name(name))
    }

    /// Save `text` as a new revision of `name` and rescan it. Returns the
    /// cleaned page name.
    pub fn save_page(&self, name: &str, text: &str, author: &str) -> Result<String, StoreError> {
        let name = clean_name(name);
        if name.is_empty() {
            return Err(StoreError::InvalidName(name));
        }
        self.providers
            .pages
            .put_page_text(&name, text, &RevisionInfo::by(author))?;
        self.graph
            .update_references(&name, self.extractor.scan(&name, text));
        self.events.emit(PageEvent::Saved { page: name.clone() });
        Ok(name)
    }

    pub fn save_attachment(
        &self,
        parent: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<AttachmentRef, StoreError> {
        let Some(store) = &self.providers.attachments else {
            return Err(StoreError::Provider("attachments are disabled".to_string()));
        };
        let parent = clean_name(parent);
        if !self.providers.pages.page_exists(&parent)? {
            return Err(StoreError::NotFound(parent));
        }
        let att = store.put_attachment(&parent, file_name, data)?;
        self.graph.register_page(&att.name());
        Ok(att)
    }

    /// Delete a page with its attachments. Pages linking to it keep their
    /// links, which then show up as uncreated. Returns the cleaned page name.
    pub fn delete_page(&self, name: &str) -> Result<String, StoreError> {
        let name = clean_name(name);
        if name.is_empty() {
            return Err(StoreError::InvalidName(name));
        }
        if let Some(store) = &self.providers.attachments {
            for att in store.list_attachments(&name)? {
                self.graph.page_removed(&att.name());
            }
            store.delete_attachments(&name)?;
        }
        self.providers.pages.delete_page(&name)?;
        self.graph.page_removed(&name);
        self.events.emit(PageEvent::Removed { page: name.clone() });
        Ok(name)
    }

    /// Forget the graph and scan every page and attachment again.
    ///
    /// All names are registered before any page is scanned, so references
    /// resolve the same way regardless of scan order.
    pub fn rebuild_references(&self) -> Result<usize, StoreError> {
        let start = Instant::now();
        self.graph.clear();

        let pages = self.providers.pages.list_pages()?;
        for page in &pages {
            self.graph.register_page(page);
            if let Some(store) = &self.providers.attachments {
                for att in store.list_attachments(page)? {
                    self.graph.register_page(&attachment_name(page, &att.file_name));
                }
            }
        }

        let mut scanned = 0usize;
        for page in &pages {
            match self.providers.pages.page_text(page)? {
                Some(text) => {
                    self.graph
                        .update_references(page, self.extractor.scan(page, &text));
                    scanned += 1;
                }
                None => tracing::warn!("Page {} listed but has no text", page),
            }
        }

        tracing::info!(
            "Reference graph rebuilt: {} pages scanned in {:?}",
            scanned,
            start.elapsed()
        );
        Ok(scanned)
    }

    pub fn renamer(&self) -> PageRenamer {
        PageRenamer::new(
            &self.providers,
            self.graph.clone(),
            self.extractor.clone(),
            self.events.clone(),
        )
        .with_rewrite_options(self.rewrite)
    }

    /// Rename with the configured referrer policy. `author` falls back to
    /// the configured default.
    pub fn rename_page(
        &self,
        from: &str,
        to: &str,
        author: Option<&str>,
        change_referrers: Option<bool>,
    ) -> Result<RenameResult, RenameError> {
        let author = author.unwrap_or(self.rename_config.default_author.as_str());
        let change_referrers = change_referrers.unwrap_or(self.rename_config.change_referrers);
        self.renamer()
            .rename_with_report(author, from, to, change_referrers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderKind, StoreConfig};
    use crate::events::BroadcastSink;
    use std::collections::BTreeSet;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn save_cleans_name_and_updates_graph() {
        let repo = PageRepository::in_memory();
        let name = repo.save_page("my  page", "links to [Other]", "alice").unwrap();

        assert_eq!(name, "My page");
        assert!(repo.graph().contains_page("My page"));
        assert_eq!(repo.graph().find_referenced_by("My page"), set(&["Other"]));
        assert_eq!(repo.page_text("My page").unwrap().as_deref(), Some("links to [Other]"));
    }

    #[test]
    fn names_are_cleaned_on_every_entry_point() {
        let repo = PageRepository::in_memory();
        repo.save_page("my page", "x", "a").unwrap();
        assert_eq!(repo.page_text("my  page").unwrap().as_deref(), Some("x"));

        let att = repo.save_attachment("my page", "foo.txt", b"1").unwrap();
        assert_eq!(att.name(), "My page/foo.txt");
        assert!(repo.graph().contains_page("My page/foo.txt"));

        assert_eq!(repo.delete_page("my page").unwrap(), "My page");
        assert!(!repo.page_store().page_exists("My page").unwrap());
        assert!(!repo.graph().contains_page("My page"));
        assert!(!repo.graph().contains_page("My page/foo.txt"));
    }

    #[test]
    fn save_rejects_unusable_name() {
        let repo = PageRepository::in_memory();
        assert!(matches!(repo.save_page("???", "", "a"), Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn delete_leaves_referrers_dangling() {
        let repo = PageRepository::in_memory();
        repo.save_page("Target", "x", "a").unwrap();
        repo.save_page("Source", "[Target]", "a").unwrap();
        repo.save_attachment("Target", "foo.txt", b"1").unwrap();

        repo.delete_page("Target").unwrap();

        let graph = repo.graph();
        assert!(!graph.contains_page("Target"));
        assert!(!graph.contains_page("Target/foo.txt"));
        assert_eq!(graph.find_uncreated(), set(&["Target"]));
        assert!(!repo.page_store().page_exists("Target").unwrap());
    }

    #[test]
    fn attachment_needs_existing_parent() {
        let repo = PageRepository::in_memory();
        assert!(matches!(
            repo.save_attachment("Nope", "a.txt", b""),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn attachments_disabled_are_rejected() {
        let config = Config::default();
        let providers = Providers {
            attachments: None,
            ..Providers::in_memory()
        };
        let repo = PageRepository::new(providers, &config.references, &config.rename);
        repo.save_page("P", "", "a").unwrap();
        assert!(!repo.attachments_enabled());
        assert!(matches!(
            repo.save_attachment("P", "a.txt", b""),
            Err(StoreError::Provider(_))
        ));
    }

    #[test]
    fn rebuild_is_independent_of_scan_order() {
        let providers = Providers::in_memory();
        let info = RevisionInfo::default();
        // "Alpha" is scanned before "Foobar" exists in a naive single pass.
        providers.pages.put_page_text("Alpha", "[Foobars]", &info).unwrap();
        providers.pages.put_page_text("Foobar", "", &info).unwrap();
        providers.pages.put_page_text("Zed", "[Alpha] [Zed/pic.png]", &info).unwrap();
        providers
            .attachments
            .as_ref()
            .unwrap()
            .put_attachment("Zed", "pic.png", b"")
            .unwrap();

        let config = Config::default();
        let repo = PageRepository::new(providers, &config.references, &config.rename);
        assert_eq!(repo.rebuild_references().unwrap(), 3);

        let graph = repo.graph();
        assert_eq!(graph.find_referenced_by("Alpha"), set(&["Foobar"]));
        assert_eq!(graph.find_referrers("Zed/pic.png"), Some(set(&["Zed"])));
        assert!(graph.find_uncreated().is_empty());
        assert_eq!(graph.find_unreferenced(), set(&["Zed"]));
    }

    #[test]
    fn custom_extractor_is_used_for_scans() {
        struct Everything;
        impl LinkExtractor for Everything {
            fn scan(&self, _page: &str, text: &str) -> Vec<String> {
                text.split_whitespace().map(str::to_string).collect()
            }
        }

        let repo = PageRepository::in_memory().with_extractor(Arc::new(Everything));
        repo.save_page("P", "alpha beta", "a").unwrap();
        assert_eq!(repo.graph().find_referenced_by("P"), set(&["alpha", "beta"]));
    }

    #[test]
    fn rename_uses_configured_defaults() {
        let repo = PageRepository::in_memory();
        repo.save_page("TestPage", "x", "a").unwrap();
        repo.save_page("Ref", "[TestPage]", "a").unwrap();

        let result = repo.rename_page("TestPage", "FooTest", None, None).unwrap();

        assert_eq!(result.rewritten_count(), 1);
        let rev = repo.page_store().latest_revision("Ref").unwrap().unwrap();
        assert_eq!(rev.author.as_deref(), Some("refgraph"));
    }

    #[tokio::test]
    async fn events_reach_broadcast_subscribers() {
        let repo = PageRepository::in_memory();
        let sink = Arc::new(BroadcastSink::new());
        let mut rx = sink.subscribe();
        repo.events().register(sink);

        repo.save_page("A", "", "a").unwrap();
        repo.rename_page("A", "B", None, None).unwrap();
        repo.delete_page("B").unwrap();

        assert_eq!(rx.recv().await.unwrap(), PageEvent::Saved { page: "A".into() });
        assert_eq!(
            rx.recv().await.unwrap(),
            PageEvent::Renamed {
                from: "A".into(),
                to: "B".into()
            }
        );
        assert_eq!(rx.recv().await.unwrap(), PageEvent::Removed { page: "B".into() });
    }

    #[test]
    fn open_filesystem_store_and_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store: StoreConfig {
                provider: ProviderKind::Filesystem,
                root: dir.path().to_path_buf(),
                attachments: true,
            },
            ..Config::default()
        };

        {
            let repo = PageRepository::open(&config).unwrap();
            repo.save_page("Home", "see [Test Page]", "a").unwrap();
            repo.save_page("Test Page", "back to [Home]", "a").unwrap();
        }

        let reopened = PageRepository::open(&config).unwrap();
        let graph = reopened.graph();
        assert_eq!(graph.pages(), set(&["Home", "Test Page"]));
        assert_eq!(graph.find_referrers("Test Page"), Some(set(&["Home"])));
        assert!(graph.find_unreferenced().is_empty());
    }
}
