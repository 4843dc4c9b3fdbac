use crate::page_name::{plural_counterpart, wikify_name};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// ---------------------------------------------------------------------------
// Graph state
// ---------------------------------------------------------------------------

/// The paired maps. Only ever touched through the lock in [`ReferenceGraph`],
/// so a reader always sees both maps as of the same completed write.
#[derive(Debug, Default)]
struct GraphState {
    /// page -> resolved names it links to. Keys are the pages that exist.
    refers_to: HashMap<String, BTreeSet<String>>,
    /// name -> pages linking to it. Never holds an empty set.
    referred_by: HashMap<String, BTreeSet<String>>,
    /// page -> targets exactly as extracted, kept for re-resolution.
    literal_refs: HashMap<String, Vec<String>>,
}

impl GraphState {
    fn exists(&self, name: &str) -> bool {
        self.refers_to.contains_key(name)
    }

    /// Map a link target to the name it is recorded under.
    ///
    /// Order: exact, plural counterpart, legacy spelling, plural counterpart
    /// of the legacy spelling. Falls back to the literal name, which then
    /// stands for an uncreated page. A counterpart equal to `page` is never
    /// chosen, so `Foobar` linking to `[Foobars]` is not a self-reference.
    fn resolve(&self, name: &str, page: &str, plurals: bool) -> String {
        if name == page || self.exists(name) {
            return name.to_string();
        }
        if plurals {
            if let Some(counterpart) = plural_counterpart(name) {
                if counterpart != page && self.exists(&counterpart) {
                    return counterpart;
                }
            }
        }
        if !name.contains('/') {
            let legacy = wikify_name(name);
            if legacy != name {
                if legacy == page || self.exists(&legacy) {
                    return legacy;
                }
                if plurals {
                    if let Some(counterpart) = plural_counterpart(&legacy) {
                        if counterpart != page && self.exists(&counterpart) {
                            return counterpart;
                        }
                    }
                }
            }
        }
        name.to_string()
    }

    /// Replace `page`'s outbound set and diff-update `referred_by`.
    fn replace_outbound(&mut self, page: &str, targets: Vec<String>, plurals: bool) {
        let resolved: BTreeSet<String> = targets
            .iter()
            .map(|t| self.resolve(t, page, plurals))
            .collect();
        let old = self
            .refers_to
            .insert(page.to_string(), resolved.clone())
            .unwrap_or_default();
        self.literal_refs.insert(page.to_string(), targets);

        for gone in old.difference(&resolved) {
            self.unlink(page, gone);
        }
        for added in resolved.difference(&old) {
            self.referred_by
                .entry(added.clone())
                .or_default()
                .insert(page.to_string());
        }
    }

    /// Drop `referrer` from `target`'s referrer set, pruning it when empty.
    fn unlink(&mut self, referrer: &str, target: &str) {
        if let Some(referrers) = self.referred_by.get_mut(target) {
            referrers.remove(referrer);
            if referrers.is_empty() {
                self.referred_by.remove(target);
            }
        }
    }

    /// `page` just came into existence: pages that were linking to its
    /// plural/singular counterpart may have meant `page` all along.
    fn reresolve_counterpart_referrers(&mut self, page: &str, plurals: bool) {
        let Some(counterpart) = plural_counterpart(page) else {
            return;
        };
        let referrers: Vec<String> = self
            .referred_by
            .get(&counterpart)
            .map(|set| set.iter().filter(|r| *r != page).cloned().collect())
            .unwrap_or_default();

        for referrer in referrers {
            if let Some(literal) = self.literal_refs.get(&referrer).cloned() {
                tracing::debug!(
                    "Re-resolving references of {} after {} was created",
                    referrer,
                    page
                );
                self.replace_outbound(&referrer, literal, plurals);
            }
        }
    }

    /// Referrers of `page`, plus those recorded under its counterpart when
    /// the counterpart is only a placeholder (not a page of its own).
    fn referrers(&self, page: &str, plurals: bool) -> BTreeSet<String> {
        let mut found = self.referred_by.get(page).cloned().unwrap_or_default();
        if plurals {
            if let Some(counterpart) = plural_counterpart(page) {
                if !self.exists(&counterpart) {
                    if let Some(more) = self.referred_by.get(&counterpart) {
                        found.extend(more.iter().cloned());
                    }
                }
            }
        }
        found
    }
}

// ---------------------------------------------------------------------------
// ReferenceGraph
// ---------------------------------------------------------------------------

/// Bidirectional page reference graph.
///
/// `refers_to` and `referred_by` are kept as exact inverses: `q` is in
/// `referred_by[p]` iff `p` is in `refers_to[q]`. All mutations take a single
/// write lock covering both maps; queries take the read lock and return
/// owned copies.
///
/// Unknown names are fine everywhere. A name that is linked to but was never
/// scanned is an *uncreated* page.
#[derive(Debug)]
pub struct ReferenceGraph {
    state: RwLock<GraphState>,
    match_english_plurals: bool,
}

impl Default for ReferenceGraph {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ReferenceGraph {
    pub fn new(match_english_plurals: bool) -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
            match_english_plurals,
        }
    }

    pub fn matches_english_plurals(&self) -> bool {
        self.match_english_plurals
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the outbound references of `page` with `targets`.
    ///
    /// The first call for a page also marks it as existing. Targets are
    /// resolved against existing pages (see plural matching); empty names
    /// are ignored. Calling twice with the same targets is a no-op the
    /// second time.
    pub fn update_references<I, S>(&self, page: &str, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets: Vec<String> = targets
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut state = self.write();
        let is_new = !state.exists(page);
        state.replace_outbound(page, targets, self.match_english_plurals);
        if is_new && self.match_english_plurals {
            state.reresolve_counterpart_referrers(page, self.match_english_plurals);
        }
    }

    /// Mark `page` as existing without outbound references (attachments).
    pub fn register_page(&self, page: &str) {
        self.update_references(page, std::iter::empty::<&str>());
    }

    /// Forget `page`'s outbound references and its existence.
    ///
    /// Pages that still link to it keep their entries, so `page` turns into
    /// an uncreated name until those referrers are rescanned.
    pub fn page_removed(&self, page: &str) {
        let mut state = self.write();
        if let Some(old) = state.refers_to.remove(page) {
            for target in &old {
                state.unlink(page, target);
            }
        }
        state.literal_refs.remove(page);
        if state.referred_by.get(page).is_some_and(BTreeSet::is_empty) {
            state.referred_by.remove(page);
        }
        tracing::debug!("Removed {} from reference graph", page);
    }

    /// Pages that link to `page`, or `None` when nothing does.
    pub fn find_referrers(&self, page: &str) -> Option<BTreeSet<String>> {
        let referrers = self.read().referrers(page, self.match_english_plurals);
        (!referrers.is_empty()).then_some(referrers)
    }

    /// Names `page` links to. Empty for pages never scanned.
    pub fn find_referenced_by(&self, page: &str) -> BTreeSet<String> {
        self.read().refers_to.get(page).cloned().unwrap_or_default()
    }

    /// Existing pages nobody links to.
    pub fn find_unreferenced(&self) -> BTreeSet<String> {
        let state = self.read();
        state
            .refers_to
            .keys()
            .filter(|page| state.referrers(page, self.match_english_plurals).is_empty())
            .cloned()
            .collect()
    }

    /// Names that are linked to but are not pages.
    pub fn find_uncreated(&self) -> BTreeSet<String> {
        let state = self.read();
        state
            .referred_by
            .keys()
            .filter(|name| !state.exists(name))
            .cloned()
            .collect()
    }

    pub fn contains_page(&self, page: &str) -> bool {
        self.read().exists(page)
    }

    /// Every page the graph knows to exist, sorted.
    pub fn pages(&self) -> BTreeSet<String> {
        self.read().refers_to.keys().cloned().collect()
    }

    pub fn page_count(&self) -> usize {
        self.read().refers_to.len()
    }

    pub fn clear(&self) {
        *self.write() = GraphState::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
