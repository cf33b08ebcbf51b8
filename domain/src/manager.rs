//! Page url maintenance.
//!
//! CMS page urls are derived from the page tree: a root page lives at `/`
//! and every child appends its slug to the parent url. Hybrid pages keep the
//! url of the route they are bound to, internal pages have none.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::slug::slugify;
use crate::{CoreError, Page, PageId, PageRepository, SiteId};

/// Recompute `page.url` (and its slug where derived) given its parent.
pub fn compute_url(page: &mut Page, parent: Option<&Page>) {
    if page.is_internal() {
        page.url = None;
        return;
    }
    if page.is_hybrid() {
        return;
    }
    match parent {
        Some(parent) => {
            let slug = match page.slug.as_deref() {
                Some(s) if !s.is_empty() => s.to_string(),
                _ => slugify(&page.name),
            };
            let base = match parent.url.as_deref() {
                Some("/") => "/".to_string(),
                Some(u) if u.ends_with('/') => u.to_string(),
                Some(u) => format!("{u}/"),
                None => "/".to_string(),
            };
            page.url = Some(format!("{base}{slug}"));
            page.slug = Some(slug);
        }
        None => {
            page.slug = None;
            page.url = Some("/".to_string());
        }
    }
}

/// Repository-aware url maintenance.
pub struct PageManager<R: PageRepository> {
    repo: R,
}

impl<R: PageRepository> PageManager<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Recompute the url of `page`, loading its parent from the repository.
    pub fn fix_url(&self, page: &mut Page) -> Result<(), CoreError> {
        self.check_ancestry(page)?;
        let parent = match page.parent {
            Some(id) => Some(self.repo.get(id)?.ok_or_else(|| {
                CoreError::InvalidPage(format!("parent page {id} does not exist"))
            })?),
            None => None,
        };
        compute_url(page, parent.as_ref());
        Ok(())
    }

    /// Reject a stored page whose parent chain leads back to itself.
    pub fn check_ancestry(&self, page: &Page) -> Result<(), CoreError> {
        let Some(id) = page.id else {
            return Ok(());
        };
        let mut seen = BTreeSet::new();
        let mut next = page.parent;
        while let Some(ancestor) = next {
            if ancestor == id {
                return Err(CoreError::InvalidPage(format!(
                    "page {id} cannot be placed below itself"
                )));
            }
            if !seen.insert(ancestor) {
                warn!(page = %id, ancestor = %ancestor, "stored page tree loops above page");
                break;
            }
            next = self.repo.get(ancestor)?.and_then(|p| p.parent);
        }
        Ok(())
    }

    /// Descendants of `page` whose url changes when their urls are derived
    /// from `page` as given, parents before children. Nothing is written.
    pub fn plan_url_tree(&self, page: &Page) -> Result<Vec<Page>, CoreError> {
        let Some(root) = page.id else {
            return Ok(Vec::new());
        };
        let mut seen = BTreeSet::from([root]);
        let mut pending = VecDeque::from([page.clone()]);
        let mut changed = Vec::new();
        while let Some(parent) = pending.pop_front() {
            let Some(parent_id) = parent.id else {
                continue;
            };
            for mut child in self.repo.children(parent_id)? {
                let Some(child_id) = child.id else {
                    continue;
                };
                if !seen.insert(child_id) {
                    warn!(page = %parent_id, child = %child_id, "page tree loops back, child skipped");
                    continue;
                }
                let before = child.url.clone();
                compute_url(&mut child, Some(&parent));
                if child.url != before {
                    changed.push(child.clone());
                }
                pending.push_back(child);
            }
        }
        Ok(changed)
    }

    /// Recompute and persist the urls of every descendant of `page`.
    ///
    /// Returns the number of descendants whose url changed.
    pub fn fix_url_tree(&self, page: &Page) -> Result<usize, CoreError> {
        let changed = self.plan_url_tree(page)?;
        for child in &changed {
            debug!(page = ?page.id, child = ?child.id, url = ?child.url, "child url updated");
            self.repo.update(child)?;
        }
        Ok(changed.len())
    }
}

/// Read-only view of a repository with pending page changes laid over the
/// stored rows, so checks can see a tree before it is written.
pub struct StagedPages<'a, R: PageRepository> {
    base: &'a R,
    pages: BTreeMap<PageId, Page>,
}

impl<'a, R: PageRepository> StagedPages<'a, R> {
    /// Pages without an id cannot replace a stored row and are ignored.
    pub fn new<I>(base: &'a R, pages: I) -> Self
    where
        I: IntoIterator<Item = Page>,
    {
        let pages = pages
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect();
        Self { base, pages }
    }

    fn overlay<F>(&self, stored: Vec<Page>, keep: F) -> Vec<Page>
    where
        F: Fn(&Page) -> bool,
    {
        let mut out: Vec<Page> = stored
            .into_iter()
            .filter(|p| p.id.map_or(true, |id| !self.pages.contains_key(&id)))
            .collect();
        out.extend(self.pages.values().filter(|p| keep(p)).cloned());
        out.sort_by_key(|p| p.id);
        out
    }
}

impl<R: PageRepository> PageRepository for StagedPages<'_, R> {
    fn get(&self, id: PageId) -> Result<Option<Page>, CoreError> {
        match self.pages.get(&id) {
            Some(page) => Ok(Some(page.clone())),
            None => self.base.get(id),
        }
    }

    fn insert(&self, _page: Page) -> Result<Page, CoreError> {
        Err(CoreError::Repository("staged pages are read-only".into()))
    }

    fn update(&self, _page: &Page) -> Result<(), CoreError> {
        Err(CoreError::Repository("staged pages are read-only".into()))
    }

    fn find_by_site_and_url(&self, site: SiteId, url: &str) -> Result<Vec<Page>, CoreError> {
        let stored = self.base.find_by_site_and_url(site, url)?;
        Ok(self.overlay(stored, |p| p.site == Some(site) && p.url.as_deref() == Some(url)))
    }

    fn children(&self, parent: PageId) -> Result<Vec<Page>, CoreError> {
        let stored = self.base.children(parent)?;
        Ok(self.overlay(stored, |p| p.parent == Some(parent)))
    }

    fn list_by_site(&self, site: SiteId, limit: usize) -> Result<Vec<Page>, CoreError> {
        let stored = self.base.list_by_site(site, limit)?;
        let mut pages = self.overlay(stored, |p| p.site == Some(site));
        pages.truncate(limit);
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryPageRepo;
    use crate::{SiteId, ROUTE_CMS};
    use std::time::SystemTime;

    fn page(name: &str) -> Page {
        Page::new(SiteId(1), name, SystemTime::UNIX_EPOCH)
    }

    fn with_url(name: &str, url: &str) -> Page {
        let mut p = page(name);
        p.url = Some(url.into());
        p
    }

    #[test]
    fn root_page_lives_at_slash() {
        let mut root = page("Home");
        root.slug = Some("home".into());
        compute_url(&mut root, None);
        assert_eq!(root.url.as_deref(), Some("/"));
        assert_eq!(root.slug, None);
    }

    #[test]
    fn child_urls_join_parent_and_slug() {
        let mut about = page("About Us");
        compute_url(&mut about, Some(&with_url("Home", "/")));
        assert_eq!(about.url.as_deref(), Some("/about-us"));
        assert_eq!(about.slug.as_deref(), Some("about-us"));

        let mut team = page("Team");
        team.slug = Some("the-team".into());
        compute_url(&mut team, Some(&with_url("About", "/about")));
        assert_eq!(team.url.as_deref(), Some("/about/the-team"));

        let mut post = page("Post");
        compute_url(&mut post, Some(&with_url("Blog", "/blog/")));
        assert_eq!(post.url.as_deref(), Some("/blog/post"));
    }

    #[test]
    fn hybrid_and_internal_pages() {
        let mut hybrid = with_url("Blog", "/news");
        hybrid.route_name = "blog_index".into();
        compute_url(&mut hybrid, Some(&with_url("Home", "/")));
        assert_eq!(hybrid.url.as_deref(), Some("/news"));

        let mut internal = with_url("Footer", "/footer");
        internal.route_name = "_page_internal_footer".into();
        compute_url(&mut internal, None);
        assert_eq!(internal.url, None);
    }

    #[test]
    fn missing_parent_is_invalid() {
        let manager = PageManager::new(InMemoryPageRepo::new());
        let mut orphan = page("Orphan");
        orphan.parent = Some(crate::PageId(99));
        let err = manager.fix_url(&mut orphan).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPage(_)));
    }

    #[test]
    fn tree_fix_cascades_to_grandchildren() {
        let repo = InMemoryPageRepo::new();
        let root = repo.insert(with_url("Home", "/")).unwrap();
        let mut about = page("About");
        about.parent = root.id;
        about.url = Some("/about".into());
        about.slug = Some("about".into());
        let about = repo.insert(about).unwrap();
        let mut team = page("Team");
        team.parent = about.id;
        team.url = Some("/about/team".into());
        team.slug = Some("team".into());
        let team = repo.insert(team).unwrap();

        let mut renamed = about.clone();
        renamed.slug = Some("company".into());
        renamed.route_name = ROUTE_CMS.into();
        let manager = PageManager::new(repo);
        manager.fix_url(&mut renamed).unwrap();
        assert_eq!(renamed.url.as_deref(), Some("/company"));
        manager.repo().update(&renamed).unwrap();

        assert_eq!(manager.fix_url_tree(&renamed).unwrap(), 1);
        let team = manager.repo().get(team.id.unwrap()).unwrap().unwrap();
        assert_eq!(team.url.as_deref(), Some("/company/team"));
        assert_eq!(manager.fix_url_tree(&renamed).unwrap(), 0);
    }

    fn child_of(parent: &Page, name: &str, slug: &str) -> Page {
        let mut p = page(name);
        p.parent = parent.id;
        p.slug = Some(slug.into());
        p.url = Some(format!("{}/{slug}", parent.url.as_deref().unwrap_or("").trim_end_matches('/')));
        p
    }

    #[test]
    fn page_cannot_become_its_own_ancestor() {
        let repo = InMemoryPageRepo::new();
        let root = repo.insert(with_url("Home", "/")).unwrap();
        let about = repo.insert(child_of(&root, "About", "about")).unwrap();
        let team = repo.insert(child_of(&about, "Team", "team")).unwrap();
        let manager = PageManager::new(repo);

        let mut itself = about.clone();
        itself.parent = about.id;
        assert!(matches!(manager.fix_url(&mut itself), Err(CoreError::InvalidPage(_))));

        let mut below_child = about.clone();
        below_child.parent = team.id;
        assert!(matches!(manager.fix_url(&mut below_child), Err(CoreError::InvalidPage(_))));

        let mut moved = team.clone();
        moved.parent = root.id;
        manager.fix_url(&mut moved).unwrap();
        assert_eq!(moved.url.as_deref(), Some("/team"));
    }

    #[test]
    fn stored_loop_does_not_hang_the_tree_walk() {
        let repo = InMemoryPageRepo::new();
        let mut looped = with_url("Loop", "/loop");
        looped.id = Some(crate::PageId(7));
        looped.parent = looped.id;
        let looped = repo.insert(looped).unwrap();
        let manager = PageManager::new(repo);

        let mut fixed = looped.clone();
        fixed.parent = None;
        manager.fix_url(&mut fixed).unwrap();
        assert_eq!(manager.fix_url_tree(&fixed).unwrap(), 0);
        assert!(manager.plan_url_tree(&fixed).unwrap().is_empty());
    }

    #[test]
    fn plan_leaves_the_store_untouched() {
        let repo = InMemoryPageRepo::new();
        let root = repo.insert(with_url("Home", "/")).unwrap();
        let about = repo.insert(child_of(&root, "About", "about")).unwrap();
        let team = repo.insert(child_of(&about, "Team", "team")).unwrap();
        repo.insert(child_of(&team, "Alice", "alice")).unwrap();
        let manager = PageManager::new(repo);

        let mut renamed = about.clone();
        renamed.slug = Some("company".into());
        manager.fix_url(&mut renamed).unwrap();
        let plan = manager.plan_url_tree(&renamed).unwrap();
        let urls: Vec<_> = plan.iter().map(|p| p.url.as_deref()).collect();
        assert_eq!(urls, vec![Some("/company/team"), Some("/company/team/alice")]);

        let stored = manager.repo().get(team.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.url.as_deref(), Some("/about/team"));
    }

    #[test]
    fn staged_pages_shadow_stored_rows() {
        let repo = InMemoryPageRepo::new();
        let root = repo.insert(with_url("Home", "/")).unwrap();
        let about = repo.insert(child_of(&root, "About", "about")).unwrap();

        let mut moved = about.clone();
        moved.url = Some("/company".into());
        let staged = StagedPages::new(&repo, [moved]);

        assert!(staged.find_by_site_and_url(SiteId(1), "/about").unwrap().is_empty());
        let found = staged.find_by_site_and_url(SiteId(1), "/company").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, about.id);
        let got = staged.get(about.id.unwrap()).unwrap().unwrap();
        assert_eq!(got.url.as_deref(), Some("/company"));
        assert_eq!(staged.children(root.id.unwrap()).unwrap().len(), 1);
        assert!(staged.update(&got).is_err());

        let stored = repo.get(about.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.url.as_deref(), Some("/about"));
    }
}
