use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{CoreError, Page, PageId, PageRepository, SiteId};

/// Simple in-memory repository. Pages are kept in id order behind a mutex.
pub struct InMemoryPageRepo {
    inner: Mutex<Inner>,
}

struct Inner {
    pages: BTreeMap<u64, Page>,
    next_id: u64,
}

impl InMemoryPageRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pages: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl Default for InMemoryPageRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRepository for InMemoryPageRepo {
    fn get(&self, id: PageId) -> Result<Option<Page>, CoreError> {
        let inner = self.lock()?;
        Ok(inner.pages.get(&id.0).cloned())
    }

    fn insert(&self, mut page: Page) -> Result<Page, CoreError> {
        let mut inner = self.lock()?;
        if let Some(id) = page.id {
            if inner.pages.contains_key(&id.0) {
                return Err(CoreError::AlreadyExists);
            }
            inner.next_id = inner.next_id.max(id.0 + 1);
        } else {
            page.id = Some(PageId(inner.next_id));
            inner.next_id += 1;
        }
        let key = page.id.map(|id| id.0).unwrap_or_default();
        inner.pages.insert(key, page.clone());
        Ok(page)
    }

    fn update(&self, page: &Page) -> Result<(), CoreError> {
        let mut inner = self.lock()?;
        let Some(id) = page.id else {
            return Err(CoreError::InvalidPage("page has not been stored yet".into()));
        };
        match inner.pages.get_mut(&id.0) {
            Some(stored) => {
                *stored = page.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }

    fn find_by_site_and_url(&self, site: SiteId, url: &str) -> Result<Vec<Page>, CoreError> {
        let inner = self.lock()?;
        Ok(inner
            .pages
            .values()
            .filter(|p| p.site == Some(site) && p.url.as_deref() == Some(url))
            .cloned()
            .collect())
    }

    fn children(&self, parent: PageId) -> Result<Vec<Page>, CoreError> {
        let inner = self.lock()?;
        Ok(inner
            .pages
            .values()
            .filter(|p| p.parent == Some(parent))
            .cloned()
            .collect())
    }

    fn list_by_site(&self, site: SiteId, limit: usize) -> Result<Vec<Page>, CoreError> {
        let inner = self.lock()?;
        Ok(inner
            .pages
            .values()
            .filter(|p| p.site == Some(site))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn page(site: u64, name: &str, url: &str) -> Page {
        let mut p = Page::new(SiteId(site), name, SystemTime::UNIX_EPOCH);
        p.url = Some(url.into());
        p
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let repo = InMemoryPageRepo::new();
        let a = repo.insert(page(1, "A", "/a")).unwrap();
        let b = repo.insert(page(1, "B", "/b")).unwrap();
        assert_eq!(a.id, Some(PageId(1)));
        assert_eq!(b.id, Some(PageId(2)));
        assert_eq!(repo.get(PageId(2)).unwrap().unwrap().name, "B");
        assert!(repo.get(PageId(3)).unwrap().is_none());
    }

    #[test]
    fn insert_with_existing_id_conflicts() {
        let repo = InMemoryPageRepo::new();
        let a = repo.insert(page(1, "A", "/a")).unwrap();
        let err = repo.insert(a).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists));

        let mut explicit = page(1, "C", "/c");
        explicit.id = Some(PageId(10));
        repo.insert(explicit).unwrap();
        let next = repo.insert(page(1, "D", "/d")).unwrap();
        assert_eq!(next.id, Some(PageId(11)));
    }

    #[test]
    fn find_by_site_and_url_is_site_scoped() {
        let repo = InMemoryPageRepo::new();
        repo.insert(page(1, "A", "/about")).unwrap();
        repo.insert(page(1, "B", "/about")).unwrap();
        repo.insert(page(2, "C", "/about")).unwrap();
        repo.insert(page(1, "D", "/contact")).unwrap();
        assert_eq!(repo.find_by_site_and_url(SiteId(1), "/about").unwrap().len(), 2);
        assert_eq!(repo.find_by_site_and_url(SiteId(2), "/about").unwrap().len(), 1);
        assert!(repo.find_by_site_and_url(SiteId(3), "/about").unwrap().is_empty());
    }

    #[test]
    fn update_requires_stored_page() {
        let repo = InMemoryPageRepo::new();
        let err = repo.update(&page(1, "A", "/a")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPage(_)));

        let mut missing = page(1, "A", "/a");
        missing.id = Some(PageId(5));
        assert!(matches!(repo.update(&missing).unwrap_err(), CoreError::NotFound));

        let mut stored = repo.insert(page(1, "A", "/a")).unwrap();
        stored.url = Some("/b".into());
        repo.update(&stored).unwrap();
        assert_eq!(
            repo.get(stored.id.unwrap()).unwrap().unwrap().url.as_deref(),
            Some("/b")
        );
    }

    #[test]
    fn children_and_listing() {
        let repo = InMemoryPageRepo::new();
        let root = repo.insert(page(1, "Home", "/")).unwrap();
        for i in 0..3 {
            let mut child = page(1, &format!("C{i}"), &format!("/c{i}"));
            child.parent = root.id;
            repo.insert(child).unwrap();
        }
        repo.insert(page(2, "Other", "/")).unwrap();
        assert_eq!(repo.children(root.id.unwrap()).unwrap().len(), 3);
        assert_eq!(repo.list_by_site(SiteId(1), 10).unwrap().len(), 4);
        assert_eq!(repo.list_by_site(SiteId(1), 2).unwrap().len(), 2);
        assert_eq!(repo.list_by_site(SiteId(2), 10).unwrap().len(), 1);
    }
}
