//! The check behind [`UniqueUrl`]: no two routable pages of a site may share
//! a url.

use tracing::debug;

use crate::constraint::{Constraint, UniqueUrl};
use crate::manager::PageManager;
use crate::registry::{ConstraintValidator, Subject};
use crate::violation::ExecutionContext;
use crate::{Page, PageRepository, ValidationError};

/// Message reported for pages that are not attached to a site.
pub const PAGE_WITHOUT_SITE: &str = "error.page_without_site";

/// Queries stored pages of the same site for a url collision.
///
/// Error and internal pages are exempt on both sides of the comparison. The
/// url checked is the one the page would be saved with, so the candidate is
/// run through [`PageManager::fix_url`] first.
pub struct UniqueUrlValidator<R: PageRepository> {
    manager: PageManager<R>,
}

impl<R: PageRepository> UniqueUrlValidator<R> {
    pub fn new(repo: R) -> Self {
        Self {
            manager: PageManager::new(repo),
        }
    }
}

impl<R: PageRepository> ConstraintValidator<Page> for UniqueUrlValidator<R> {
    fn validate(
        &self,
        subject: Subject<'_, Page>,
        constraint: &dyn Constraint,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), ValidationError> {
        let Subject::Object(page) = subject else {
            return Err(ValidationError::UnexpectedSubject {
                validator_id: UniqueUrl::VALIDATOR_ID,
                subject: subject.describe(),
            });
        };

        let Some(site) = page.site else {
            ctx.add_violation(PAGE_WITHOUT_SITE);
            return Ok(());
        };

        if page.is_error() || page.is_internal() {
            return Ok(());
        }

        let mut candidate = page.clone();
        self.manager
            .fix_url(&mut candidate)
            .map_err(|e| ValidationError::Repository(Box::new(e)))?;
        let Some(url) = candidate.url.as_deref() else {
            return Ok(());
        };

        let stored = self
            .manager
            .repo()
            .find_by_site_and_url(site, url)
            .map_err(|e| ValidationError::Repository(Box::new(e)))?;

        for other in stored
            .iter()
            .filter(|other| !other.is_error() && !other.is_internal())
        {
            if other.url.as_deref() == Some(url) && !candidate.is_same_page(other) {
                debug!(site = %site, url, page = ?page.id, other = ?other.id, "url collision");
                ctx.build_violation(constraint.message())
                    .with_parameter("%url%", url)
                    .at_path("url")
                    .add();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryPageRepo;
    use crate::constraint::NotBlank;
    use crate::engine::ValidationEngine;
    use crate::metadata::ClassMetadata;
    use crate::registry::ValidatorRegistry;
    use crate::translate::Catalog;
    use crate::violation::ViolationList;
    use crate::{CoreError, PageId, SiteId};
    use std::sync::Arc;
    use std::time::SystemTime;

    fn engine(repo: Arc<InMemoryPageRepo>) -> ValidationEngine<Page> {
        engine_with(repo, UniqueUrl::default())
    }

    fn engine_with(repo: Arc<InMemoryPageRepo>, constraint: UniqueUrl) -> ValidationEngine<Page> {
        let meta = ClassMetadata::new("Page").add_constraint(constraint).unwrap();
        let registry = ValidatorRegistry::new()
            .with(UniqueUrl::VALIDATOR_ID, UniqueUrlValidator::new(repo))
            .unwrap();
        ValidationEngine::new(meta, registry)
    }

    fn page_name(p: &Page) -> Option<&str> {
        Some(p.name.as_str())
    }

    fn page(site: u64, name: &str) -> Page {
        Page::new(SiteId(site), name, SystemTime::UNIX_EPOCH)
    }

    /// Root page plus two children both stored at `/about`.
    fn seeded() -> (Arc<InMemoryPageRepo>, Page, Page) {
        let repo = Arc::new(InMemoryPageRepo::new());
        let mut root = page(1, "Home");
        root.url = Some("/".into());
        let root = repo.insert(root).unwrap();
        let mut stored = Vec::new();
        for name in ["About", "About again"] {
            let mut p = page(1, name);
            p.parent = root.id;
            p.slug = Some("about".into());
            p.url = Some("/about".into());
            stored.push(repo.insert(p).unwrap());
        }
        let second = stored.pop().unwrap();
        let first = stored.pop().unwrap();
        (repo, first, second)
    }

    fn only(list: &ViolationList) -> &crate::violation::Violation {
        assert_eq!(list.len(), 1, "expected exactly one violation, got {list:?}");
        list.iter().next().unwrap()
    }

    #[test]
    fn duplicate_url_yields_one_violation_for_either_page() {
        let (repo, first, second) = seeded();
        let engine = engine(repo);
        for p in [&first, &second] {
            let list = engine.validate(p).unwrap();
            let v = only(&list);
            assert_eq!(v.message_template, UniqueUrl::default().message());
            assert_eq!(v.property_path.as_deref(), Some("url"));
            assert_eq!(v.parameters.get("%url%").map(String::as_str), Some("/about"));
        }
    }

    #[test]
    fn custom_message_is_used_for_the_violation() {
        let (repo, first, _) = seeded();
        let engine = engine_with(repo, UniqueUrl::with_message("custom.key"));
        let list = engine.validate(&first).unwrap();
        assert_eq!(only(&list).message_template, "custom.key");
        assert_eq!(only(&list).message, "custom.key");
    }

    #[test]
    fn translated_message_mentions_the_url() {
        let (repo, first, _) = seeded();
        let engine = engine(repo).with_translator(Catalog::english());
        let list = engine.validate(&first).unwrap();
        assert_eq!(only(&list).message, "This URL is already in use: /about");
    }

    #[test]
    fn a_stored_page_does_not_collide_with_itself() {
        let repo = Arc::new(InMemoryPageRepo::new());
        let mut root = page(1, "Home");
        root.url = Some("/".into());
        let root = repo.insert(root).unwrap();
        let engine = engine(repo);
        assert!(engine.validate(&root).unwrap().is_empty());
    }

    #[test]
    fn unsaved_page_colliding_with_stored_page() {
        let (repo, first, _) = seeded();
        let mut fresh = page(1, "About");
        fresh.parent = first.parent;
        let list = engine(repo).validate(&fresh).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn other_sites_do_not_collide() {
        let (repo, _, _) = seeded();
        let mut root = page(2, "Home");
        root.url = Some("/".into());
        let root = repo.insert(root).unwrap();
        let mut about = page(2, "About");
        about.parent = root.id;
        assert!(engine(repo).validate(&about).unwrap().is_empty());
    }

    #[test]
    fn error_and_internal_pages_are_exempt() {
        let (repo, first, _) = seeded();

        let mut error_page = first.clone();
        error_page.id = Some(PageId(100));
        error_page.route_name = "_page_internal_error_not_found".into();
        assert!(engine(repo.clone()).validate(&error_page).unwrap().is_empty());

        let mut internal = first.clone();
        internal.id = Some(PageId(101));
        internal.route_name = "_page_internal_global".into();
        assert!(engine(repo.clone()).validate(&internal).unwrap().is_empty());

        // Stored error pages sharing the url are ignored as well.
        let mut stored_error = page(1, "Not found");
        stored_error.url = Some("/missing".into());
        stored_error.route_name = "_page_internal_error_not_found".into();
        repo.insert(stored_error).unwrap();
        let mut hybrid = page(1, "Missing");
        hybrid.route_name = "missing_route".into();
        hybrid.url = Some("/missing".into());
        assert!(engine(repo).validate(&hybrid).unwrap().is_empty());
    }

    #[test]
    fn hybrid_pages_are_checked_with_their_own_url() {
        let (repo, _, _) = seeded();
        let mut hybrid = page(1, "About route");
        hybrid.route_name = "about_route".into();
        hybrid.url = Some("/about".into());
        assert_eq!(engine(repo).validate(&hybrid).unwrap().len(), 2);
    }

    #[test]
    fn page_without_site_is_reported() {
        let repo = Arc::new(InMemoryPageRepo::new());
        let mut orphan = page(1, "Orphan");
        orphan.site = None;
        let list = engine(repo).validate(&orphan).unwrap();
        assert_eq!(only(&list).message_template, PAGE_WITHOUT_SITE);
    }

    #[test]
    fn missing_parent_surfaces_as_error() {
        let repo = Arc::new(InMemoryPageRepo::new());
        let mut p = page(1, "Lost");
        p.parent = Some(PageId(42));
        match engine(repo).validate(&p).unwrap_err() {
            ValidationError::Repository(source) => {
                assert!(matches!(*source, CoreError::InvalidPage(_)))
            }
            other => panic!("expected a repository error, got {other:?}"),
        }
    }

    #[test]
    fn value_subjects_are_rejected() {
        let repo = Arc::new(InMemoryPageRepo::new());
        let meta = ClassMetadata::<Page>::new("Page")
            .add_property_constraint("name", page_name, NotBlank::default())
            .unwrap();
        // Deliberately wire the unique-url check under the not-blank id.
        let registry = ValidatorRegistry::new()
            .with(NotBlank::VALIDATOR_ID, UniqueUrlValidator::new(repo))
            .unwrap();
        let err = ValidationEngine::new(meta, registry)
            .validate(&page(1, "x"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedSubject { .. }));
    }
}
