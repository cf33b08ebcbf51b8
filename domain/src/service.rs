use std::sync::Arc;

use tracing::{info, warn};

use crate::constraint::{NotBlank, UniqueUrl};
use crate::engine::ValidationEngine;
use crate::manager::{PageManager, StagedPages};
use crate::metadata::ClassMetadata;
use crate::registry::ValidatorRegistry;
use crate::validators::not_blank::NotBlankValidator;
use crate::validators::unique_url::UniqueUrlValidator;
use crate::violation::ViolationList;
use crate::{
    Clock, CoreError, NewPage, Page, PageId, PageRepository, SiteId, ValidationError, ROUTE_CMS,
};

fn page_name(page: &Page) -> Option<&str> {
    Some(page.name.as_str())
}

/// Constraints declared for [`Page`]: a non-blank name and a unique url.
pub fn page_metadata() -> Result<ClassMetadata<Page>, ValidationError> {
    ClassMetadata::new("Page")
        .add_property_constraint("name", page_name, NotBlank::default())?
        .add_constraint(UniqueUrl::default())
}

/// Engine wired with every validator the page constraints reference.
pub fn default_engine<R>(repo: R) -> Result<ValidationEngine<Page>, ValidationError>
where
    R: PageRepository + 'static,
{
    let registry = ValidatorRegistry::new()
        .with(NotBlank::VALIDATOR_ID, NotBlankValidator)?
        .with(UniqueUrl::VALIDATOR_ID, UniqueUrlValidator::new(repo))?;
    let engine = ValidationEngine::new(page_metadata()?, registry);
    engine.check_wiring()?;
    Ok(engine)
}

/// Application service orchestrating creation and update of pages.
///
/// Every write computes the page url, runs the validation engine and only
/// persists pages without violations.
pub struct PageService<R: PageRepository, C: Clock> {
    manager: PageManager<Arc<R>>,
    engine: ValidationEngine<Page>,
    clock: C,
}

impl<R: PageRepository + 'static, C: Clock> PageService<R, C> {
    /// Build the service with [`default_engine`] over the same repository.
    pub fn new(repo: Arc<R>, clock: C) -> Result<Self, CoreError> {
        let engine = default_engine(repo.clone())?;
        Ok(Self::with_engine(repo, engine, clock))
    }
}

impl<R: PageRepository, C: Clock> PageService<R, C> {
    pub fn with_engine(repo: Arc<R>, engine: ValidationEngine<Page>, clock: C) -> Self {
        Self {
            manager: PageManager::new(repo),
            engine,
            clock,
        }
    }

    pub fn engine(&self) -> &ValidationEngine<Page> {
        &self.engine
    }

    /// Create and persist a new page.
    pub fn create(&self, input: NewPage) -> Result<Page, CoreError> {
        let Some(site) = input.site else {
            return Err(CoreError::InvalidPage("a page must belong to a site".into()));
        };
        let mut page = Page::new(site, input.name, self.clock.now());
        page.parent = input.parent;
        page.slug = input.slug.filter(|s| !s.is_empty());
        page.route_name = input.route_name.unwrap_or_else(|| ROUTE_CMS.to_string());
        if page.is_hybrid() {
            page.url = input.url;
        }

        self.manager.fix_url(&mut page)?;
        self.ensure_valid(&page)?;
        let page = self.manager.repo().insert(page)?;
        info!(page = ?page.id, site = %site, url = ?page.url, "page created");
        Ok(page)
    }

    /// Validate and persist changes to a stored page along with the urls of
    /// its descendants.
    ///
    /// Every descendant whose url moves is checked against the tree as it
    /// will look after the update; nothing is written unless the page and all
    /// of them pass.
    pub fn update(&self, mut page: Page) -> Result<Page, CoreError> {
        let Some(id) = page.id else {
            return Err(CoreError::InvalidPage("page has not been stored yet".into()));
        };
        if self.manager.repo().get(id)?.is_none() {
            return Err(CoreError::NotFound);
        }
        self.manager.fix_url(&mut page)?;
        self.ensure_valid(&page)?;
        page.updated_at = Some(self.clock.now());

        let descendants = self.manager.plan_url_tree(&page)?;
        self.ensure_descendants_valid(&page, &descendants)?;

        self.manager.repo().update(&page)?;
        for child in &descendants {
            self.manager.repo().update(child)?;
        }
        info!(page = %id, url = ?page.url, cascaded = descendants.len(), "page updated");
        Ok(page)
    }

    /// Run the page constraints without persisting anything.
    pub fn validate(&self, page: &Page) -> Result<ViolationList, CoreError> {
        Ok(self.engine.validate(page)?)
    }

    pub fn get(&self, id: PageId) -> Result<Option<Page>, CoreError> {
        self.manager.repo().get(id)
    }

    pub fn list(&self, site: SiteId, limit: usize) -> Result<Vec<Page>, CoreError> {
        self.manager.repo().list_by_site(site, limit)
    }

    fn ensure_valid(&self, page: &Page) -> Result<(), CoreError> {
        let violations = self.engine.validate(page)?;
        reject_violations(page, violations)
    }

    /// Url checks for moved descendants run against the staged tree, so a
    /// child sees its parent's new url and the other moved pages.
    fn ensure_descendants_valid(&self, page: &Page, descendants: &[Page]) -> Result<(), CoreError> {
        if descendants.is_empty() {
            return Ok(());
        }
        let staged = StagedPages::new(
            self.manager.repo(),
            std::iter::once(page.clone()).chain(descendants.iter().cloned()),
        );
        let unique_url = UniqueUrlValidator::new(staged);
        for child in descendants {
            let violations = self
                .engine
                .validate_with(child, UniqueUrl::VALIDATOR_ID, &unique_url)?;
            reject_violations(child, violations)?;
        }
        Ok(())
    }
}

fn reject_violations(page: &Page, violations: ViolationList) -> Result<(), CoreError> {
    if violations.is_empty() {
        return Ok(());
    }
    warn!(page = ?page.id, url = ?page.url, count = violations.len(), "page rejected");
    Err(CoreError::Invalid(violations))
}
