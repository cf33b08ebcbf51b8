//! Domain library for the CMS page module.
//!
//! Holds the page model, the repository port, the constraint declarations
//! (`UniqueUrl`, `NotBlank`) and the generic validation engine that dispatches
//! them to registered validators. Storage adapters beyond the in-memory one
//! live in separate crates.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;

/// Route name carried by regular CMS pages.
pub const ROUTE_CMS: &str = "page_slug";
/// Prefix of route names reserved for internal pages (blocks, shared content).
pub const ROUTE_INTERNAL_PREFIX: &str = "_page_internal_";
/// Prefix of route names reserved for error pages (404, 500, ...).
pub const ROUTE_ERROR_PREFIX: &str = "_page_internal_error_";

/// Identifier of a site; every page url is unique within one site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SiteId(pub u64);

/// Identifier assigned to a page once it is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PageId(pub u64);

impl Display for SiteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for PageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A CMS page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    /// `None` until the page has been stored.
    pub id: Option<PageId>,
    pub site: Option<SiteId>,
    pub parent: Option<PageId>,
    pub name: String,
    pub slug: Option<String>,
    /// Absolute path of the page within its site, e.g. `/about/team`.
    pub url: Option<String>,
    pub route_name: String,
    pub enabled: bool,
    pub created_at: SystemTime,
    pub updated_at: Option<SystemTime>,
}

impl Page {
    /// Create an unsaved CMS page attached to `site`.
    pub fn new<S: Into<String>>(site: SiteId, name: S, created_at: SystemTime) -> Self {
        Self {
            id: None,
            site: Some(site),
            parent: None,
            name: name.into(),
            slug: None,
            url: None,
            route_name: ROUTE_CMS.to_string(),
            enabled: true,
            created_at,
            updated_at: None,
        }
    }

    pub fn is_cms(&self) -> bool {
        self.route_name == ROUTE_CMS
    }

    pub fn is_internal(&self) -> bool {
        self.route_name.starts_with(ROUTE_INTERNAL_PREFIX)
    }

    pub fn is_error(&self) -> bool {
        self.route_name.starts_with(ROUTE_ERROR_PREFIX)
    }

    /// Hybrid pages are bound to an application route and keep their own url.
    pub fn is_hybrid(&self) -> bool {
        !self.is_cms() && !self.is_internal()
    }

    /// A hybrid page whose url carries route placeholders like `{id}`.
    pub fn is_dynamic(&self) -> bool {
        self.is_hybrid() && self.url.as_deref().is_some_and(|u| u.contains('{'))
    }

    /// Two pages are the same only when both are persisted with equal ids.
    pub fn is_same_page(&self, other: &Page) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }
}

/// Input data for creating a new page.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct NewPage {
    pub site: Option<SiteId>,
    pub name: String,
    pub slug: Option<String>,
    pub parent: Option<PageId>,
    /// Defaults to [`ROUTE_CMS`].
    pub route_name: Option<String>,
    /// Only honoured for hybrid pages; CMS page urls are derived.
    pub url: Option<String>,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Repository port for persisting and loading pages.
pub trait PageRepository: Send + Sync {
    fn get(&self, id: PageId) -> Result<Option<Page>, CoreError>;
    /// Store an unsaved page and return it with its assigned id.
    fn insert(&self, page: Page) -> Result<Page, CoreError>;
    fn update(&self, page: &Page) -> Result<(), CoreError>;
    /// All pages of `site` whose stored url equals `url`.
    fn find_by_site_and_url(&self, site: SiteId, url: &str) -> Result<Vec<Page>, CoreError>;
    /// Direct children of `parent`.
    fn children(&self, parent: PageId) -> Result<Vec<Page>, CoreError>;
    fn list_by_site(&self, site: SiteId, limit: usize) -> Result<Vec<Page>, CoreError>;
}

impl<R: PageRepository + ?Sized> PageRepository for Arc<R> {
    fn get(&self, id: PageId) -> Result<Option<Page>, CoreError> {
        (**self).get(id)
    }

    fn insert(&self, page: Page) -> Result<Page, CoreError> {
        (**self).insert(page)
    }

    fn update(&self, page: &Page) -> Result<(), CoreError> {
        (**self).update(page)
    }

    fn find_by_site_and_url(&self, site: SiteId, url: &str) -> Result<Vec<Page>, CoreError> {
        (**self).find_by_site_and_url(site, url)
    }

    fn children(&self, parent: PageId) -> Result<Vec<Page>, CoreError> {
        (**self).children(parent)
    }

    fn list_by_site(&self, site: SiteId, limit: usize) -> Result<Vec<Page>, CoreError> {
        (**self).list_by_site(site, limit)
    }
}

/// Failures of the validation engine itself. A failed rule is a
/// [`violation::Violation`], never one of these.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no validator registered under `{0}`")]
    ValidatorNotFound(String),
    #[error("a validator is already registered under `{0}`")]
    DuplicateValidator(String),
    #[error("constraint `{validator_id}` targets {actual:?} but was declared as a {expected:?} constraint")]
    TargetMismatch {
        validator_id: &'static str,
        expected: constraint::TargetKind,
        actual: constraint::TargetKind,
    },
    #[error("validator `{validator_id}` cannot validate a {subject}")]
    UnexpectedSubject {
        validator_id: &'static str,
        subject: &'static str,
    },
    #[error("repository error during validation: {0}")]
    Repository(#[source] Box<CoreError>),
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid page: {0}")]
    InvalidPage(String),
    #[error("not found")]
    NotFound,
    #[error("resource already exists")]
    AlreadyExists,
    #[error("repository error: {0}")]
    Repository(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("page failed validation:\n{0}")]
    Invalid(violation::ViolationList),
}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - page domain library loaded", pkg, ver)
}

pub mod adapters;
pub mod constraint;
pub mod engine;
pub mod manager;
pub mod metadata;
pub mod registry;
pub mod service;
pub mod slug;
pub mod translate;
pub mod validators;
pub mod violation;

#[cfg(test)]
mod tests {
    use super::*;

    fn page(route: &str) -> Page {
        let mut p = Page::new(SiteId(1), "Home", SystemTime::UNIX_EPOCH);
        p.route_name = route.to_string();
        p
    }

    #[test]
    fn route_name_classification() {
        let cms = page(ROUTE_CMS);
        assert!(cms.is_cms());
        assert!(!cms.is_hybrid());
        assert!(!cms.is_internal());

        let error = page("_page_internal_error_not_found");
        assert!(error.is_error());
        assert!(error.is_internal());
        assert!(!error.is_hybrid());

        let internal = page("_page_internal_global");
        assert!(internal.is_internal());
        assert!(!internal.is_error());

        let hybrid = page("blog_index");
        assert!(hybrid.is_hybrid());
        assert!(!hybrid.is_dynamic());
    }

    #[test]
    fn dynamic_pages_are_hybrid_with_placeholders() {
        let mut p = page("blog_post");
        p.url = Some("/blog/{slug}".into());
        assert!(p.is_dynamic());

        let mut cms = page(ROUTE_CMS);
        cms.url = Some("/{weird}".into());
        assert!(!cms.is_dynamic());
    }

    #[test]
    fn unsaved_pages_are_never_the_same() {
        let a = page(ROUTE_CMS);
        let b = a.clone();
        assert!(!a.is_same_page(&b));

        let mut c = a.clone();
        c.id = Some(PageId(3));
        let mut d = b.clone();
        d.id = Some(PageId(3));
        assert!(c.is_same_page(&d));
        d.id = Some(PageId(4));
        assert!(!c.is_same_page(&d));
    }
}
