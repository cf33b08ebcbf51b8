//! Repository selection: memory or sqlite (feature-gated).

use domain::adapters::memory_repo::InMemoryPageRepo;
use domain::{CoreError, Page, PageId, PageRepository, SiteId};

use crate::config::{Config, StorageProvider};

pub enum AnyRepo {
    Memory(InMemoryPageRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqlitePageRepo),
}

impl AnyRepo {
    /// Construct a repository instance based on config and feature flags.
    pub fn from_config(cfg: &Config) -> Result<Self, CoreError> {
        match cfg.storage_provider {
            #[cfg(feature = "sqlite")]
            StorageProvider::Sqlite => Ok(Self::Sqlite(
                sqlite_adapter::SqlitePageRepo::open_creating_dirs(&cfg.db_path)?,
            )),
            #[cfg(not(feature = "sqlite"))]
            StorageProvider::Sqlite => {
                tracing::warn!("built without the `sqlite` feature; falling back to memory storage");
                Ok(Self::Memory(InMemoryPageRepo::new()))
            }
            StorageProvider::Memory => Ok(Self::Memory(InMemoryPageRepo::new())),
        }
    }
}

impl PageRepository for AnyRepo {
    fn get(&self, id: PageId) -> Result<Option<Page>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.get(id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.get(id),
        }
    }

    fn insert(&self, page: Page) -> Result<Page, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.insert(page),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.insert(page),
        }
    }

    fn update(&self, page: &Page) -> Result<(), CoreError> {
        match self {
            AnyRepo::Memory(r) => r.update(page),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.update(page),
        }
    }

    fn find_by_site_and_url(&self, site: SiteId, url: &str) -> Result<Vec<Page>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.find_by_site_and_url(site, url),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.find_by_site_and_url(site, url),
        }
    }

    fn children(&self, parent: PageId) -> Result<Vec<Page>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.children(parent),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.children(parent),
        }
    }

    fn list_by_site(&self, site: SiteId, limit: usize) -> Result<Vec<Page>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.list_by_site(site, limit),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.list_by_site(site, limit),
        }
    }
}
