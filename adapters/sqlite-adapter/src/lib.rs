//! sqlite-adapter — SQLite implementation of the PageRepository port.
//!
//! Purpose
//! - Provide a lightweight, file-based page store so the CLI can keep pages
//!   between runs without any server.
//! - Implements the `PageRepository` trait from the `page-domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Stores timestamps as seconds since UNIX_EPOCH.
//! - `(site_id, url)` is indexed but not unique: url uniqueness is a
//!   validation rule with exemptions (error and internal pages), not a
//!   storage constraint.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{CoreError, Page, PageId, PageRepository, SiteId};
use rusqlite::{params, Connection};
use tracing::debug;

const COLUMNS: &str =
    "id, site_id, parent_id, name, slug, url, route_name, enabled, created_at, updated_at";

/// SQLite-backed page repository.
pub struct SqlitePageRepo {
    conn: Mutex<Connection>,
}

impl SqlitePageRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path.as_ref()).map_err(map_sqerr)?;
        init_schema(&conn)?;
        debug!(path = %path.as_ref().display(), "sqlite page store opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open the database at `path`, creating its parent directory first.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| CoreError::Repository(format!("cannot create {}: {e}", dir.display())))?;
        }
        Self::new(path)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    fn query_pages(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Page>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(map_sqerr)?;
        let mut rows = stmt.query(args).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_page(row)?);
        }
        Ok(out)
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER,
            parent_id INTEGER,
            name TEXT NOT NULL,
            slug TEXT,
            url TEXT,
            route_name TEXT NOT NULL DEFAULT 'page_slug',
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_pages_site_url ON pages(site_id, url);
        CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages(parent_id);
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError { CoreError::Repository(format!("sqlite error: {e}")) }

fn system_time_to_secs(t: SystemTime) -> i64 { t.duration_since(UNIX_EPOCH).unwrap_or(Duration::from_secs(0)).as_secs() as i64 }
fn secs_to_system_time(secs: i64) -> SystemTime { UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64) }

fn row_to_page(row: &rusqlite::Row) -> Result<Page, CoreError> {
    let id: i64 = row.get(0).map_err(map_sqerr)?;
    let site_id: Option<i64> = row.get(1).map_err(map_sqerr)?;
    let parent_id: Option<i64> = row.get(2).map_err(map_sqerr)?;
    let name: String = row.get(3).map_err(map_sqerr)?;
    let slug: Option<String> = row.get(4).map_err(map_sqerr)?;
    let url: Option<String> = row.get(5).map_err(map_sqerr)?;
    let route_name: String = row.get(6).map_err(map_sqerr)?;
    let enabled: i64 = row.get(7).map_err(map_sqerr)?;
    let created_at: i64 = row.get(8).map_err(map_sqerr)?;
    let updated_at: Option<i64> = row.get(9).map_err(map_sqerr)?;

    Ok(Page {
        id: Some(PageId(id as u64)),
        site: site_id.map(|s| SiteId(s as u64)),
        parent: parent_id.map(|p| PageId(p as u64)),
        name,
        slug,
        url,
        route_name,
        enabled: enabled != 0,
        created_at: secs_to_system_time(created_at),
        updated_at: updated_at.map(secs_to_system_time),
    })
}

impl PageRepository for SqlitePageRepo {
    fn get(&self, id: PageId) -> Result<Option<Page>, CoreError> {
        let sql = format!("SELECT {COLUMNS} FROM pages WHERE id = ?1");
        Ok(self.query_pages(&sql, params![id.0 as i64])?.into_iter().next())
    }

    fn insert(&self, mut page: Page) -> Result<Page, CoreError> {
        let conn = self.lock()?;
        let res = conn.execute(
            "INSERT INTO pages(id, site_id, parent_id, name, slug, url, route_name, enabled, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                page.id.map(|id| id.0 as i64),
                page.site.map(|s| s.0 as i64),
                page.parent.map(|p| p.0 as i64),
                page.name,
                page.slug,
                page.url,
                page.route_name,
                page.enabled as i64,
                system_time_to_secs(page.created_at),
                page.updated_at.map(system_time_to_secs),
            ],
        );
        match res {
            Ok(_) => {
                page.id = Some(PageId(conn.last_insert_rowid() as u64));
                Ok(page)
            }
            Err(e) => {
                if let rusqlite::Error::SqliteFailure(err, _) = &e { if err.code == rusqlite::ErrorCode::ConstraintViolation { return Err(CoreError::AlreadyExists); } }
                Err(map_sqerr(e))
            }
        }
    }

    fn update(&self, page: &Page) -> Result<(), CoreError> {
        let Some(id) = page.id else {
            return Err(CoreError::InvalidPage("page has not been stored yet".into()));
        };
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE pages SET site_id = ?1, parent_id = ?2, name = ?3, slug = ?4, url = ?5, route_name = ?6, enabled = ?7, updated_at = ?8 WHERE id = ?9",
            params![
                page.site.map(|s| s.0 as i64),
                page.parent.map(|p| p.0 as i64),
                page.name,
                page.slug,
                page.url,
                page.route_name,
                page.enabled as i64,
                page.updated_at.map(system_time_to_secs),
                id.0 as i64,
            ],
        ).map_err(map_sqerr)?;
        if changed == 0 {
            Err(CoreError::NotFound)
        } else {
            Ok(())
        }
    }

    fn find_by_site_and_url(&self, site: SiteId, url: &str) -> Result<Vec<Page>, CoreError> {
        let sql = format!("SELECT {COLUMNS} FROM pages WHERE site_id = ?1 AND url = ?2 ORDER BY id");
        self.query_pages(&sql, params![site.0 as i64, url])
    }

    fn children(&self, parent: PageId) -> Result<Vec<Page>, CoreError> {
        let sql = format!("SELECT {COLUMNS} FROM pages WHERE parent_id = ?1 ORDER BY id");
        self.query_pages(&sql, params![parent.0 as i64])
    }

    fn list_by_site(&self, site: SiteId, limit: usize) -> Result<Vec<Page>, CoreError> {
        let sql = format!("SELECT {COLUMNS} FROM pages WHERE site_id = ?1 ORDER BY id LIMIT ?2");
        self.query_pages(&sql, params![site.0 as i64, limit as i64])
    }
}
