//! page — command line front-end for the CMS page store.
//!
//! Creates and updates pages through the validating page service, so every
//! write goes through the same constraints (non-blank name, url unique per
//! site) the library enforces.
//!
//! Run:
//! ```bash
//! # sqlite storage at ./data/pages.db (default)
//! cargo run -p page-cli -- create --name Home
//! cargo run -p page-cli -- create --name "About us" --parent 1
//! cargo run -p page-cli -- list
//!
//! # throwaway in-memory store, json logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p page-cli -- constraints
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod repo;

use std::process;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use domain::constraint::Constraint;
use domain::engine::ValidationEngine;
use domain::service::{default_engine, PageService};
use domain::translate::Catalog;
use domain::{Clock, CoreError, NewPage, Page, PageId, SiteId};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::repo::AnyRepo;

#[derive(Debug, Parser)]
#[command(name = "page", version, about = "Manage CMS pages with url validation")]
struct Cli {
    /// Site to operate on (defaults to DEFAULT_SITE)
    #[arg(long, global = true)]
    site: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a page; the url is derived from the parent and slug
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        parent: Option<u64>,
        /// Route name; anything but `page_slug` makes a hybrid page
        #[arg(long)]
        route: Option<String>,
        /// Url of a hybrid page
        #[arg(long)]
        url: Option<String>,
    },
    /// Change a stored page and refresh the urls below it
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        parent: Option<u64>,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Run the page constraints against a stored page
    Validate { id: u64 },
    /// List pages of the site
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Print one JSON object per page
        #[arg(long)]
        json: bool,
    },
    /// Show declared page constraints and their validators
    Constraints,
    /// Print the library version line
    About,
}

#[derive(Clone)]
struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}

fn build_engine(
    repo: Arc<AnyRepo>,
    cfg: &config::Config,
) -> Result<ValidationEngine<Page>, CoreError> {
    let engine = default_engine(repo)?;
    Ok(match cfg.message_catalog {
        config::MessageCatalog::English => engine.with_translator(Catalog::english()),
        config::MessageCatalog::Keys => engine,
    })
}

fn rfc3339(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn page_json(page: &Page) -> serde_json::Value {
    serde_json::json!({
        "id": page.id,
        "site": page.site,
        "parent": page.parent,
        "name": page.name,
        "slug": page.slug,
        "url": page.url,
        "route_name": page.route_name,
        "enabled": page.enabled,
        "hybrid": page.is_hybrid(),
        "created_at": rfc3339(page.created_at),
        "updated_at": page.updated_at.map(rfc3339),
    })
}

fn describe(page: &Page) -> String {
    format!(
        "#{} {} -> {}",
        page.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
        page.name,
        page.url.as_deref().unwrap_or("(no url)")
    )
}

fn run(cli: Cli, cfg: &config::Config) -> Result<(), String> {
    let site = cli.site.map(SiteId).unwrap_or(cfg.default_site);

    if let Command::About = cli.command {
        println!("{}", domain::about());
        return Ok(());
    }

    let repo = Arc::new(AnyRepo::from_config(cfg).map_err(|e| e.to_string())?);
    let engine = build_engine(repo.clone(), cfg).map_err(|e| e.to_string())?;
    let svc = PageService::with_engine(repo, engine, StdClock);

    match cli.command {
        Command::Create { name, slug, parent, route, url } => {
            let input = NewPage {
                site: Some(site),
                name,
                slug,
                parent: parent.map(PageId),
                route_name: route,
                url,
            };
            let page = svc.create(input).map_err(|e| format!("create failed: {e}"))?;
            println!("created: {}", describe(&page));
            Ok(())
        }
        Command::Update { id, name, slug, parent, route, url, enabled } => {
            let mut page = svc
                .get(PageId(id))
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("page {id} not found"))?;
            if let Some(name) = name {
                page.name = name;
            }
            if slug.is_some() {
                page.slug = slug;
            }
            if let Some(parent) = parent {
                page.parent = Some(PageId(parent));
            }
            if let Some(route) = route {
                page.route_name = route;
            }
            if url.is_some() {
                page.url = url;
            }
            if let Some(enabled) = enabled {
                page.enabled = enabled;
            }
            let page = svc.update(page).map_err(|e| format!("update failed: {e}"))?;
            println!("updated: {}", describe(&page));
            Ok(())
        }
        Command::Validate { id } => {
            let page = svc
                .get(PageId(id))
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("page {id} not found"))?;
            let violations = svc.validate(&page).map_err(|e| e.to_string())?;
            if violations.is_empty() {
                println!("ok: {}", describe(&page));
                Ok(())
            } else {
                Err(format!("{} violation(s)\n{}", violations.len(), violations))
            }
        }
        Command::List { limit, json } => {
            let pages = svc.list(site, limit).map_err(|e| e.to_string())?;
            for page in &pages {
                if json {
                    println!("{}", page_json(page));
                } else {
                    println!("{}  created {}", describe(page), rfc3339(page.created_at));
                }
            }
            info!(site = %site, count = pages.len(), "pages listed");
            Ok(())
        }
        Command::Constraints => {
            let meta = svc.engine().metadata();
            for property in meta.properties() {
                for c in property.constraints() {
                    print_constraint(Some(property.name()), c.as_ref());
                }
            }
            for c in meta.constraints() {
                print_constraint(None, c.as_ref());
            }
            Ok(())
        }
        Command::About => Ok(()),
    }
}

fn print_constraint(property: Option<&str>, c: &dyn Constraint) {
    println!(
        "{:<8} {:<6} {:<36} {}",
        property.unwrap_or("(class)"),
        format!("{:?}", c.target_kind()),
        c.validator_id(),
        c.message()
    );
}

fn main() {
    let cli = Cli::parse();

    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_volatile();

    if let Err(msg) = run(cli, &cfg) {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
