use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

mod catalog;
mod config;
mod db;
mod error;
mod models;
mod promotions;
mod ranking;
mod session;

use config::Config;
use db::{KeyValueStore, MemoryStore, SqliteStore};
use error::{AppError, Result};
use models::{parse_items, parse_reviews, parse_day, ReviewSource};
use promotions::load_promotions;
use session::{NewReview, Session};

const USAGE: &str = "usage: catalog-rank --snapshot <file.json> [--search <term>] [--page <n>] \
[--today <YYYY-MM-DD>] [--stats] [--sort-popularity on|off] [--favorite <title>] \
[--review <item> <author> <stars> <comment>] [--dry-run]";

#[derive(Debug, Default)]
struct CliArgs {
    snapshot: Option<PathBuf>,
    search: String,
    page: usize,
    today: Option<NaiveDate>,
    stats: bool,
    sort_popularity: Option<bool>,
    favorite: Option<String>,
    review: Option<NewReview>,
    dry_run: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs {
        page: 1,
        ..Default::default()
    };
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| AppError::InvalidInput(format!("{} needs a value", arg)))
        };
        match arg.as_str() {
            "--snapshot" => cli.snapshot = Some(PathBuf::from(value()?)),
            "--search" => cli.search = value()?,
            "--page" => {
                let raw = value()?;
                cli.page = raw
                    .parse()
                    .map_err(|_| AppError::InvalidInput(format!("bad page number: {}", raw)))?;
            }
            "--today" => {
                let raw = value()?;
                cli.today = Some(
                    parse_day(&raw)
                        .ok_or_else(|| AppError::InvalidInput(format!("bad date: {}", raw)))?,
                );
            }
            "--sort-popularity" => {
                cli.sort_popularity = match value()?.as_str() {
                    "on" => Some(true),
                    "off" => Some(false),
                    other => {
                        return Err(AppError::InvalidInput(format!(
                            "--sort-popularity expects on|off, got {}",
                            other
                        )))
                    }
                }
            }
            "--favorite" => cli.favorite = Some(value()?),
            "--review" => {
                let item = value()?;
                let author = value()?;
                let raw_stars = value()?;
                let comment = value()?;
                let stars = raw_stars
                    .parse()
                    .map_err(|_| AppError::InvalidInput(format!("bad rating: {}", raw_stars)))?;
                cli.review = Some(NewReview {
                    author,
                    item,
                    comment,
                    stars,
                });
            }
            "--stats" => cli.stats = true,
            "--dry-run" => cli.dry_run = true,
            other => return Err(AppError::InvalidInput(format!("unknown argument: {}", other))),
        }
    }

    Ok(cli)
}

/// Exported contents of the remote store.
#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    projects: Vec<Value>,
    #[serde(default, alias = "comentarios")]
    reviews: Vec<Value>,
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("Snapshot {} is not valid JSON", path.display()))?;
    Ok(snapshot)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    let Some(snapshot_path) = cli.snapshot.clone() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = Config::load()?;
    let promotions = match &config.promotions_path {
        Some(path) => load_promotions(Path::new(path))?,
        None => Vec::new(),
    };
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    if cli.dry_run {
        let session = Session::new(MemoryStore::new(), &config, promotions, today).await?;
        run(session, &cli, &snapshot_path, today).await
    } else {
        let store = SqliteStore::new(&config.db_path).await?;
        let session = Session::new(store, &config, promotions, today).await?;
        run(session, &cli, &snapshot_path, today).await
    }
}

async fn run<S: KeyValueStore>(
    mut session: Session<S>,
    cli: &CliArgs,
    snapshot_path: &Path,
    today: NaiveDate,
) -> Result<()> {
    let snapshot = read_snapshot(snapshot_path)?;
    let items = parse_items(snapshot.projects);
    let reviews = parse_reviews(snapshot.reviews, ReviewSource::Server);
    session.load_catalog(items, reviews).await?;

    if let Some(enabled) = cli.sort_popularity {
        session.set_popularity_sort(enabled).await?;
    }

    if let Some(title) = &cli.favorite {
        let now_favorite = session.toggle_favorite(title).await?;
        println!(
            "{} {} favorites",
            title,
            if now_favorite { "added to" } else { "removed from" }
        );
    }

    if let Some(new) = cli.review.clone() {
        if session.has_user_reviewed(&new.item, &new.author) {
            println!("{} has already reviewed {}", new.author.trim(), new.item);
        } else {
            match session.submit_review(new, today).await {
                Ok(review) => println!(
                    "Review by {} for {} queued locally ({} pending)",
                    review.author,
                    review.item,
                    session.pending_local().len()
                ),
                Err(e @ (AppError::InvalidInput(_) | AppError::DuplicateReview)) => {
                    println!("Review rejected: {}", e)
                }
                Err(e) => return Err(e),
            }
        }
    }

    let promoted = session.eligible_promotions(today).await?;
    if !promoted.is_empty() {
        println!("Promoted");
        for p in &promoted {
            let label = if p.promotion.label.is_empty() {
                "PROMO"
            } else {
                p.promotion.label.as_str()
            };
            println!("  [{}] {}", label, p.item.title);
        }
        println!();
    }

    let page = session.listing(&cli.search, cli.page, &promoted);
    println!(
        "Catalog (page {} of {}, {} items, {}, global mean {:.2})",
        page.page,
        page.total_pages,
        page.total,
        if session.popularity_sort_enabled() { "by popularity" } else { "catalog order" },
        session.global_mean()
    );
    for item in &page.items {
        let info = session.popularity(&item.title);
        let star = if session.favorites.is_favorite(item) { "*" } else { " " };
        println!(
            "{} {:<40} score {:>5.2}  avg {:.1}  reviews {:>3}",
            star, item.title, info.score, info.average, info.count
        );
    }
    match (page.has_prev(), page.has_next()) {
        (true, true) => println!("(--page {} / --page {})", page.page - 1, page.page + 1),
        (true, false) => println!("(--page {} for previous)", page.page - 1),
        (false, true) => println!("(--page {} for more)", page.page + 1),
        (false, false) => {}
    }

    if cli.stats {
        println!();
        println!("Promotion stats ({})", today);
        for s in session.promotion_stats() {
            let limit = s
                .daily_view_limit
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<32} {}/{}  {}", s.id, s.current_views, limit, s.status);
        }
    }

    Ok(())
}
