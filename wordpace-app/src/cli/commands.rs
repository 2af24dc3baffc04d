use crate::api::server as api_server;
use crate::cli::opts::*;

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use wordpace_core::{
    apply_review, daily_streak, queue, queue_counts, summarize, Algorithm, Card, CoreError,
    Quality, Repository, Review, UserId,
};
use wordpace_json::paths::data_root;
use wordpace_json::JsonStore;
use wordpace_sqlite::SqliteRepo;

pub async fn run_cli(args: Cli) -> Result<()> {
    let repo = open_repo(&args.store, args.db_path.clone()).await?;
    // The nil id is the local single-user profile.
    let user = args.user.unwrap_or_else(Uuid::nil);

    match args.cmd.clone() {
        Command::Api(api) => {
            let addr: std::net::SocketAddr = api.addr.parse()?;
            api_server::run(repo, addr).await
        }
        Command::Card(cmd) => card_cmd(repo, user, cmd).await,
        Command::Review(cmd) => review_cmd(repo, user, cmd).await,
        Command::Queue(cmd) => queue_cmd(repo, user, cmd).await,
        Command::Stats => stats_cmd(repo, user).await,
        Command::Export(cmd) => export_cmd(repo, cmd).await,
        Command::Import(cmd) => import_cmd(repo, cmd).await,
    }
}

pub async fn open_repo(store: &StoreKind, db_path: Option<PathBuf>) -> Result<Arc<dyn Repository>> {
    match store {
        StoreKind::Json => {
            let s = JsonStore::open_default().await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            let p = db_path.unwrap_or_else(|| data_root().join("wordpace.sqlite3"));
            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let s = SqliteRepo::open_file(&p).await?;
            Ok(Arc::new(s))
        }
    }
}

async fn card_cmd(repo: Arc<dyn Repository>, user: UserId, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::Add(a) => {
            let c = repo.create_card(user, a.vocab, Algorithm::Sm2).await?;
            println!("{}", c.id);
        }
        CardCmd::List { bucket } => {
            let cards = repo.list_cards(Some(user)).await?;
            let cards = match bucket {
                Some(Bucket::New) => queue::new_cards(&cards, wordpace_core::DEFAULT_NEW_LIMIT),
                Some(Bucket::Learning) => queue::learning_cards(&cards),
                Some(Bucket::Review) => queue::review_cards(&cards),
                Some(Bucket::Due) => queue::due_cards(&cards, Utc::now()),
                None => cards,
            };
            for c in cards {
                println!(
                    "{}\tvocab={}\treps={}\tinterval={}\tef={:.2}\tdue={}\tlapses={}\tsuspended={}",
                    c.id,
                    c.vocab_id,
                    c.repetitions,
                    fmt_interval(c.interval_days),
                    c.ease_factor,
                    c.due_at.to_rfc3339(),
                    c.lapses,
                    c.suspended
                );
            }
        }
        CardCmd::Rm { card_id } => {
            let id = parse_uuid(&card_id)?;
            repo.delete_card(id).await?;
            println!("ok");
        }
        CardCmd::Suspend { card_id } => {
            let id = parse_uuid(&card_id)?;
            repo.set_suspended(id, true).await?;
            println!("ok");
        }
        CardCmd::Unsuspend { card_id } => {
            let id = parse_uuid(&card_id)?;
            repo.set_suspended(id, false).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn review_cmd(repo: Arc<dyn Repository>, user: UserId, cmd: ReviewCmd) -> Result<()> {
    let now = Utc::now();
    let cards = repo.list_cards(Some(user)).await?;

    // Session pool: overdue seen cards, optionally topped up with unseen
    // ones. Suspended cards are skipped here even though due_cards itself
    // does not filter them.
    let mut pool: Vec<Card> = queue::due_cards(&cards, now)
        .into_iter()
        .filter(|c| !c.suspended && c.repetitions > 0)
        .collect();
    if cmd.include_new {
        pool.extend(queue::new_cards(&cards, cmd.new_limit));
    }
    pool.sort_by_key(|c| (c.due_at, c.created_at));

    if pool.is_empty() {
        println!("no cards due");
        return Ok(());
    }

    let mut count = 0usize;
    for card in pool.into_iter().take(cmd.max) {
        count += 1;
        println!("\n[{}/{}] card {}", count, cmd.max, card.id);
        println!(
            "vocab {}  (reps={}, ef={:.2}, lapses={})",
            card.vocab_id, card.repetitions, card.ease_factor, card.lapses
        );
        prompt_enter("[enter=rate]")?;
        println!("[1=Again, 2=Hard, 3=Good, 4=Easy, s=skip, q=quit]");
        let q = loop {
            let line = read_line("quality> ")?;
            match line.trim().to_lowercase().as_str() {
                "1" | "a" | "again" => break Some(Quality::Again),
                "2" | "h" | "hard" => break Some(Quality::Hard),
                "3" | "g" | "good" => break Some(Quality::Good),
                "4" | "e" | "easy" => break Some(Quality::Easy),
                "s" | "skip" => break None,
                "q" | "quit" => return Ok(()),
                _ => {
                    println!("enter 1/2/3/4, s, or q");
                }
            }
        };

        if let Some(quality) = q {
            let expected = card.last_reviewed_at;
            let out = apply_review(card, quality);
            match repo.update_card_reviewed(&out.updated_card, expected).await {
                Ok(updated) => {
                    repo.insert_review(&out.review).await?;
                    println!("→ next due in {}", fmt_interval(updated.interval_days));
                }
                Err(CoreError::Conflict(_)) => {
                    println!("card was reviewed elsewhere, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    println!("\nreviewed {}", count);
    Ok(())
}

async fn queue_cmd(repo: Arc<dyn Repository>, user: UserId, cmd: QueueCmd) -> Result<()> {
    let cards = repo.list_cards(Some(user)).await?;
    let counts = queue_counts(&cards, Utc::now(), cmd.new_limit);
    println!("new       {}", counts.new_count);
    println!("learning  {}", counts.learning);
    println!("review    {}", counts.review);
    println!("due       {}", counts.due);
    Ok(())
}

async fn stats_cmd(repo: Arc<dyn Repository>, user: UserId) -> Result<()> {
    let reviews = repo.list_reviews_for_user(user).await?;
    let s = summarize(&reviews);
    println!("reviews   {}", s.totals.total);
    println!(
        "again={} hard={} good={} easy={}",
        s.totals.again, s.totals.hard, s.totals.good, s.totals.easy
    );
    println!("accuracy  {:.0}%", s.totals.accuracy() * 100.0);
    println!(
        "streak    {} day(s)",
        daily_streak(&reviews, Utc::now().date_naive())
    );
    Ok(())
}

async fn export_cmd(repo: Arc<dyn Repository>, cmd: ExportCmd) -> Result<()> {
    match cmd {
        ExportCmd::Json { path } => {
            let cards = repo.list_cards(None).await?;
            let mut reviews = Vec::new();
            for c in &cards {
                reviews.extend(repo.list_reviews_for_card(c.id).await?);
            }
            let bundle = ExportBundle {
                version: 1,
                cards,
                reviews,
            };
            let s = serde_json::to_string_pretty(&bundle)?;
            std::fs::write(&path, s)?;
            println!("wrote {}", path.display());
        }
        ExportCmd::Csv { path } => {
            let cards = repo.list_cards(None).await?;
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "user_id",
                "vocab_id",
                "algorithm",
                "repetitions",
                "interval_days",
                "ease_factor",
                "due_at",
                "last_reviewed_at",
                "lapses",
                "suspended",
            ])?;
            for c in cards {
                wtr.write_record([
                    c.user_id.to_string(),
                    c.vocab_id.to_string(),
                    c.algorithm.as_str().to_string(),
                    c.repetitions.to_string(),
                    c.interval_days.to_string(),
                    c.ease_factor.to_string(),
                    c.due_at.to_rfc3339(),
                    c.last_reviewed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    c.lapses.to_string(),
                    if c.suspended { "1".to_string() } else { "0".to_string() },
                ])?;
            }
            wtr.flush()?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

async fn import_cmd(repo: Arc<dyn Repository>, cmd: ImportCmd) -> Result<()> {
    match cmd {
        ImportCmd::Json { path } => {
            let data = std::fs::read_to_string(&path)?;
            let bundle: ExportBundle = serde_json::from_str(&data)?;
            // The review log in the bundle is informational; only scheduling
            // state is merged.
            let mut n = 0usize;
            for card in bundle.cards {
                upsert_card(&*repo, card).await?;
                n += 1;
            }
            println!("imported {n} card(s)");
        }
        ImportCmd::Csv { path } => {
            let mut rdr = csv::Reader::from_path(&path)?;
            let mut n = 0usize;
            for rec in rdr.records() {
                let rec = rec?;
                let user_id = parse_uuid(rec.get(0).unwrap_or("").trim())?;
                let vocab_id = parse_uuid(rec.get(1).unwrap_or("").trim())?;
                let algorithm = Algorithm::from_tag(rec.get(2).unwrap_or("sm2").trim())
                    .ok_or_else(|| anyhow!("unknown algorithm"))?;

                let mut card = Card::new(user_id, vocab_id, algorithm);
                card.repetitions = rec.get(3).unwrap_or("0").trim().parse()?;
                card.interval_days = rec.get(4).unwrap_or("0").trim().parse()?;
                card.ease_factor = rec.get(5).unwrap_or("2.5").trim().parse()?;
                card.due_at = parse_rfc3339(rec.get(6).unwrap_or("").trim())?;
                card.last_reviewed_at = match rec.get(7).unwrap_or("").trim() {
                    "" => None,
                    s => Some(parse_rfc3339(s)?),
                };
                card.lapses = rec.get(8).unwrap_or("0").trim().parse()?;
                card.suspended = rec.get(9).unwrap_or("0").trim() == "1";

                upsert_card(&*repo, card).await?;
                n += 1;
            }
            println!("imported {n} card(s)");
        }
    }
    Ok(())
}

// ===== Helpers =====
fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| anyhow!("invalid uuid"))
}

fn parse_rfc3339(s: &str) -> Result<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| anyhow!("invalid timestamp"))
}

fn fmt_interval(days: f32) -> String {
    if days < 1.0 {
        format!("{} min", (days * 1440.0).round() as i64)
    } else {
        format!("{} day(s)", days.round() as i64)
    }
}

/// Merges imported scheduling state onto the card for `(user, vocab)`,
/// creating it first when absent. The stored card keeps its own id.
async fn upsert_card<R: Repository + ?Sized>(repo: &R, incoming: Card) -> Result<()> {
    let mut card = match repo.find_card(incoming.user_id, incoming.vocab_id).await? {
        Some(c) => c,
        None => {
            repo.create_card(incoming.user_id, incoming.vocab_id, incoming.algorithm)
                .await?
        }
    };
    card.algorithm = incoming.algorithm;
    card.repetitions = incoming.repetitions;
    card.interval_days = incoming.interval_days;
    card.ease_factor = incoming.ease_factor;
    card.due_at = incoming.due_at;
    card.last_reviewed_at = incoming.last_reviewed_at;
    card.lapses = incoming.lapses;
    card.quality_history = incoming.quality_history;
    card.suspended = incoming.suspended;
    let _ = repo.update_card(&card).await?;
    Ok(())
}

fn prompt_enter(label: &str) -> Result<()> {
    print!("{label}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ExportBundle {
    version: u32,
    cards: Vec<Card>,
    reviews: Vec<Review>,
}
