use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use newsfeed_common::{Config, EnrichedItem, ItemId, ItemKind, ItemRef, Preferences};
use newsfeed_core::{
    Dispatcher, EngagementCoordinator, EngagementReport, EnrichmentStore, FeedLoader, NoticeLevel,
    Screen, Session,
};
use scoring_client::{ScoringClient, ScoringEndpoints};
use store_client::{ContentClient, IdentityClient};

#[derive(Parser)]
#[command(name = "newsfeed", about = "Enriched news feed and engagement client")]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a feed, score every item and print the enriched view
    #[command(subcommand)]
    Feed(FeedCommand),

    /// Like an article or video
    Like {
        /// article or video
        kind: ItemKind,
        id: String,
    },

    /// Comment on an article
    Comment { id: String, text: String },
}

#[derive(Subcommand)]
enum FeedCommand {
    /// Latest news
    Home,
    /// News filtered by preferred categories and sources
    ForYou {
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long = "source")]
        sources: Vec<String>,
    },
    /// Articles with the given ids
    Liked { ids: Vec<String> },
    /// A single item
    Item {
        id: String,
        #[arg(long, default_value = "article")]
        kind: ItemKind,
    },
}

impl FeedCommand {
    fn screen(self) -> Screen {
        match self {
            FeedCommand::Home => Screen::Home,
            FeedCommand::ForYou {
                categories,
                sources,
            } => Screen::ForYou(Preferences {
                categories,
                sources,
            }),
            FeedCommand::Liked { ids } => Screen::Liked(ids.into_iter().map(ItemId::new).collect()),
            FeedCommand::Item { id, kind } => Screen::Detail {
                kind,
                id: ItemId::new(id),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("newsfeed=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    config.log_redacted();

    match cli.command {
        Command::Feed(feed) => {
            load_feed(&config, feed.screen(), cli.json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Like { kind, id } => {
            let target = ItemRef {
                kind,
                id: ItemId::new(id),
            };
            let mut session = session(&config);
            let report = coordinator(&config).like(&mut session, &target).await;
            print_report(&report, cli.json)
        }
        Command::Comment { id, text } => {
            let report = coordinator(&config)
                .comment(&session(&config), &ItemRef::article(id), &text)
                .await;
            print_report(&report, cli.json)
        }
    }
}

async fn load_feed(config: &Config, screen: Screen, json: bool) -> Result<()> {
    let scorer = ScoringClient::new(
        ScoringEndpoints {
            bias: config.bias_scorer_url.clone(),
            fake_news: config.fake_news_scorer_url.clone(),
            sentiment: config.sentiment_scorer_url.clone(),
        },
        config.scoring_timeout,
    );
    let store = Arc::new(EnrichmentStore::new());
    let dispatcher = Dispatcher::new(Arc::new(scorer), store.clone())
        .with_timeout(config.scoring_timeout)
        .with_max_in_flight(config.max_in_flight);
    let loader = FeedLoader::new(
        Arc::new(ContentClient::new(&config.content_store_url)),
        dispatcher,
    );

    let stats = loader.load(&screen).await?.settled().await?;
    info!(
        screen = screen.name(),
        resolved = stats.resolved,
        unavailable = stats.unavailable,
        timed_out = stats.timed_out,
        "Feed enriched"
    );

    let view = store.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for entry in &view {
            print_item(entry);
        }
    }
    Ok(())
}

fn print_item(entry: &EnrichedItem) {
    let item = &entry.item;
    println!("{} [{}] {} ({}, {} likes)", item.id, item.kind, item.title, item.source, item.likes);

    match &entry.bias {
        Some(b) => println!(
            "  bias       left {:.2}  lean-left {:.2}  center {:.2}  lean-right {:.2}  right {:.2}",
            b.left, b.lean_left, b.center, b.lean_right, b.right
        ),
        None => println!("  bias       unavailable"),
    }
    match &entry.fake_news {
        Some(f) => println!("  fake news  true {:.2}  fake {:.2}", f.authentic, f.fake),
        None => println!("  fake news  unavailable"),
    }
    match &entry.sentiment {
        Some(s) => println!("  sentiment  {} ({:+.2})", s.label, s.score),
        None => println!("  sentiment  unavailable"),
    }
}

fn session(config: &Config) -> Session {
    config
        .credential()
        .map(Session::authenticated)
        .unwrap_or_default()
}

fn coordinator(config: &Config) -> EngagementCoordinator {
    EngagementCoordinator::new(
        Arc::new(IdentityClient::new(&config.identity_store_url)),
        Arc::new(ContentClient::new(&config.content_store_url)),
    )
}

fn print_report(report: &EngagementReport, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        let path: Vec<String> = report.path.iter().map(|s| s.to_string()).collect();
        println!("{}", report.notice.text);
        println!("  {}", path.join(" -> "));
    }

    Ok(match report.notice.level {
        NoticeLevel::Error => ExitCode::from(2),
        NoticeLevel::Success | NoticeLevel::Info => ExitCode::SUCCESS,
    })
}
