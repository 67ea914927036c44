use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notifuse_feed::config::Config;
use notifuse_feed::form::{Entry, Form};
use notifuse_feed::notes::NoteJournal;
use notifuse_feed::notifuse::NotifuseClient;
use notifuse_feed::{can_create_feed, validate_url, FeedOutcome, FeedProcessor};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "notifuse-feed", about = "Sync form submissions to Notifuse")]
struct Args {
    /// Config file (defaults to ~/.config/notifuse-feed/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every configured feed against one submitted entry
    Process {
        /// Entry JSON file
        #[arg(long, value_name = "FILE")]
        entry: PathBuf,

        /// Form definition JSON file
        #[arg(long, value_name = "FILE")]
        form: PathBuf,
    },
    /// Validate the Notifuse settings and list configured feeds
    Check,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid {what} JSON in '{}'", path.display()))
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(p) => p,
        None => Config::default_path().context("HOME environment variable not set")?,
    };
    Config::load(&path).with_context(|| format!("Failed to load config '{}'", path.display()))
}

fn check(config: &Config) -> bool {
    let mut ok = true;

    if let Err(e) = validate_url(&config.notifuse.instance_url) {
        eprintln!("Notifuse Instance URL: {e}");
        ok = false;
    }

    if !can_create_feed(&config.notifuse) {
        eprintln!(
            "Notifuse configuration incomplete. Please configure the instance URL, API token and workspace ID."
        );
        return false;
    }

    println!("{:<6} {:<6} {:<30} Lists", "Feed", "Form", "Name");
    for feed in &config.feeds {
        let name = if feed.is_active {
            feed.name.clone()
        } else {
            format!("{} (inactive)", feed.name)
        };
        println!("{:<6} {:<6} {:<30} {}", feed.id, feed.form_id, name, feed.lists_column());
        for (field, form_field_id) in &feed.mapped_fields {
            println!("{:>14} {:<16} <- field {}", "", field.label(), form_field_id);
        }
        for (key, form_field_id) in &feed.custom_fields {
            println!("{:>14} {:<16} <- field {}", "", key, form_field_id);
        }
        for field in feed.unmapped_required_fields() {
            eprintln!("Feed {}: no form field mapped to {}", feed.id, field.label());
            ok = false;
        }
    }

    ok
}

async fn process(config: Config, entry_path: &Path, form_path: &Path) -> Result<bool> {
    let entry: Entry = read_json(entry_path, "entry")?;
    let form: Form = read_json(form_path, "form")?;

    let journal = Arc::new(NoteJournal::new());
    let client = NotifuseClient::new().context("Failed to build HTTP client")?;
    let processor = FeedProcessor::new(
        client,
        Arc::new(config.notifuse),
        journal.clone(),
        journal.clone(),
    );

    let outcomes = processor.process_entry(&config.feeds, &entry, &form).await;
    if outcomes.is_empty() {
        println!("No feeds configured for form {}", form.id);
    }

    for outcome in &outcomes {
        match outcome {
            FeedOutcome::Processed { feed_id, success } => {
                tracing::debug!(feed_id, success, "Feed processed");
            }
            FeedOutcome::SkippedInactive { feed_id } => println!("Feed {feed_id}: inactive, skipped"),
            FeedOutcome::SkippedPaymentPending { feed_id } => {
                println!("Feed {feed_id}: waiting for payment, skipped")
            }
            FeedOutcome::SkippedCondition { feed_id } => {
                println!("Feed {feed_id}: condition not met, skipped")
            }
        }
    }

    for note in journal.notes_for(entry.id) {
        match note.feed_id {
            Some(feed_id) => println!("[{}] feed {}: {}", note.severity, feed_id, note.message),
            None => println!("[{}] {}", note.severity, note.message),
        }
    }

    Ok(!outcomes.iter().any(FeedOutcome::is_failure))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = load_config(args.config)?;

    let ok = match args.command {
        Command::Check => check(&config),
        Command::Process { entry, form } => process(config, &entry, &form).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
