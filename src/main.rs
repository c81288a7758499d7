use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use storm_wiki::article::{self, paginate};
use storm_wiki::config::Config;
use storm_wiki::runner::RunEvent;
use storm_wiki::theme::find_builtin;
use storm_wiki::{tui, AppContext};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "storm-wiki.log";
const DEFAULT_FILTER: &str = "storm_wiki=info";

#[derive(Parser)]
#[command(name = "storm-wiki", version, about = "Research and write wiki-style articles")]
struct Cli {
    /// Config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive dashboard (default)
    Tui,
    /// Run the search adapter and print results as JSON
    Search {
        #[arg(required = true)]
        queries: Vec<String>,
        /// URLs to leave out of the results
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Generate an article for a topic
    Generate {
        topic: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// List generated articles
    Articles {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Print one article
    Show {
        name: String,
        #[arg(long)]
        references: bool,
        #[arg(long)]
        conversation: bool,
    },
    /// Inspect or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Move pre-category article folders into Uncategorized
    Migrate,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every setting as JSON
    Show,
    /// Set a search option by dotted key, e.g. engine_settings.bing.api_key
    SetSearch { key: String, value: String },
    /// Switch to a built-in theme
    Theme { name: String },
    /// Add an article category
    AddCategory { name: String },
}

fn init_logging(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if to_file {
        let log_file = std::fs::File::create(LOG_FILE)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(log_file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// JSON if it parses, otherwise the raw text as a string.
fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);
    init_logging(matches!(command, Command::Tui))?;

    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();
    let config = Config::load_or_default(&cli.config)?;
    let ctx = AppContext::init(config)?;

    match command {
        Command::Tui => tui::run_tui(ctx).await,
        Command::Search { queries, exclude } => {
            let adapter = ctx.search_adapter()?;
            let results = adapter.forward(queries, &exclude).await;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Command::Generate { topic, category } => generate(&ctx, &topic, category.as_deref()).await,
        Command::Articles { category, page } => list(&ctx, category.as_deref(), page),
        Command::Show { name, references, conversation } => show(&ctx, &name, references, conversation),
        Command::Settings { action } => settings(&ctx, action),
        Command::Migrate => {
            let moved = article::migrate_existing_articles(&ctx.paths.output_dir, &ctx.store)?;
            println!("Migration complete. Moved {} article(s).", moved);
            Ok(())
        }
    }
}

async fn generate(ctx: &AppContext, topic: &str, category: Option<&str>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<RunEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("  {}", event);
        }
    });

    let result = ctx.generate(topic, category, Some(&tx)).await;
    drop(tx);
    let _ = printer.await;

    let dir = result?;
    println!("Article written to {}", dir.display());
    Ok(())
}

fn list(ctx: &AppContext, category: Option<&str>, page: usize) -> Result<()> {
    let general = ctx.store.load_general_settings()?;
    let articles: Vec<_> = article::list_articles(&ctx.paths.output_dir, &general.categories)?
        .into_iter()
        .filter(|a| category.map_or(true, |c| a.category == c))
        .collect();

    let page = paginate(articles.len(), general.page_size, page);
    for entry in &articles[page.range()] {
        println!(
            "{:<16} {:<40} {}",
            entry.category,
            entry.title(),
            entry.modified.format(article::library::MOD_TIME_FORMAT)
        );
    }
    println!("-- page {}/{} ({} articles)", page.number, page.total_pages, articles.len());
    Ok(())
}

fn show(ctx: &AppContext, name: &str, references: bool, conversation: bool) -> Result<()> {
    let categories = ctx.store.load_categories()?;
    let wanted = article::sanitize_title(name);
    let entry = article::list_articles(&ctx.paths.output_dir, &categories)?
        .into_iter()
        .find(|a| a.name == wanted)
        .with_context(|| format!("No article data found for topic: {}", wanted))?;
    let data = article::assemble_article(&entry.name, &entry.files)?
        .with_context(|| format!("{} has no article text", entry.name))?;

    let text = match &data.citations {
        Some(citations) => article::add_inline_citation_links(&data.article, citations),
        None => data.article.clone(),
    };
    println!("{}", text);

    if references {
        if let Some(info) = &data.url_to_info {
            println!("\n{}", article::construct_bibliography(info));
        }
    }
    if conversation {
        for persona in article::parse_conversation_history(data.conversation_log.as_deref().unwrap_or_default()) {
            println!("\n## {}: {}", persona.name, persona.description);
            for msg in persona.messages {
                let who = match msg.role {
                    article::Role::User => "Q",
                    article::Role::Assistant => "A",
                };
                println!("{}: {}", who, msg.content);
            }
        }
    }
    Ok(())
}

fn settings(ctx: &AppContext, action: SettingsAction) -> Result<()> {
    let store = &ctx.store;
    match action {
        SettingsAction::Show => {
            let all = serde_json::json!({
                "search_options": store.load_search_options()?,
                "llm_settings": store.load_llm_settings()?,
                "general_settings": store.load_general_settings()?,
                "phoenix_settings": store.load_phoenix_settings()?,
                "theme": store.load_theme()?,
            });
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
        SettingsAction::SetSearch { key, value } => {
            let updated = store.update_search_option(&key, parse_cli_value(&value))?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        SettingsAction::Theme { name } => {
            let theme = find_builtin(&name).with_context(|| format!("unknown theme '{}'", name))?;
            store.save_theme(&theme)?;
            println!("Theme set to {}", name);
        }
        SettingsAction::AddCategory { name } => {
            let categories = article::add_category(&ctx.paths.output_dir, store, &name)?;
            println!("Categories: {}", categories.join(", "));
        }
    }
    Ok(())
}
