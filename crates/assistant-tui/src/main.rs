use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use assistant_core::config::BASE_URL_ENV;
use assistant_core::{render_html, Backend, BackendClient, ChatRole, ChatWidget, Config, Phase};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod markdown_view;
mod page;
mod tui;
mod ui;

use app::App;
use page::Page;

const SAMPLE_CHAPTER: &str = include_str!("../assets/intro.md");

#[derive(Parser)]
#[command(name = "course-assistant")]
#[command(about = "Read course chapters with a docked, selection-aware chat assistant")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides CHATBOT_API_URL and the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Backend variant: ask or chat
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "COURSE_ASSISTANT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a chapter in the reader with the assistant docked beside it
    Read {
        /// Markdown chapter to open (a bundled sample when omitted)
        chapter: Option<PathBuf>,
    },
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
        /// Selected text to send as context
        #[arg(short, long)]
        selection: Option<String>,
        /// Print the answer as HTML instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Check that the backend is reachable
    Health,
    /// Render a markdown file to HTML the way the widget does
    Render {
        /// Markdown file to render
        file: PathBuf,
    },
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Read { chapter: None });

    match &command {
        Commands::Read { .. } => init_file_tracing()?,
        _ => init_tracing(),
    }

    let config = load_config(cli.config.as_deref(), cli.base_url, cli.backend.as_deref())?;
    tracing::info!(backend = config.backend.as_str(), base_url = %config.base_url, "configuration loaded");

    match command {
        Commands::Read { chapter } => {
            let page = match chapter {
                Some(path) => Page::load(&path)?,
                None => Page::from_text("Introduction", SAMPLE_CHAPTER.to_string()),
            };
            run_reader(&config, page).await?
        }
        Commands::Ask {
            question,
            selection,
            html,
        } => ask_once(&config, &question, selection.as_deref(), html).await?,
        Commands::Health => check_health(&config).await?,
        Commands::Render { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            println!("{}", render_html(&text));
        }
        Commands::Config { save } => show_config(&config, cli.config.as_deref(), save)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>, base_url: Option<String>, backend: Option<&str>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(name) = backend {
        config.backend =
            Backend::from_str(name).ok_or_else(|| anyhow!("unknown backend '{}' (expected ask or chat)", name))?;
    }
    Ok(config.with_overrides(std::env::var(BASE_URL_ENV).ok(), base_url))
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The reader owns the terminal, so its logs go to a file in the cache dir.
fn init_file_tracing() -> Result<()> {
    let dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("course-assistant");
    fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("course-assistant.log"))?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("assistant_core=info,course_assistant=info"))
}

async fn run_reader(config: &Config, page: Page) -> Result<()> {
    let client = BackendClient::from_config(config)?;
    let mut app = App::new(config, client, page);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run_loop(&mut terminal, &mut app).await;
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new(Duration::from_millis(250));

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event)?;
        app.poll_selection();
        app.poll_task().await;
    }
    Ok(())
}

async fn ask_once(config: &Config, question: &str, selection: Option<&str>, html: bool) -> Result<()> {
    let client = BackendClient::from_config(config)?;
    // Anything passed explicitly counts as a selection
    let mut widget = ChatWidget::new(0);
    if let Some(selection) = selection {
        widget.on_selection(selection);
    }

    println!("{} {}", "❓".bold(), question.cyan());
    if !widget.send(&client, Some(question), false, config.request_timeout()).await {
        return Err(anyhow!("nothing to ask"));
    }

    let Some(reply) = widget
        .conversation()
        .last()
        .filter(|m| m.role == ChatRole::Assistant)
    else {
        return Err(anyhow!("no reply recorded"));
    };

    if widget.phase() == Phase::DisplayedError {
        eprintln!("{}", reply.content.red());
        std::process::exit(1);
    }

    if html {
        println!("{}", render_html(&reply.content));
    } else {
        println!("\n{}", reply.content);
    }
    if !reply.sources.is_empty() {
        println!("\n{}", "Sources:".bold());
        for (i, source) in reply.sources.iter().enumerate() {
            println!("  • {}", source.display_label(i).dimmed());
        }
    }
    Ok(())
}

fn show_config(config: &Config, path: Option<&Path>, save: bool) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    let names: Vec<&str> = Backend::all().iter().map(|b| b.as_str()).collect();
    println!("{} {}", "backends:".dimmed(), names.join(", "));

    if save {
        match path {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        let shown = match path {
            Some(path) => path.to_path_buf(),
            None => Config::get_config_path()?,
        };
        println!("{} saved to {}", "✓".green().bold(), shown.display());
    }
    Ok(())
}

async fn check_health(config: &Config) -> Result<()> {
    let client = BackendClient::from_config(config)?;
    println!("Checking {} ({})...", client.base_url().cyan(), client.backend().display_name());

    match client.health().await {
        Ok(body) => {
            println!("{} backend is up", "✓".green().bold());
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
            std::process::exit(1);
        }
    }
}
