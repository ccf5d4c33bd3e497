use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use coloring_book::book::{self, find_preset, THEME_PRESETS};
use coloring_book::gemini::{GeminiChatClient, ImagenClient};
use coloring_book::{
    ChatPanel, Config, FileStore, GenerationRequest, HistoryStore, KeyValueStore, Orchestrator,
    Studio, StudioError, ThemePreference, TokioPacer,
};

/// Generate printable coloring books with Imagen, and chat with Gemini
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gemini API key (overrides config file and GEMINI_API_KEY / API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Directory for history and preferences
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a coloring book PDF
    Generate {
        /// Theme of the book
        #[arg(short, long)]
        theme: Option<String>,

        /// Use a built-in theme preset (number or name, see `presets`)
        #[arg(short, long, conflicts_with = "theme")]
        preset: Option<String>,

        /// Child's name for the cover
        #[arg(short, long)]
        name: Option<String>,

        /// Number of pages (1-10)
        #[arg(short = 'c', long)]
        pages: Option<u32>,

        /// Re-use theme, name and page count from a history entry
        #[arg(long)]
        from_history: Option<String>,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also write the cover and every page as JPEG files
        #[arg(long)]
        save_images: bool,

        /// Pause between image requests (ms)
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// List the built-in theme presets
    Presets,

    /// Previous creations
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Light/dark preference
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },

    /// Chat with Gemini (type /reset to start over, /quit to leave)
    Chat,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List previous creations, most recent first
    List,
    /// Show one creation
    Show { id: String },
    /// Delete one creation
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ThemeAction {
    Show,
    Set { theme: ThemePreference },
    Toggle,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    config.apply_env();
    if let Some(key) = &args.api_key {
        config.api_key = key.clone();
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    debug!("Config loaded from {:?}", config_path);

    match args.command {
        Command::Generate {
            theme,
            preset,
            name,
            pages,
            from_history,
            out,
            save_images,
            pacing_ms,
        } => {
            if let Some(ms) = pacing_ms {
                config.pacing_ms = ms;
            }
            if let Some(dir) = out {
                config.output_dir = Some(dir);
            }
            let store = open_store(&config)?;
            let history = HistoryStore::load(store);

            let request = match build_request(&history, theme, preset, name, pages, from_history) {
                Ok(request) => request,
                Err(message) => {
                    eprintln!("{}", message);
                    return Ok(ExitCode::FAILURE);
                }
            };
            run_generate(&config, history, request, save_images).await
        }
        Command::Presets => {
            for (i, preset) in THEME_PRESETS.iter().enumerate() {
                println!("{:>2}. {}", i + 1, preset);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::History { action } => {
            let store = open_store(&config)?;
            run_history(HistoryStore::load(store), action.unwrap_or(HistoryAction::List))
        }
        Command::Theme { action } => {
            let store = open_store(&config)?;
            run_theme(store.as_ref(), action.unwrap_or(ThemeAction::Show))
        }
        Command::Chat => run_chat(&config).await,
        Command::Config { save } => {
            println!("Config file:     {}", config_path.display());
            println!("API key:         {}", config.masked_api_key());
            println!("Image model:     {}", config.image_model);
            println!("Chat model:      {}", config.chat_model);
            println!("Pacing:          {} ms", config.pacing_ms);
            println!("Request timeout: {} s", config.request_timeout_secs);
            println!("Output dir:      {}", config.get_output_dir().display());
            println!("Data dir:        {}", config.get_data_dir()?.display());
            if save {
                config.save(&config_path)?;
                println!("\nSaved to {}", config_path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let dir = config.get_data_dir()?;
    let store = FileStore::open(&dir).with_context(|| format!("Failed to open storage at {:?}", dir))?;
    Ok(Arc::new(store))
}

fn build_request(
    history: &HistoryStore,
    theme: Option<String>,
    preset: Option<String>,
    name: Option<String>,
    pages: Option<u32>,
    from_history: Option<String>,
) -> Result<GenerationRequest, String> {
    let mut request = GenerationRequest::new(book::DEFAULT_THEME, book::DEFAULT_NAME, book::DEFAULT_PAGES);

    if let Some(id) = from_history {
        let creation = history
            .get(&id)
            .ok_or_else(|| format!("No saved creation with id {}", id))?;
        request = GenerationRequest::new(&creation.theme, &creation.name, creation.page_count);
    }
    if let Some(selector) = preset {
        request.theme = find_preset(&selector)
            .ok_or_else(|| format!("Unknown preset: {} (see `presets`)", selector))?
            .to_string();
    }
    if let Some(theme) = theme {
        request.theme = theme;
    }
    if let Some(name) = name {
        request.name = name;
    }
    if let Some(pages) = pages {
        request.page_count = pages;
    }
    Ok(request)
}

async fn run_generate(
    config: &Config,
    history: HistoryStore,
    request: GenerationRequest,
    save_images: bool,
) -> Result<ExitCode> {
    // Reject bad input before asking for credentials
    if let Err(e) = request.validate() {
        eprintln!("{}", e);
        return Ok(ExitCode::FAILURE);
    }

    let client = ImagenClient::new(&config.api_key, &config.image_model, config.request_timeout())
        .context("Failed to create Imagen client")?;
    let pacer = TokioPacer::new(config.pacing());
    let orchestrator = Orchestrator::new(Arc::new(client), Arc::new(pacer));
    let mut studio = Studio::new(orchestrator, history);

    info!(
        "Creating \"{}\" for {} ({} pages)",
        request.theme, request.name, request.page_count
    );

    let out_dir = config.get_output_dir();
    let result = studio
        .create_book(&request, &out_dir, save_images, |message, percentage| {
            println!("[{:>3.0}%] {}", percentage, message);
        })
        .await;

    match result {
        Ok(saved) => {
            println!("\nYour creation is ready!");
            println!("  PDF: {}", saved.pdf_path.display());
            for path in &saved.image_paths {
                println!("  Image: {}", path.display());
            }
            if let Some(creation) = saved.creation {
                debug!("Remembered as {}", creation.id);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(StudioError::Generate(e)) => {
            eprintln!("Oh no! Something went wrong. {}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Failed to save coloring book"),
    }
}

fn run_history(mut history: HistoryStore, action: HistoryAction) -> Result<ExitCode> {
    match action {
        HistoryAction::List => {
            if history.is_empty() {
                println!("No previous creations.");
            }
            for creation in history.list() {
                println!(
                    "{}  {}  For {} ({} pages)",
                    creation.id, creation.theme, creation.name, creation.page_count
                );
            }
        }
        HistoryAction::Show { id } => match history.get(&id) {
            Some(creation) => {
                println!("Theme: {}", creation.theme);
                println!("Name:  {}", creation.name);
                println!("Pages: {}", creation.page_count);
                println!("\nRe-run with: coloring-book generate --from-history {}", creation.id);
            }
            None => {
                eprintln!("No saved creation with id {}", id);
                return Ok(ExitCode::FAILURE);
            }
        },
        HistoryAction::Delete { id } => {
            if history.delete(&id)? {
                println!("Deleted {}", id);
            } else {
                eprintln!("No saved creation with id {}", id);
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_theme(store: &dyn KeyValueStore, action: ThemeAction) -> Result<ExitCode> {
    let current = ThemePreference::load(store);
    let theme = match action {
        ThemeAction::Show => current,
        ThemeAction::Set { theme } => theme,
        ThemeAction::Toggle => current.toggled(),
    };
    if theme != current {
        theme.save(store)?;
    }
    println!("{}", theme);
    Ok(ExitCode::SUCCESS)
}

async fn run_chat(config: &Config) -> Result<ExitCode> {
    let client = GeminiChatClient::new(&config.api_key, &config.chat_model, config.request_timeout())
        .context("Failed to create chat client")?;
    let panel = ChatPanel::new(Arc::new(client));

    println!("Chat with Gemini. Type /reset to start over, /quit to leave.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                panel.reset().await;
                println!("(new conversation)\n");
            }
            text => {
                if let Some(reply) = panel.send(text).await? {
                    println!("{}\n", reply.text);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
