use anyhow::{Context, Result};
use clap::Parser;
use rreader::app::{App, AppEvent, Summaries, Translation};
use rreader::config::{self, Config};
use rreader::feed::{Catalog, FeedFetcher};
use rreader::keybindings::KeybindingRegistry;
use rreader::refresh::{RefreshController, RefreshEvent, SnapshotStore};
use rreader::theme::ThemeVariant;
use rreader::translate::{GeminiTranslator, TranslationCache, Translator};
use rreader::ui;
use rreader::util::build_http_client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rreader",
    about = "Terminal RSS reader with categorized, merged feeds"
)]
struct Args {
    /// Config file (default: ~/.config/rreader/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feeds file (default: ~/.rreader/feeds.json)
    #[arg(long, value_name = "FILE")]
    feeds: Option<PathBuf>,

    /// Show original headlines only
    #[arg(long)]
    no_translate: bool,

    /// Print the parsed feeds file and exit
    #[arg(long)]
    print_feeds: bool,
}

/// Create `dir` if needed and restrict it to the current user.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(dir, perms) {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %e,
                        "Failed to set directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to read directory metadata");
            }
        }
    }
    Ok(())
}

/// The TUI owns the terminal, so logs go to `~/.rreader/rreader.log`.
/// Filter with `RUST_LOG` (default `warn`).
fn init_logging(data_dir: &Path) -> Result<()> {
    ensure_private_dir(data_dir)?;
    let log_path = data_dir.join("rreader.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn print_catalog(catalog: &Catalog) {
    for category in catalog.categories() {
        println!(
            "{} {} ({}){}",
            category.ordinal,
            category.title,
            category.id,
            if category.show_author {
                " [authors]"
            } else {
                ""
            }
        );
        for source in &category.feeds {
            println!("    {:<24} {}", source.name, source.url);
        }
    }
    println!(
        "{} categories, {} feeds",
        catalog.categories().len(),
        catalog.feed_count()
    );
}

/// Gemini client, or `None` when no key is configured or the settings are
/// unusable.
fn build_gemini(config: &Config, client: &reqwest::Client) -> Option<Arc<GeminiTranslator>> {
    let settings = &config.translation;
    let Some(api_key) = settings.resolve_api_key() else {
        tracing::info!(
            env = config::API_KEY_ENV,
            "No Gemini API key configured, showing original titles without summaries"
        );
        return None;
    };

    match GeminiTranslator::new(
        client.clone(),
        api_key,
        settings.base_url.as_deref(),
        Some(settings.model.as_str()),
    ) {
        Ok(gemini) => Some(Arc::new(gemini)),
        Err(e) => {
            tracing::warn!(error = %e, "Gemini unavailable");
            eprintln!("Warning: translation and summaries disabled: {}", e);
            None
        }
    }
}

/// Translation cache over `gemini`, or `None` when translation is turned off.
fn build_translation(
    config: &Config,
    gemini: &Arc<GeminiTranslator>,
    args: &Args,
) -> Option<Translation> {
    let settings = &config.translation;
    if args.no_translate || !settings.enabled {
        tracing::info!("Translation disabled");
        return None;
    }
    let cache = TranslationCache::with_limits(
        Arc::clone(gemini) as Arc<dyn Translator>,
        settings.max_in_flight,
        settings.timeout(),
    );
    Some(Translation::new(Arc::new(cache), &settings.target_language))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = config::data_dir().context("Cannot locate data directory")?;
    if !args.print_feeds {
        init_logging(&data_dir)?;
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_config_path().context("Cannot locate config directory")?,
    };
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };

    let feeds_path = match &args.feeds {
        Some(path) => path.clone(),
        None => config.feeds_path()?,
    };
    let catalog = match Catalog::load_or_init(&feeds_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: {}: {}", feeds_path.display(), e);
            std::process::exit(1);
        }
    };

    if args.print_feeds {
        print_catalog(&catalog);
        return Ok(());
    }

    tracing::info!(
        feeds_file = %feeds_path.display(),
        categories = catalog.categories().len(),
        feeds = catalog.feed_count(),
        "Loaded feeds"
    );

    let client = build_http_client().context("Failed to build HTTP client")?;
    let categories = catalog.categories().to_vec();

    let (refresh_tx, refresh_rx) = mpsc::channel::<RefreshEvent>(64);
    let store = SnapshotStore::new();
    let fetcher = FeedFetcher::new(client.clone()).with_timeout(config.fetch_timeout());
    let controller = Arc::new(
        RefreshController::new(fetcher, store.clone())
            .with_max_concurrent(config.max_concurrent_fetches)
            .with_events(refresh_tx),
    );
    let refresh = controller.start_background(categories.clone(), config.refresh_interval());

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!(warning = %warning, "Keybinding override ignored");
    }

    let mut app = App::new(
        categories,
        store,
        keybindings,
        ThemeVariant::from_config(&config.theme).palette(),
    )
    .with_refresh(refresh);
    if let Some(gemini) = build_gemini(&config, &client) {
        if let Some(translation) = build_translation(&config, &gemini, &args) {
            app = app.with_translation(translation);
        }
        let language = &config.translation.target_language;
        app = app.with_summaries(Summaries::new(gemini, language));
    }

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    ui::run(&mut app, event_tx, event_rx, refresh_rx).await?;

    Ok(())
}
