use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use jobchat_core::{
    ChatClient, ChatController, Collaborators, CommandSynthesizer, Config, CpalMicrophone,
    SessionStore, SpeechOutput, StreamSettings, TranscriptionClient, TOKEN_KEY,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "jobchat", version)]
#[command(about = "Terminal chat client for the job-support assistant")]
struct Cli {
    /// Chat backend base URL
    #[arg(long, env = "JOBCHAT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Login token sent as the bearer credential
    #[arg(long, env = "JOBCHAT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Start with text-to-speech turned on
    #[arg(long)]
    tts: bool,

    /// Request timeout in seconds (none by default)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Where to write logs (default: <config dir>/jobchat/jobchat.log)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the available microphones and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        for name in CpalMicrophone::list_devices()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = Config::load()
        .context("failed to read config file")?
        .with_env_overrides();
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if cli.tts {
        config.tts_enabled = true;
    }
    if cli.timeout.is_some() {
        config.request_timeout_secs = cli.timeout;
    }

    let config_dir = Config::config_dir()?;
    let log_path = cli
        .log_file
        .unwrap_or_else(|| config_dir.join("jobchat.log"));
    init_logging(&log_path)?;

    let session_path = config_dir.join("session.json");
    let store = SessionStore::load(&session_path)
        .with_context(|| format!("failed to read {}", session_path.display()))?;
    if let Some(token) = cli.token {
        store.set(TOKEN_KEY, &token);
    }

    let controller = build_controller(&config, store)?;
    info!("connecting to {}", config.backend_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, App::new(controller)).await;
    tui::restore()?;

    result
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    // The terminal belongs to the UI, so logs only go to the file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobchat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_controller(config: &Config, store: SessionStore) -> Result<ChatController> {
    let timeout = config.request_timeout();
    let backend = ChatClient::new(&config.backend_url, timeout)?;
    let transcriber = TranscriptionClient::new(
        &config.stt_url,
        config.openai_api_key.clone(),
        &config.stt_model,
        &config.language,
        timeout,
    )?;
    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set; voice messages cannot be transcribed");
    }

    let speech = SpeechOutput::new(
        Box::new(CommandSynthesizer::new(&config.language)),
        config.tts_enabled,
    );

    Ok(ChatController::new(
        Collaborators {
            backend: Arc::new(backend),
            transcriber: Arc::new(transcriber),
            tokens: Arc::new(store),
            microphone: Box::new(CpalMicrophone::new(config.input_device.clone())),
            speech,
        },
        StreamSettings::from(config),
    ))
}

async fn run(terminal: &mut Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();
    app.controller.initialize();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(&mut app, event),
            Some(event) = app.controller.next_event() => {
                app.controller.handle_event(event);
                app.sync_scroll();
            }
            else => break,
        }
    }

    app.controller.shutdown();
    Ok(())
}
