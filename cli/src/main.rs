mod atomic_write;
mod completion_client;
mod config;
mod native_messaging;

use std::io::Read as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use texty_overlay::CompletionBridge;
use texty_overlay::SettingsStore;
use texty_protocol::BridgeRequest;
use texty_protocol::CorrectionRequest;
use texty_protocol::CorrectionResult;
use texty_protocol::DEFAULT_PROMPT;
use texty_protocol::Settings;
use texty_protocol::SettingsField;
use tracing_subscriber::EnvFilter;

use crate::completion_client::HttpCompletionClient;
use crate::config::ConfigStore;

/// Environment variable holding the log filter; stderr only, stdout carries native messages.
const LOG_ENV: &str = "TEXTY_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "texty",
    version,
    about = "Completion bridge and settings tool for the texty correction overlay"
)]
struct Cli {
    /// Settings file to use instead of `~/.texty/config.toml`.
    #[arg(long, global = true, env = "TEXTY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum CliCommand {
    /// Run as a native-messaging host on stdin/stdout (the default).
    Bridge,

    /// Correct one piece of text with the stored settings and print the result.
    Fix {
        /// Text to correct; read from stdin when omitted.
        text: Option<String>,

        /// System prompt to send instead of the built-in one.
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Show or edit the stored settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum SettingsCommand {
    /// Print the stored settings with the API key masked.
    Show,

    /// Update one or more fields; the others keep their stored values.
    Set {
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        model: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let store = match cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::new_default()?,
    };

    match cli.command.unwrap_or(CliCommand::Bridge) {
        CliCommand::Bridge => run_bridge().await,
        CliCommand::Fix { text, prompt } => run_fix(&store, text, prompt).await,
        CliCommand::Settings { command } => run_settings(&store, command).await,
    }
}

async fn run_bridge() -> anyhow::Result<()> {
    let client = HttpCompletionClient::new()?;
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    tracing::info!("native messaging bridge started");
    native_messaging::serve(&mut stdin, &mut stdout, &client).await
}

async fn run_fix(
    store: &ConfigStore,
    text: Option<String>,
    prompt: Option<String>,
) -> anyhow::Result<()> {
    let settings = store
        .load()
        .await
        .with_context(|| format!("load settings from {}", store.path().display()))?;
    ensure_valid(&settings)?;

    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read text from stdin")?;
            buf
        }
    };
    let request = CorrectionRequest::new(prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()), text);

    let client = HttpCompletionClient::new()?;
    match client
        .complete(BridgeRequest::make_api_call(&settings, &request))
        .await
    {
        CorrectionResult::Success { text } => {
            println!("{text}");
            Ok(())
        }
        CorrectionResult::Failure { reason } => anyhow::bail!("correction failed: {reason}"),
    }
}

fn ensure_valid(settings: &Settings) -> anyhow::Result<()> {
    let missing = settings.missing_fields();
    if missing.is_empty() {
        return Ok(());
    }
    let names: Vec<_> = missing.into_iter().map(SettingsField::label).collect();
    anyhow::bail!(
        "settings are incomplete; set {} with `texty settings set`",
        names.join(", ")
    )
}

async fn run_settings(store: &ConfigStore, command: SettingsCommand) -> anyhow::Result<()> {
    let mut settings = store
        .load()
        .await
        .with_context(|| format!("load settings from {}", store.path().display()))?;

    match command {
        SettingsCommand::Show => {
            println!("{}", render_settings(&settings));
            println!("(from {})", store.path().display());
        }
        SettingsCommand::Set {
            endpoint,
            api_key,
            model,
        } => {
            let updates = [
                (SettingsField::Endpoint, endpoint),
                (SettingsField::ApiKey, api_key),
                (SettingsField::Model, model),
            ];
            for (field, update) in updates {
                if let Some(update) = update {
                    settings.set(field, update);
                }
            }
            store
                .save(&settings)
                .await
                .with_context(|| format!("save settings to {}", store.path().display()))?;
            println!("{}", render_settings(&settings));
        }
    }
    Ok(())
}

fn render_settings(settings: &Settings) -> String {
    SettingsField::ALL
        .into_iter()
        .map(|field| {
            let shown = match field {
                SettingsField::ApiKey => mask_secret(settings.get(field)),
                SettingsField::Endpoint | SettingsField::Model => settings.get(field).to_string(),
            };
            format!("{}: {shown}", field.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        1..=8 => "*".repeat(chars.len()),
        len => {
            let tail: String = chars[len - 4..].iter().collect();
            format!("{}...{tail}", chars[..3].iter().collect::<String>())
        }
    }
}
