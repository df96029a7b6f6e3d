//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use docbot_client::{Client, Credentials, Message};
use docbot_helper::DocumentHelper;
use docbot_shared::{
    ApiConfig, AppConfig, init_config, load_config, load_config_from, resolve_access_token,
    resolve_oauth,
};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docbot — find, read and extend shared documents by title.
#[derive(Parser)]
#[command(
    name = "docbot",
    version,
    about = "Find, read and extend shared documents by title.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docbot/docbot.toml.
    #[arg(long, global = true, env = "DOCBOT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// List documents whose title matches.
    Find {
        /// Title to search for.
        title: String,
    },

    /// Print the plain text of the first document matching a title.
    Read {
        /// Title to search for.
        title: String,
    },

    /// Insert HTML after the last list item of the first matching document.
    Append {
        /// Title to search for.
        title: String,

        /// HTML to insert, e.g. "<li>Buy milk</li>".
        content: String,
    },

    /// Show the user the access token belongs to.
    Whoami,

    /// OAuth helpers.
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Open the event websocket and print incoming messages.
    Listen,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// OAuth subcommands.
#[derive(Subcommand)]
pub(crate) enum AuthAction {
    /// Print the authorization URL to send a user to.
    Url {
        #[arg(long)]
        redirect_uri: String,

        /// Opaque value echoed back to the redirect URI.
        #[arg(long)]
        state: Option<String>,
    },
    /// Exchange an authorization code for an access token.
    Exchange {
        /// Must match the redirect URI used to obtain the code.
        #[arg(long)]
        redirect_uri: String,

        #[arg(long)]
        code: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docbot=info",
        1 => "docbot=debug",
        _ => "docbot=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(std::path::Path::new(path))?,
        None => load_config()?,
    };

    match cli.command {
        Command::Find { title } => cmd_find(&config, &title).await,
        Command::Read { title } => cmd_read(&config, &title).await,
        Command::Append { title, content } => cmd_append(&config, &title, &content).await,
        Command::Whoami => cmd_whoami(&config).await,
        Command::Auth { action } => match action {
            AuthAction::Url {
                redirect_uri,
                state,
            } => cmd_auth_url(&config, &redirect_uri, state.as_deref()),
            AuthAction::Exchange { redirect_uri, code } => {
                cmd_auth_exchange(&config, &redirect_uri, &code).await
            }
        },
        Command::Listen => cmd_listen(&config).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn token_client(config: &AppConfig) -> Result<Client> {
    let token = resolve_access_token(config)?;
    Ok(Client::with_token(&ApiConfig::from(config), token)?)
}

fn oauth_client(config: &AppConfig) -> Result<Client> {
    let (client_id, client_secret) = resolve_oauth(config)?;
    let credentials = Credentials::OAuth {
        client_id,
        client_secret,
    };
    Ok(Client::new(&ApiConfig::from(config), credentials)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_find(config: &AppConfig, title: &str) -> Result<()> {
    let helper = DocumentHelper::new(token_client(config)?);
    let results = helper.find_document_by_title(title).await?;

    if results.is_empty() {
        println!("{}", docbot_helper::NO_RESULTS_TEXT);
        return Ok(());
    }

    for result in &results {
        let id = result.pointer("/thread/id").and_then(Value::as_str).unwrap_or("?");
        let doc_title = result
            .pointer("/thread/title")
            .and_then(Value::as_str)
            .unwrap_or("(untitled)");
        println!("{id}\t{doc_title}");
    }

    Ok(())
}

async fn cmd_read(config: &AppConfig, title: &str) -> Result<()> {
    let helper = DocumentHelper::new(token_client(config)?);
    let text = helper.get_contents_by_title(title).await?;
    println!("{text}");
    Ok(())
}

async fn cmd_append(config: &AppConfig, title: &str, content: &str) -> Result<()> {
    let helper = DocumentHelper::new(token_client(config)?);
    info!(title, "appending to document");
    let outcome = helper.find_and_edit_document(title, content).await?;
    println!("{outcome}");
    Ok(())
}

async fn cmd_whoami(config: &AppConfig) -> Result<()> {
    let user = token_client(config)?.authenticated_user().await?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

fn cmd_auth_url(config: &AppConfig, redirect_uri: &str, state: Option<&str>) -> Result<()> {
    let url = oauth_client(config)?.authorization_url(redirect_uri, state)?;
    println!("{url}");
    Ok(())
}

async fn cmd_auth_exchange(config: &AppConfig, redirect_uri: &str, code: &str) -> Result<()> {
    let token = oauth_client(config)?
        .access_token(redirect_uri, code)
        .await?;

    println!();
    println!("  Access token obtained.");
    println!("  Export it as {} to use it:", config.auth.token_env);
    println!();
    println!("  export {}={}", config.auth.token_env, token.access_token);
    if let Some(refresh) = &token.refresh_token {
        println!("  refresh token: {refresh}");
    }
    if let Some(expires_in) = token.expires_in {
        println!("  expires in:    {expires_in}s");
    }
    println!();

    Ok(())
}

async fn cmd_listen(config: &AppConfig) -> Result<()> {
    let mut socket = token_client(config)?.connect_websocket().await?;
    info!("listening for events (ctrl-C to stop)");

    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => println!("{}", text.as_str()),
            Message::Close(frame) => {
                info!(?frame, "websocket closed by server");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    println!("# resolved API base: {}", ApiConfig::from(config).base_url());
    Ok(())
}
