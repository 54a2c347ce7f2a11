mod common;
mod config;
mod controller;
mod network;
mod session;
mod store;
mod ui;

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use common::ChatError;
use config::AppConfig;
use controller::ConversationController;
use network::{HttpChatApi, LoginRequest, RegisterRequest};
use session::Session;
use ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "rust_sync_chat",
    version,
    about = "Chat client that keeps conversation history in sync with a live channel"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Backend base address, overrides BACKEND_URL and the config file
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,
    /// Access token; skips the login request
    #[arg(long, env = "CHAT_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, env = "CHAT_EMAIL")]
    email: Option<String>,
    #[arg(long, env = "CHAT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Log in and print the access token
    Login,
    /// Create an account and print the access token
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        mobile: String,
    },
    /// List conversations
    Chats,
    /// Print the message history of a conversation
    History { chat_id: String },
    /// Send a message to a conversation
    Send { chat_id: String, content: String },
    /// Open the chat window (default)
    Ui,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    // Khởi tạo Logger để debug
    env_logger::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let app_config = config::load_config(&cli.config);
    let env_url = std::env::var(config::BACKEND_URL_ENV).ok();
    let backend_url =
        config::resolve_backend_url(cli.backend_url.as_deref(), env_url.as_deref(), &app_config)?;
    log::info!("Using API: {backend_url}");

    match cli.command.clone().unwrap_or(Command::Ui) {
        Command::Login => {
            let token = login(&cli, &app_config, &backend_url).await?;
            println!("{token}");
        }
        Command::Register { name, mobile } => {
            let (email, password) = credentials(&cli, &app_config)?;
            let request = RegisterRequest {
                name,
                email,
                mobile,
                password,
            };
            let token = HttpChatApi::register(&backend_url, &request).await?;
            config::remember_login(&cli.config, &backend_url, &request.email);
            println!("{token}");
        }
        Command::Chats => {
            let session = authenticate(&cli, &app_config, &backend_url).await?;
            for chat in session.api().list_conversations().await? {
                let participants: Vec<&str> =
                    chat.participant_ids.iter().map(|id| id.as_str()).collect();
                println!("{}\t{}", chat.id, participants.join(", "));
            }
        }
        Command::History { chat_id } => {
            let session = authenticate(&cli, &app_config, &backend_url).await?;
            for message in session.api().fetch_history(&chat_id).await? {
                let time = message.display_time().unwrap_or_else(|| "--:--".to_string());
                println!("[{time}] {}: {}", message.sender_id, message.content);
            }
        }
        Command::Send { chat_id, content } => {
            if content.trim().is_empty() {
                return Err(ChatError::EmptyMessage.into());
            }
            let session = authenticate(&cli, &app_config, &backend_url).await?;
            session.api().send_message(&chat_id, &content).await?;
            log::info!("Message sent to {chat_id}");
        }
        Command::Ui => {
            let session = authenticate(&cli, &app_config, &backend_url).await?;
            run_full_client(session).await?;
        }
    }

    Ok(())
}

fn credentials(cli: &Cli, app_config: &AppConfig) -> Result<(String, String), ChatError> {
    let email = cli
        .email
        .clone()
        .or_else(|| app_config.email.clone())
        .ok_or_else(|| ChatError::Config("missing --email (or CHAT_EMAIL)".to_string()))?;
    let password = cli
        .password
        .clone()
        .ok_or_else(|| ChatError::Config("missing --password (or CHAT_PASSWORD)".to_string()))?;
    Ok((email, password))
}

async fn login(cli: &Cli, app_config: &AppConfig, backend_url: &str) -> Result<String, ChatError> {
    let (email, password) = credentials(cli, app_config)?;
    let request = LoginRequest { email, password };
    let token = HttpChatApi::login(backend_url, &request).await?;
    config::remember_login(&cli.config, backend_url, &request.email);
    Ok(token)
}

async fn authenticate(
    cli: &Cli,
    app_config: &AppConfig,
    backend_url: &str,
) -> Result<Session, ChatError> {
    let token = match cli.token.clone().filter(|token| !token.trim().is_empty()) {
        Some(token) => token,
        None => login(cli, app_config, backend_url).await?,
    };
    Session::authenticate(backend_url, token).await
}

async fn run_full_client(session: Session) -> Result<(), eframe::Error> {
    // 1. Tạo các kênh giao tiếp (Channels)
    // UI -> Controller
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Controller -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    // 2. Khởi chạy controller (Chạy ngầm)
    let shared_store = store::shared();
    let controller = Arc::new(ConversationController::new(
        &session,
        Arc::clone(&shared_store),
        event_tx,
    ));
    let controller_task = tokio::spawn(controller.run(cmd_rx));

    // 3. Khởi chạy UI (Chạy trên Main Thread)
    let options = eframe::NativeOptions::default();
    let mut event_rx = Some(event_rx);
    let me = session.identity().clone();
    log::info!(
        "Starting chat window for {}",
        session.profile().name.as_deref().unwrap_or(me.as_str())
    );

    let result = eframe::run_native(
        "Rust Sync Chat",
        options,
        Box::new(move |cc| {
            let event_receiver = event_rx
                .take()
                .expect("ChatApp should only be initialized once");

            log::info!("Chat window opened for {me}");

            Ok(Box::new(ChatApp::new(
                cc,
                me.clone(),
                Arc::clone(&shared_store),
                cmd_tx.clone(),
                event_receiver,
            )))
        }),
    );

    // The window owned the command sender; the controller now closes the channel.
    if tokio::time::timeout(Duration::from_secs(2), controller_task)
        .await
        .is_err()
    {
        log::warn!("Controller did not stop in time");
    }

    result
}
