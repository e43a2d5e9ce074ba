//! ProudShop CLI - migrations and back-office management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! ps-cli migrate
//!
//! # Create admin user
//! ps-cli admin create -e admin@example.com -n "Admin Name" -r super_admin -p '...'
//!
//! # Read and write settings through the API
//! ps-cli settings set smtp_host smtp.example.com --plaintext
//! ps-cli settings get smtp_host
//!
//! # Check SMTP configuration
//! ps-cli email check
//! ps-cli email auth-matrix
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin` - Create admins, reset passwords, obtain a token
//! - `settings` - Settings store (get, set, list, category, delete)
//! - `crypto` - Encrypt or decrypt a value with the settings key
//! - `chat` - Open, post to and watch a live chat session
//! - `email` - SMTP diagnostics and test send

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use proudshop_core::ChatRole;

mod commands;

#[derive(Parser)]
#[command(name = "ps-cli")]
#[command(author, version, about = "ProudShop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Read and write the settings store
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Encrypt or decrypt a single value
    Crypto {
        #[command(subcommand)]
        action: CryptoAction,
    },
    /// Live chat session
    Chat {
        /// File holding the current session id
        #[arg(long, global = true, default_value = commands::chat::DEFAULT_STATE_FILE)]
        state_file: PathBuf,

        #[command(subcommand)]
        action: ChatAction,
    },
    /// SMTP diagnostics
    Email {
        #[command(subcommand)]
        action: EmailAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `staff`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Replace an admin's password
    SetPassword {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Log in against the API and print a bearer token
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print a decrypted value
    Get { key: String },
    /// Create or replace a setting (encrypted unless --plaintext)
    Set {
        key: String,
        value: String,

        /// Category (inferred from the key when omitted)
        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Store the value unencrypted
        #[arg(long)]
        plaintext: bool,
    },
    /// List all settings (encrypted values hidden)
    List,
    /// Print the decrypted settings of one category
    Category { category: String },
    /// Delete a setting
    Delete { key: String },
}

#[derive(Subcommand)]
enum CryptoAction {
    Encrypt {
        value: String,

        /// Use AES-256-CBC instead of AES-256-GCM
        #[arg(long)]
        simple: bool,
    },
    Decrypt { value: String },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Open a new session and remember it
    Open {
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,
    },
    /// Post a message to the current session
    Send {
        content: String,

        /// `user`, `admin` or `system` (non-user roles need a token)
        #[arg(short, long, default_value = "user")]
        role: ChatRole,
    },
    /// Print the history and poll for new messages
    Watch,
    /// Forget the current session
    Close {
        /// Also delete it on the server (admin token required)
        #[arg(long)]
        delete: bool,
    },
}

#[derive(Subcommand)]
enum EmailAction {
    /// Show the resolved SMTP configuration (masked)
    Check,
    /// Try SSL 465, STARTTLS 587 and the other common modes
    AuthMatrix,
    /// Send a test message
    Test {
        #[arg(short, long)]
        to: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::admin::create_user(&email, &name, &role, &password).await?;
            }
            AdminAction::SetPassword { email, password } => {
                commands::admin::set_password(&email, &password).await?;
            }
            AdminAction::Login { email, password } => {
                commands::admin::login(&email, &password).await?;
            }
        },
        Commands::Settings { action } => match action {
            SettingsAction::Get { key } => commands::settings::get(&key).await?,
            SettingsAction::Set {
                key,
                value,
                category,
                description,
                plaintext,
            } => commands::settings::set(&key, &value, category, description, plaintext).await?,
            SettingsAction::List => commands::settings::list().await?,
            SettingsAction::Category { category } => {
                commands::settings::category(&category).await?;
            }
            SettingsAction::Delete { key } => commands::settings::delete(&key).await?,
        },
        Commands::Crypto { action } => match action {
            CryptoAction::Encrypt { value, simple } => commands::crypto::encrypt(&value, simple)?,
            CryptoAction::Decrypt { value } => commands::crypto::decrypt(&value)?,
        },
        Commands::Chat { state_file, action } => match action {
            ChatAction::Open { name, email } => {
                commands::chat::open(&state_file, name, email).await?;
            }
            ChatAction::Send { content, role } => {
                commands::chat::send(&state_file, &content, role).await?;
            }
            ChatAction::Watch => commands::chat::watch(&state_file).await?,
            ChatAction::Close { delete } => commands::chat::close(&state_file, delete).await?,
        },
        Commands::Email { action } => match action {
            EmailAction::Check => commands::email::check().await?,
            EmailAction::AuthMatrix => commands::email::auth_matrix().await?,
            EmailAction::Test { to } => commands::email::test(&to).await?,
        },
    }
    Ok(())
}
