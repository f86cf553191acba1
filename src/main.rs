use anyhow::{Context, Result};
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use inbox_digest::ai::ModelClient;
use inbox_digest::app::AppState;
use inbox_digest::config::{AccountConfig, Config, ImapConfig};
use inbox_digest::constants::DEFAULT_IMAP_PORT;
use inbox_digest::credentials::CredentialStore;
use inbox_digest::mail::ImapConnector;
use inbox_digest::web;

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,inbox_digest=debug"));

    let log_file = Config::config_dir()
        .ok()
        .map(|dir| dir.join("inbox-digest.log"))
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .ok()
        });

    // Console output stays on so the dashboard URL is visible
    let console = tracing_subscriber::fmt::layer().with_writer(io::stderr);
    let file = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
}

fn print_usage() {
    eprintln!(
        r#"inbox-digest - Summaries, deadlines and action items for your inbox

Usage: inbox-digest [command]

Commands:
    (none)      Start the dashboard server
    setup       Configure the default account and store its password
    help        Show this help message

Configuration file: ~/.config/inbox-digest/config.toml
Environment:
    INBOX_DIGEST_PASSWORD    IMAP password (overrides the keyring)
    INBOX_DIGEST_MODEL_KEY   API key for the summarization endpoint
    RUST_LOG                 Log filter
"#
    );
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn is_valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-')
        && !host.starts_with(['.', '-'])
        && !host.ends_with('.')
        && host.contains('.')
}

fn run_setup() -> Result<()> {
    println!("Inbox Digest Setup");
    println!("==================\n");

    let config_path = Config::config_path()?;
    let mut config = if config_path.exists() {
        let answer = prompt("Configuration already exists. Replace the account? [y/N]: ")?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }
        Config::load()?
    } else {
        Config::default()
    };

    let email = loop {
        let email = prompt("Email address: ")?;
        if is_valid_email(&email) {
            break email;
        }
        println!("Invalid email format. Please enter a valid email address (e.g., user@example.com)");
    };

    let username = prompt("IMAP login (blank to use the email address): ")?;
    let username = Some(username).filter(|u| !u.is_empty() && *u != email);

    let server = loop {
        let server = prompt("IMAP server: ")?;
        if is_valid_hostname(&server) {
            break server;
        }
        println!("Invalid server hostname. Please enter a valid hostname (e.g., imap.example.com)");
    };

    let port = loop {
        let port = prompt(&format!("IMAP port [{}]: ", DEFAULT_IMAP_PORT))?;
        if port.is_empty() {
            break DEFAULT_IMAP_PORT;
        }
        match port.parse::<u16>() {
            Ok(port) if port > 0 => break port,
            _ => println!("Invalid port. Please enter a number between 1 and 65535"),
        }
    };

    print!("Password (app password recommended): ");
    io::stdout().flush()?;
    let password = read_password()?;
    println!();

    config.account = Some(AccountConfig {
        email: email.clone(),
        username,
        imap: ImapConfig { server, port },
    });

    config.ensure_dirs()?;
    config.save()?;
    println!("Configuration saved to {}", config_path.display());

    if password.is_empty() {
        println!("No password given; the dashboard will ask for one.");
    } else {
        let creds = CredentialStore::new(&email);
        creds.set_password(&password)?;
        if !creds.has_credentials() {
            anyhow::bail!("Credential storage failed");
        }
        println!("Password stored successfully.");
    }

    println!("\nSetup complete! Run 'inbox-digest' and open {}", config.server.url());
    Ok(())
}

fn read_password() -> Result<String> {
    let _guard = DisableEcho::new()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    Ok(password.trim().to_string())
}

struct DisableEcho {
    #[cfg(unix)]
    original: libc::termios,
}

impl DisableEcho {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use std::mem::MaybeUninit;
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();
        let mut termios = MaybeUninit::<libc::termios>::uninit();

        // SAFETY: tcgetattr initializes termios on success, checked before assume_init
        unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                anyhow::bail!("Failed to get terminal attributes");
            }
            let original = termios.assume_init();
            let mut silent = original;
            silent.c_lflag &= !libc::ECHO;
            if libc::tcsetattr(fd, libc::TCSANOW, &silent) != 0 {
                anyhow::bail!("Failed to set terminal attributes");
            }
            Ok(Self { original })
        }
    }

    #[cfg(not(unix))]
    fn new() -> Result<Self> {
        Ok(Self {})
    }
}

#[cfg(unix)]
impl Drop for DisableEcho {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        let fd = io::stdin().as_raw_fd();
        // SAFETY: restores the attributes read in new()
        unsafe {
            libc::tcsetattr(fd, libc::TCSANOW, &self.original);
        }
    }
}

async fn run_server() -> Result<()> {
    setup_logging();

    let config = Config::load()?;
    config.ensure_dirs()?;

    if config.account.is_none() {
        tracing::info!("No account configured; enter server details in the dashboard");
    }
    if config.summarizer.resolved_api_key().is_none() {
        tracing::warn!("No model API key configured; summaries may be rate limited or unavailable");
    }

    let connector = ImapConnector::new().context("Failed to initialize TLS")?;
    let summarizer = ModelClient::new(&config.summarizer);
    let open_browser = config.server.open_browser;
    let url = config.server.url();

    let state = Arc::new(AppState::new(config, connector, summarizer));

    if open_browser {
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            if let Err(e) = open::that_detached(&url) {
                tracing::warn!("Could not open browser: {}", e);
            }
        });
    }

    web::serve(state).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some("setup") => run_setup(),
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
        None => run_server().await,
    }
}
