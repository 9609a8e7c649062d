use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

#[derive(Clone, Debug)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub mailbox: String,
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_file: PathBuf,
    pub uploads_dir: PathBuf,
    pub frontend_origin: String,
    pub seed_sample_data: bool,
    pub max_upload_bytes: usize,
    pub imap: ImapConfig,
    pub gemini: GeminiConfig,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parsed_or("PORT", 3001),
            data_file: PathBuf::from(var_or("DATA_FILE", "data/database.json")),
            uploads_dir: PathBuf::from(var_or("UPLOADS_DIR", "uploads")),
            frontend_origin: var_or("FRONTEND_ORIGIN", "http://localhost:3000"),
            seed_sample_data: parsed_or("SEED_SAMPLE_DATA", true),
            max_upload_bytes: parsed_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            imap: ImapConfig {
                host: var_or("IMAP_HOST", "imap.gmail.com"),
                port: parsed_or("IMAP_PORT", 993),
                user: non_empty("GMAIL_USER"),
                // App passwords are shown in groups of four separated by spaces.
                password: non_empty("GMAIL_APP_PASSWORD")
                    .map(|p| p.chars().filter(|c| !c.is_whitespace()).collect()),
                mailbox: var_or("IMAP_MAILBOX", "INBOX"),
            },
            gemini: GeminiConfig {
                api_key: non_empty("GEMINI_API_KEY"),
                model: var_or("GEMINI_MODEL", "gemini-2.5-flash"),
                endpoint: var_or("GEMINI_ENDPOINT", "https://generativelanguage.googleapis.com"),
                timeout_secs: parsed_or("AI_TIMEOUT_SECS", 60),
            },
        }
    }

    /// Sender recorded on outgoing messages.
    pub fn mailbox_address(&self) -> String {
        self.imap
            .user
            .clone()
            .unwrap_or_else(|| "office@localhost".to_string())
    }
}
