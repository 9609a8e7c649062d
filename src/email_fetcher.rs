// src/email_fetcher.rs

//! Mailbox intake over IMAP.
//!
//! Only unseen messages are fetched, and always with `BODY.PEEK[]` so the
//! server keeps them unseen. Each raw message is MIME-parsed into a
//! [`FetchedEmail`] and tagged with coarse intent keywords.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use regex::Regex;
use thiserror::Error;

use crate::config::ImapConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail credentials not configured. Set GMAIL_USER and GMAIL_APP_PASSWORD.")]
    NotConfigured,
    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("IMAP error: {0}")]
    Imap(#[from] imap::error::Error),
    #[error("Failed to parse email: {0}")]
    Parse(#[from] mailparse::MailParseError),
    #[error("Mail worker failed: {0}")]
    Worker(String),
}

/// A parsed inbound message, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedEmail {
    pub from: String,
    pub to: Option<String>,
    pub subject: String,
    pub content: String,
    pub received_date: DateTime<Utc>,
    pub keywords: Vec<String>,
    pub attachments: Vec<String>,
}

#[async_trait]
pub trait MailSource: Send + Sync {
    /// Every unseen message in the mailbox. Blocks until the whole scan completes.
    async fn fetch_unseen(&self) -> Result<Vec<FetchedEmail>, MailError>;
}

pub struct ImapMailSource {
    config: ImapConfig,
}

impl ImapMailSource {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailSource for ImapMailSource {
    async fn fetch_unseen(&self) -> Result<Vec<FetchedEmail>, MailError> {
        let config = self.config.clone();
        let raw_messages = tokio::task::spawn_blocking(move || fetch_unseen_blocking(&config))
            .await
            .map_err(|e| MailError::Worker(e.to_string()))??;

        let fetched_at = Utc::now();
        let mut emails = Vec::with_capacity(raw_messages.len());
        for raw in &raw_messages {
            match parse_message(raw, fetched_at) {
                Ok(email) => {
                    debug!("Parsed email from {}: {}", email.from, email.subject);
                    emails.push(email);
                }
                Err(e) => warn!("Skipping unparsable message: {}", e),
            }
        }
        Ok(emails)
    }
}

fn fetch_unseen_blocking(config: &ImapConfig) -> Result<Vec<Vec<u8>>, MailError> {
    let (user, password) = match (&config.user, &config.password) {
        (Some(user), Some(password)) => (user, password),
        _ => return Err(MailError::NotConfigured),
    };

    info!("Connecting to IMAP {}:{} as {}", config.host, config.port, user);
    let tls = native_tls::TlsConnector::builder().build()?;
    let client = imap::connect((config.host.as_str(), config.port), &config.host, &tls)?;
    let mut session = client.login(user, password).map_err(|(e, _client)| e)?;

    session.select(&config.mailbox)?;
    let unseen = session.search("UNSEEN")?;
    if unseen.is_empty() {
        info!("No unread emails in {}", config.mailbox);
        session.logout()?;
        return Ok(Vec::new());
    }
    info!("Found {} unread email(s)", unseen.len());

    let mut seqs: Vec<u32> = unseen.into_iter().collect();
    seqs.sort_unstable();
    let sequence_set = seqs
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let messages = session.fetch(sequence_set, "BODY.PEEK[]")?;
    let bodies = messages
        .iter()
        .filter_map(|m| m.body().map(<[u8]>::to_vec))
        .collect();
    session.logout()?;
    Ok(bodies)
}

/// Turns one RFC 822 message into a [`FetchedEmail`].
///
/// `fallback_date` is used when the message has no parsable `Date` header.
pub fn parse_message(raw: &[u8], fallback_date: DateTime<Utc>) -> Result<FetchedEmail, MailError> {
    let mail = mailparse::parse_mail(raw)?;
    let headers = &mail.headers;

    let from = headers
        .get_first_value("From")
        .and_then(|v| format_sender(&v))
        .unwrap_or_else(|| "unknown@example.com".to_string());
    let to = headers.get_first_value("To").filter(|v| !v.trim().is_empty());
    let subject = headers
        .get_first_value("Subject")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "(No Subject)".to_string());
    let received_date = headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .unwrap_or_else(|| {
            debug!("No usable Date header from {}, stamping with fetch time", from);
            fallback_date
        });

    let content = match find_body(&mail, "text/plain") {
        Some(text) => text,
        None => find_body(&mail, "text/html")
            .map(|html| html_to_text(&html))
            .unwrap_or_default(),
    };
    let content = if content.trim().is_empty() {
        "(Empty email)".to_string()
    } else {
        content.trim().to_string()
    };

    let mut attachments = Vec::new();
    collect_attachments(&mail, &mut attachments);

    let keywords = extract_keywords(&subject, &content);
    Ok(FetchedEmail {
        from,
        to,
        subject,
        content,
        received_date,
        keywords,
        attachments,
    })
}

/// `Name <addr>` when the header carries a display name, otherwise the bare address.
fn format_sender(header: &str) -> Option<String> {
    let info = mailparse::addrparse(header).ok()?.extract_single_info()?;
    match info.display_name.filter(|n| !n.trim().is_empty()) {
        Some(name) => Some(format!("{} <{}>", name, info.addr)),
        None => Some(info.addr),
    }
}

fn is_attachment(part: &ParsedMail) -> bool {
    part.get_content_disposition().disposition == DispositionType::Attachment
}

fn find_body(part: &ParsedMail, mimetype: &str) -> Option<String> {
    if is_attachment(part) {
        return None;
    }
    if part.subparts.is_empty() {
        if part.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            return part.get_body().ok().filter(|b| !b.trim().is_empty());
        }
        return None;
    }
    part.subparts.iter().find_map(|sub| find_body(sub, mimetype))
}

fn collect_attachments(part: &ParsedMail, names: &mut Vec<String>) {
    let disposition = part.get_content_disposition();
    if disposition.disposition == DispositionType::Attachment {
        if let Some(name) = disposition.params.get("filename") {
            names.push(name.clone());
        }
    }
    for sub in &part.subparts {
        collect_attachments(sub, names);
    }
}

fn tag_regex() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

/// Crude HTML → text: drop tags, turn `&nbsp;` into spaces.
pub fn html_to_text(html: &str) -> String {
    tag_regex()
        .replace_all(html, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

fn keyword_table() -> &'static [(&'static str, Regex)] {
    static TABLE: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            ("Preisanfrage", r"(?i)preis|angebot|kosten|quote|price|offer|cost"),
            ("Terminanfrage", r"(?i)termin|appointment|schedule|datum|meeting|date"),
            ("Anfrage", r"(?i)anfrage|inquiry|frage|question|request"),
            ("Beschwerde", r"(?i)beschwerde|complaint|problem|reklamation|issue"),
        ]
        .into_iter()
        .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("static regex")))
        .collect()
    })
}

/// Intent tags for an email; `Sonstiges` when nothing matches.
pub fn extract_keywords(subject: &str, content: &str) -> Vec<String> {
    let text = format!("{} {}", subject, content);
    let detected: Vec<String> = keyword_table()
        .iter()
        .filter(|(_, re)| re.is_match(&text))
        .map(|(tag, _)| tag.to_string())
        .collect();

    if detected.is_empty() {
        vec!["Sonstiges".to_string()]
    } else {
        detected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fallback() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn keywords_follow_the_tag_table() {
        assert_eq!(
            extract_keywords("Angebot für Heckenschnitt", "Was kostet das?"),
            vec!["Preisanfrage"]
        );
        assert_eq!(
            extract_keywords("Termin", "Ich habe eine Frage zur Beschwerde"),
            vec!["Terminanfrage", "Anfrage", "Beschwerde"]
        );
        assert_eq!(extract_keywords("Hallo", "Schöne Grüße"), vec!["Sonstiges"]);
    }

    #[test]
    fn keyword_matching_ignores_case() {
        assert_eq!(extract_keywords("PRICE", ""), vec!["Preisanfrage"]);
    }

    #[test]
    fn html_tags_are_stripped() {
        assert_eq!(
            html_to_text("<p>Hallo&nbsp;Team,</p><br/><b>bitte</b> Rasen mähen"),
            "Hallo Team,bitte Rasen mähen"
        );
    }

    #[test]
    fn plain_message_with_named_sender() {
        let raw = b"From: Alice Johnson <alice@example.com>\r\n\
To: office@greenbros.de\r\n\
Subject: Angebot Rasenpflege\r\n\
Date: Wed, 01 May 2024 09:30:00 +0000\r\n\
\r\n\
Bitte senden Sie mir ein Angebot.\r\n";
        let email = parse_message(raw, fallback()).unwrap();

        assert_eq!(email.from, "Alice Johnson <alice@example.com>");
        assert_eq!(email.to.as_deref(), Some("office@greenbros.de"));
        assert_eq!(email.subject, "Angebot Rasenpflege");
        assert_eq!(email.content, "Bitte senden Sie mir ein Angebot.");
        assert_eq!(
            email.received_date,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
        );
        assert_eq!(email.keywords, vec!["Preisanfrage"]);
    }

    #[test]
    fn missing_headers_get_placeholders() {
        let raw = b"Content-Type: text/plain\r\n\r\n\r\n";
        let email = parse_message(raw, fallback()).unwrap();

        assert_eq!(email.from, "unknown@example.com");
        assert_eq!(email.subject, "(No Subject)");
        assert_eq!(email.content, "(Empty email)");
        assert_eq!(email.received_date, fallback());
    }

    #[test]
    fn multipart_prefers_plain_text_and_lists_attachments() {
        let raw = b"From: bob@example.com\r\n\
Subject: Terminanfrage\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
\r\n\
--inner\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>HTML Version</p>\r\n\
--inner\r\n\
Content-Type: text/plain\r\n\
\r\n\
Text Version\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"plan.pdf\"\r\n\
\r\n\
JVBERi0=\r\n\
--outer--\r\n";
        let email = parse_message(raw, fallback()).unwrap();

        assert_eq!(email.from, "bob@example.com");
        assert_eq!(email.content, "Text Version");
        assert_eq!(email.attachments, vec!["plan.pdf"]);
        assert_eq!(email.keywords, vec!["Terminanfrage", "Anfrage"]);
    }

    #[test]
    fn html_only_message_falls_back_to_stripped_html() {
        let raw = b"From: carol@example.com\r\n\
Subject: Hallo\r\n\
Content-Type: text/html\r\n\
\r\n\
<div>Mein&nbsp;Garten</div>\r\n";
        let email = parse_message(raw, fallback()).unwrap();
        assert_eq!(email.content, "Mein Garten");
    }
}
