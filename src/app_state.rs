use crate::ai_analyzer::EmailAnalyzer;
use crate::config::Config;
use crate::email_fetcher::MailSource;
use crate::store::JsonStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
    pub config: Config,
    pub mailbox: Arc<dyn MailSource>,
    pub analyzer: Arc<dyn EmailAnalyzer>,
}
