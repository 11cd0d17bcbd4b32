use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::{CompletionClient, ModelCatalog};
use crate::lookup::LookupTables;
use crate::output_log::OutputLog;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read-only after startup.
    pub lookup: Arc<LookupTables>,
    /// Pluggable completion backend. Anthropic by default, OpenAI-compatible via COMPLETION_PROVIDER.
    pub completion: Arc<dyn CompletionClient>,
    pub sessions: SessionStore,
    pub output_log: OutputLog,
    pub models: ModelCatalog,
    pub config: Config,
}
