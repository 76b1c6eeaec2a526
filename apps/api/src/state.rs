use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::AnalysisModel;
use crate::relay::LeadRelay;
use crate::wizard::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Analysis backend. `LlmClient` in production, canned responses in tests.
    pub model: Arc<dyn AnalysisModel>,
    /// Lead relay. `DisabledRelay` when EmailJS is not configured.
    pub relay: Arc<dyn LeadRelay>,
    pub sessions: SessionStore,
}
