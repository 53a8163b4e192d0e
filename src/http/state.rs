use std::sync::Arc;

use crate::session::AnalysisSession;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    /// The one process-wide analysis session
    pub session: Arc<AnalysisSession>,
}
