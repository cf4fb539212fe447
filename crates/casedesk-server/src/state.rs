use std::sync::Arc;

use casedesk_core::config::GatewayConfig;
use casedesk_core::cookie::CookieOptions;
use casedesk_core::guard::GuardPolicy;
use casedesk_core::session::SessionVerifier;

use crate::backend::BackendClient;

/// Shared, immutable per-process state. Cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub backend: BackendClient,
    pub verifier: SessionVerifier,
    pub guard: Arc<GuardPolicy>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let backend = BackendClient::new(config.clone())?;
        let verifier = SessionVerifier::new(&config.jwt_secret);
        let guard = Arc::new(GuardPolicy::from_config(&config));
        Ok(Self {
            config,
            backend,
            verifier,
            guard,
        })
    }

    /// Attributes for the cookies issued at login and signup.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            max_age_secs: self.config.session_max_age_secs,
            secure: self.config.secure_cookies,
        }
    }
}
