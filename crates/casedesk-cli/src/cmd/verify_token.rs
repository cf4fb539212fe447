use crate::output::print_json;
use casedesk_core::config::GatewayConfig;
use casedesk_core::session::SessionVerifier;

/// Check a session token the same way the guard does and print its claims.
pub fn run(config: &GatewayConfig, token: &str) -> anyhow::Result<()> {
    if config.jwt_secret.is_empty() {
        anyhow::bail!("jwt_secret is not configured");
    }
    let claims = SessionVerifier::new(&config.jwt_secret)
        .verify(token.trim())
        .map_err(|e| anyhow::anyhow!("token rejected: {e}"))?;
    print_json(&serde_json::to_value(claims)?)
}
