use casedesk_core::config::{GatewayConfig, WarnLevel};

pub fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let warnings = config.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => tracing::error!("{}", w.message),
        }
    }
    if GatewayConfig::has_errors(&warnings) {
        anyhow::bail!("config validation found errors; refusing to start");
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(casedesk_server::serve(config))
}
