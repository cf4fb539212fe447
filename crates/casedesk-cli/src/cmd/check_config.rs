use crate::output::print_json;
use casedesk_core::config::{GatewayConfig, WarnLevel};

pub fn run(config: &GatewayConfig, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({
            "backend_url": config.backend_url,
            "port": config.port,
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if GatewayConfig::has_errors(&warnings) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
