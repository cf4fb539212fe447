use anyhow::Context;
use casedesk_core::export::{export, ExportFormat};
use std::io::Read;
use std::path::Path;

/// Render `input` (or stdin) as a downloadable document. The body goes to
/// `output` when given, otherwise to stdout.
pub fn run(
    name: &str,
    format: &str,
    input: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let format = ExportFormat::parse(format)?;
    let content = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    if content.trim().is_empty() {
        anyhow::bail!("Content is required");
    }

    let doc = export(name, &content, format);
    match output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(&doc.filename)
            } else {
                path.to_path_buf()
            };
            std::fs::write(&path, &doc.body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{}", doc.body),
    }
    Ok(())
}
