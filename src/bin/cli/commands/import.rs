use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use noteport::{source, HashAlgorithm, ImportConfig, ProviderKind};

pub fn run(
    kind: ProviderKind,
    paths: &[PathBuf],
    config_path: Option<&Path>,
    hash: Option<HashAlgorithm>,
    pretty: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ImportConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ImportConfig::default(),
    };
    if let Some(hash) = hash {
        config.hash_algorithm = hash;
    }

    let files = source::load_paths(paths).context("Failed to read import sources")?;

    let provider = kind.provider();
    let descriptor = provider.descriptor();
    let rejected = files.iter().filter(|f| !descriptor.accepts(f)).count();
    if rejected > 0 {
        log::debug!("{} of {} files are not {} exports", rejected, files.len(), descriptor.name);
    }

    let result = noteport::import(kind, &files, &config.settings());

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    eprintln!(
        "{}: {} notes, {} attachments, {} errors",
        descriptor.name,
        result.notes.len(),
        result.attachment_count(),
        result.errors.len()
    );
    for error in &result.errors {
        eprintln!("  {}", error);
    }

    Ok(())
}
