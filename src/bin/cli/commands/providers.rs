use anyhow::Result;
use noteport::provider::ProviderDescriptor;
use noteport::ProviderKind;
use serde::Serialize;

use crate::OutputFormat;

#[derive(Serialize)]
struct ProviderEntry<'a> {
    id: &'static str,
    #[serde(flatten)]
    descriptor: &'a ProviderDescriptor,
}

pub fn run(format: &OutputFormat) -> Result<()> {
    let providers: Vec<_> = ProviderKind::all()
        .iter()
        .map(|kind| (*kind, kind.provider()))
        .collect();

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = providers
                .iter()
                .map(|(kind, provider)| ProviderEntry {
                    id: kind.as_str(),
                    descriptor: provider.descriptor(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (kind, provider) in &providers {
                let descriptor = provider.descriptor();
                println!(
                    "{:<12} {} {} ({})",
                    kind.as_str(),
                    descriptor.name,
                    descriptor.version,
                    descriptor.valid_extensions.join(", ")
                );
            }
        }
    }

    Ok(())
}
