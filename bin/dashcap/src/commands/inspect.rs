use std::fmt::Write;

use anyhow::Context;
use clap::Parser;
use dashcap::{
    mpd::{AdaptationSet, ContentProtection, Period},
    select_best, select_streams, HttpManifestSource, ManifestDocument, ManifestSource,
    ProtectionRecord,
};
use url::Url;

use super::HttpOptions;
use crate::config::Config;

/// Print the periods, adaptation sets, representations and protection
/// records of a manifest
#[derive(Parser, Clone, Debug)]
#[clap(name = "inspect", short_flag = 'S')]
pub struct InspectCommand {
    #[clap(flatten)]
    pub http: HttpOptions,

    /// Manifest URL or local file
    pub input: String,
}

impl InspectCommand {
    async fn load(&self, config: &Config) -> anyhow::Result<ManifestDocument> {
        if self.input.starts_with("http://") || self.input.starts_with("https://") {
            let url: Url = self.input.parse()?;
            let client = self.http.acquirer_config(config).build_client()?;
            let response = HttpManifestSource::new(client, url).fetch_manifest().await?;
            return Ok(ManifestDocument::parse(&response.text, response.url)?);
        }

        let path = std::path::absolute(&self.input)?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let url = Url::from_file_path(&path)
            .map_err(|_| anyhow::anyhow!("Invalid manifest path {}", path.display()))?;
        Ok(ManifestDocument::parse(&text, url)?)
    }

    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let document = self.load(config).await?;
        print!("{}", describe(&document)?);
        Ok(())
    }
}

fn describe(document: &ManifestDocument) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Manifest: {}", document.source_url())?;
    writeln!(out, "Type: {}", document.presentation_type())?;
    if let Some(duration) = document.media_presentation_duration() {
        writeln!(out, "Duration: {:.3}s", duration.as_secs_f64())?;
    }

    let periods = document.periods();
    if periods.is_empty() {
        writeln!(out, "No period found")?;
    }
    for (index, period) in periods.iter().enumerate() {
        describe_period(&mut out, index, period)?;
    }

    if let Ok(period) = document.content_period() {
        match select_streams(document, &period) {
            Ok(selection) => writeln!(
                out,
                "Selected: video {} / audio {}",
                selection.video.id(),
                selection.audio.id()
            )?,
            Err(e) => writeln!(out, "Selected: none ({e})")?,
        }
    }
    Ok(out)
}

fn describe_period(out: &mut String, index: usize, period: &Period<'_>) -> anyhow::Result<()> {
    writeln!(
        out,
        "Period #{index} id={} start={}",
        period.id().unwrap_or("-"),
        period.start().unwrap_or("-")
    )?;
    for set in period.adaptation_sets(None) {
        describe_adaptation_set(out, &set)?;
    }
    Ok(())
}

fn describe_adaptation_set(out: &mut String, set: &AdaptationSet<'_>) -> anyhow::Result<()> {
    let kind = set
        .media_kind()
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    writeln!(out, "  AdaptationSet {kind} ({})", set.mime_type())?;
    for protection in set.content_protections() {
        describe_protection(out, "    ", &protection)?;
    }

    let best = select_best(set).map(|r| r.id());
    for representation in set.representations() {
        let marker = if Some(representation.id()) == best { "*" } else { " " };
        let resolution = match (representation.width(), representation.height()) {
            (Some(width), Some(height)) => format!(" {width}x{height}"),
            _ => String::new(),
        };
        writeln!(
            out,
            "   {marker}Representation {} {} bps{resolution} {}",
            representation.id(),
            representation.bandwidth(),
            representation.codecs()
        )?;
        for protection in representation.content_protections() {
            describe_protection(out, "      ", &protection)?;
        }
    }
    Ok(())
}

fn describe_protection(
    out: &mut String,
    indent: &str,
    protection: &ContentProtection<'_>,
) -> anyhow::Result<()> {
    let record = ProtectionRecord::from(protection);
    writeln!(
        out,
        "{indent}ContentProtection {} kid={}",
        record.scheme_id_uri,
        record.default_kid.as_deref().unwrap_or("-")
    )?;
    match record.pssh_box() {
        Some(Ok(pssh)) => writeln!(
            out,
            "{indent}  pssh v{} system={} kids=[{}]",
            pssh.version,
            pssh.system_id_hex(),
            pssh.key_ids_hex().join(", ")
        )?,
        Some(Err(e)) => writeln!(out, "{indent}  pssh invalid: {e}")?,
        None => {}
    }
    Ok(())
}
