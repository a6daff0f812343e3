//! 🌌 cass: drain a Kinesis shard from trim horizon to caught-up, then hand it off.
//!
//! 🎬 *[two commands walk into a bar. one prints lines. one POSTs a bulk payload.]*
//! *[the bartender notices they're the same loop in different hats.]*
//!
//! `fetch` drains to stdout as plain JSON lines. `pull` drains into one bulk body for the
//! analyzer and POSTs it once. Both are a [`drain::DrainLoop`] with a different transformer
//! and a different sink. 🦆

pub mod app_config;
pub(crate) mod backends;
pub mod common;
pub mod drain;
pub mod error;
mod progress;
pub mod transforms;

use anyhow::Context;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tracing::info;

use crate::app_config::{AppConfig, ENV_PREFIX};
use crate::backends::analyzer::AnalyzerSink;
use crate::backends::kinesis::KinesisSource;
use crate::backends::stdout::LineSink;
use crate::backends::{SinkBackend, SourceBackend};
use crate::drain::{DrainLoop, PollCadence};
use crate::progress::DrainProgress;
use crate::transforms::DocumentTransformer;

pub use crate::backends::AnalyzerResponse;
pub use crate::backends::analyzer::AnalyzerSinkConfig;
pub use crate::backends::kinesis::KinesisSourceConfig;
pub use crate::drain::DrainSummary;
pub use crate::error::{DrainError, DrainResult};

/// 🎭 Which way the records go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// 🖨️ plain JSON, one line per record, stdout
    Fetch,
    /// 📡 bulk pairs, one POST to the analyzer entry
    Pull,
}

impl DrainMode {
    pub fn transformer(&self) -> DocumentTransformer {
        match self {
            DrainMode::Fetch => DocumentTransformer::Plain,
            DrainMode::Pull => DocumentTransformer::LogstashBulk,
        }
    }
}

/// 🚀 Drain the configured shard once.
///
/// Sink config is checked before the stream is touched, so a `pull` without an analyzer
/// entry fails without a single network call.
pub async fn run(app_config: &AppConfig, mode: DrainMode) -> anyhow::Result<DrainSummary> {
    let the_source_config = app_config.kinesis_source_config()?;
    let the_sink = match mode {
        DrainMode::Fetch => SinkBackend::Stdout(LineSink::stdout()),
        DrainMode::Pull => SinkBackend::Analyzer(AnalyzerSink::new(
            app_config.analyzer_sink_config()?,
        )?),
    };

    let the_label = format!(
        "{}/{}",
        the_source_config.stream_name, the_source_config.shard_id
    );
    info!("🚀 {:?} draining {}", mode, the_label);

    let the_source = SourceBackend::Kinesis(
        KinesisSource::new(the_source_config)
            .await
            .context("💀 Couldn't set up the Kinesis client. Check the region and the endpoint override.")?,
    );

    drain(the_source, the_sink, mode, app_config, the_label).await
}

async fn drain(
    source: SourceBackend,
    sink: SinkBackend,
    mode: DrainMode,
    app_config: &AppConfig,
    label: String,
) -> anyhow::Result<DrainSummary> {
    let the_progress = DrainProgress::new(label.clone(), app_config.show_progress);
    let the_loop = DrainLoop::new(
        source,
        mode.transformer(),
        sink,
        PollCadence::every(app_config.poll_interval()),
        the_progress,
    );

    let (the_summary, the_progress) = the_loop
        .run()
        .await
        .with_context(|| format!("💀 The drain of '{}' did not make it to caught-up.", label))?;

    let the_table = the_progress.finish();
    if app_config.show_progress {
        eprintln!("{the_table}");
    }
    Ok(the_summary)
}

/// 📋 The effective configuration, as the `env` command shows it. No network involved.
pub fn env_table(app_config: &AppConfig) -> Table {
    fn or_unset(value: &Option<String>) -> String {
        value.clone().unwrap_or_else(|| "(unset)".to_string())
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["key", "env var", "value"]);

    let the_rows: Vec<(&str, String)> = vec![
        ("transit", or_unset(&app_config.transit)),
        ("analyzer_entry", or_unset(&app_config.analyzer_entry)),
        ("analyzer_url", or_unset(&app_config.analyzer_url)),
        ("region", app_config.region.clone()),
        ("stream_endpoint", or_unset(&app_config.stream_endpoint)),
        ("shard_id", app_config.shard_id.clone()),
        ("poll_interval_ms", app_config.poll_interval_ms.to_string()),
        (
            "request_timeout_secs",
            app_config
                .request_timeout_secs
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| "(none)".to_string()),
        ),
        ("echo_bulk_payload", app_config.echo_bulk_payload.to_string()),
        ("show_progress", app_config.show_progress.to_string()),
    ];
    for (key, value) in the_rows {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(format!("{}{}", ENV_PREFIX, key.to_uppercase())),
            Cell::new(value),
        ]);
    }
    table
}
