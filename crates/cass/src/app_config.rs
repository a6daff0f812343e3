//! 🔧 App Configuration: the sacred env-to-struct pipeline.
//!
//! 📡 "CASSIOPEIA_TRANSIT not set: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." -- every operator at 3am 🦆
//!
//! 🏗️ Powered by Figment. Environment variables prefixed `CASSIOPEIA_` are the base layer,
//! an optional TOML file goes on top. The result is one [`AppConfig`], built once in `main`
//! and passed by reference from there. Nothing downstream goes rummaging through
//! `std::env` on its own.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::kinesis::KinesisSourceConfig;
use crate::backends::analyzer::AnalyzerSinkConfig;

/// 🏷️ Everything in the environment that starts with this is ours.
pub const ENV_PREFIX: &str = "CASSIOPEIA_";

/// 📦 The AppConfig: one struct to rule them all.
///
/// Field names double as env var suffixes, so `transit` is `CASSIOPEIA_TRANSIT`,
/// `analyzer_entry` is `CASSIOPEIA_ANALYZER_ENTRY`, and so on.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🌊 The Kinesis stream to drain. Required by `fetch` and `pull`.
    #[serde(default)]
    pub transit: Option<String>,
    /// 📡 Where `pull` POSTs the bulk payload.
    #[serde(default)]
    pub analyzer_entry: Option<String>,
    /// 🖥️ Where the analyzer's UI lives. We only ever display it.
    #[serde(default)]
    pub analyzer_url: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// 🔌 Endpoint override for the stream API (localstack and friends).
    #[serde(default)]
    pub stream_endpoint: Option<String>,
    /// 🧭 The one shard we read. Singular. There is no list.
    #[serde(default = "default_shard_id")]
    pub shard_id: String,
    /// ⏱️ Pause between polls. Zero means busy-poll, which is the default.
    #[serde(default)]
    pub poll_interval_ms: u64,
    /// ⏳ HTTP timeout for the analyzer POST. None means "wait forever", which is the default.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// 🖨️ Print the whole bulk body to stdout before POSTing it.
    #[serde(default)]
    pub echo_bulk_payload: bool,
    /// 📊 Spinner and summary table on stderr.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_region() -> String {
    "ap-northeast-1".to_string()
}

fn default_shard_id() -> String {
    "shardId-000000000000".to_string()
}

fn default_show_progress() -> bool {
    true
}

impl AppConfig {
    /// 🌊 Stream settings for the Kinesis source. Fails if `CASSIOPEIA_TRANSIT` is missing.
    pub fn kinesis_source_config(&self) -> anyhow::Result<KinesisSourceConfig> {
        let stream_name = self.transit.clone().context(format!(
            "💀 No transit configured. Set {ENV_PREFIX}TRANSIT to the name of the stream to drain. \
             We can't read from a stream we can't name."
        ))?;
        Ok(KinesisSourceConfig {
            stream_name,
            shard_id: self.shard_id.clone(),
            region: self.region.clone(),
            endpoint_url: self.stream_endpoint.clone(),
        })
    }

    /// 📡 HTTP settings for the analyzer sink. Fails if `CASSIOPEIA_ANALYZER_ENTRY` is missing.
    pub fn analyzer_sink_config(&self) -> anyhow::Result<AnalyzerSinkConfig> {
        let url = self.analyzer_entry.clone().context(format!(
            "💀 No analyzer entry configured. Set {ENV_PREFIX}ANALYZER_ENTRY to the bulk endpoint URL. \
             The payload needs somewhere to land."
        ))?;
        Ok(AnalyzerSinkConfig {
            url,
            timeout: self.request_timeout_secs.map(Duration::from_secs),
            echo_payload: self.echo_bulk_payload,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// 🚀 Load the config from env vars, plus a TOML file if one was given.
///
/// 📐 DESIGN NOTE:
///   - `config_file_name` None  → env vars only.
///   - `config_file_name` Some  → env vars + TOML file, merged. TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed(ENV_PREFIX));
    extract_config(config, config_file_name)
}

fn extract_config(config: Figment, config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables ({ENV_PREFIX}*). \
             The file exists in our hearts, but apparently not in a shape serde likes.",
            path.display()
        ),
        None => format!(
            "💀 Failed to parse configuration from environment variables ({ENV_PREFIX}*). \
             No file was provided, so this one's all on the environment."
        ),
    };

    config.extract().context(context_msg)
}
