//! 📡 Analyzer Sink: hoard everything, then one big POST.
//!
//! 🎬 *[the drain is caught up. the buffer is enormous. the analyzer container is... probably up?]*
//!
//! The `pull` command's sink. Every bulk pair from every batch goes into one in-memory
//! buffer for the whole drain. When the drain reports caught-up, `close()` fires exactly one
//! `POST` with `Content-Type: application/json` and the whole buffer as the body.
//!
//! 🧠 Knowledge graph:
//! - Only transport failures are errors. A 400, a 500, a 418 from a teapot: all "delivered".
//!   Status, headers and body come back as an [`AnalyzerResponse`] for the operator to read.
//! - If the drain fails first, `close()` is never called and nothing is sent. No partial flush.
//! - No timeout unless configured. A hung analyzer hangs the run. Ctrl-C loses the buffer.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::backends::Sink;
use crate::error::{DrainError, DrainResult};
use crate::transforms::OutputRecord;

/// 🔧 Where to POST and how patient to be about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerSinkConfig {
    pub url: String,
    pub timeout: Option<Duration>,
    /// 🖨️ Print the body to stdout before sending. Loud, but honest.
    pub echo_payload: bool,
}

/// 📬 What the analyzer said back. Surfaced regardless of status code.
#[derive(Debug, Clone)]
pub struct AnalyzerResponse {
    pub status: reqwest::StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl fmt::Display for AnalyzerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "response Status: {}", self.status)?;
        let the_headers = self
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "response Headers: {{{}}}", the_headers)?;
        write!(f, "response Body: {}", self.body)
    }
}

#[derive(Debug)]
pub(crate) struct AnalyzerSink {
    client: reqwest::Client,
    config: AnalyzerSinkConfig,
    payload: String,
    records_buffered: u64,
    delivered: bool,
}

impl AnalyzerSink {
    pub(crate) fn new(config: AnalyzerSinkConfig) -> anyhow::Result<Self> {
        let mut the_builder = reqwest::Client::builder();
        if let Some(the_timeout) = config.timeout {
            the_builder = the_builder.timeout(the_timeout);
        }
        let client = the_builder
            .build()
            .context("💀 The HTTP client refused to be born. The TLS stack wept. Probably a cursed system cert store.")?;

        Ok(Self {
            client,
            config,
            payload: String::new(),
            records_buffered: 0,
            delivered: false,
        })
    }

    async fn submit(&self, the_payload: String) -> DrainResult<AnalyzerResponse> {
        debug!(
            "📡 POSTing {} bytes ({} records) to {}",
            the_payload.len(),
            self.records_buffered,
            self.config.url
        );

        let the_response = self
            .client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(the_payload)
            .send()
            .await
            .map_err(DrainError::sink)?;

        let status = the_response.status();
        let headers = the_response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("<non-ascii>").to_string(),
                )
            })
            .collect();
        // -- 🤷 an unreadable body is still a delivered payload
        let body = the_response.text().await.unwrap_or_default();

        info!("📬 analyzer answered {}", status);
        Ok(AnalyzerResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Sink for AnalyzerSink {
    async fn receive(&mut self, record: OutputRecord) -> DrainResult<()> {
        let the_lines = record.render()?;
        self.payload.push_str(&the_lines);
        self.payload.push('\n');
        self.records_buffered += 1;
        Ok(())
    }

    async fn close(&mut self) -> DrainResult<Option<AnalyzerResponse>> {
        if self.delivered {
            return Ok(None);
        }
        // -- 📦 moved, not copied: the buffer is the biggest thing we own
        let the_payload = std::mem::take(&mut self.payload);
        if self.config.echo_payload {
            println!("{}", the_payload);
        }
        let the_response = self.submit(the_payload).await?;
        self.delivered = true;
        Ok(Some(the_response))
    }
}
