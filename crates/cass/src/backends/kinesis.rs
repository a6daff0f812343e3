//! 🌊📡 Kinesis Source: draining the transit, one shard, one poll at a time.
//!
//! COLD OPEN. EXT. AWS REGION ap-northeast-1. 3:47 AM
//!
//! The transit had been filling all night. Sensors, gateways, one very chatty thermostat.
//! "Start from the oldest record you've still got," the operator said. The Kinesis source
//! asked for a TRIM_HORIZON iterator, got one, and started pulling.
//!
//! 🧠 Knowledge graph:
//! - `KinesisSourceConfig`: stream name, the one shard id, region, optional endpoint
//! - `open()`  → `GetShardIterator(TRIM_HORIZON)` → [`Cursor`]
//! - `fetch()` → `GetRecords(iterator)` → [`FetchResult`]
//! - ⚠️ Exactly one shard. `shardId-000000000000` unless told otherwise. A multi-shard stream
//!   gets read on that one shard only, and everything on the other shards is never seen.
//!   That's the deal. Consumers downstream rely on single-shard ordering.
//! - No retries, no backoff. The first error ends the run.

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_kinesis::operation::get_records::GetRecordsOutput;
use aws_sdk_kinesis::types::{Record, ShardIteratorType};
use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::backends::Source;
use crate::common::{Cursor, FetchResult, StreamRecord};
use crate::error::{DrainError, DrainResult};

/// 🔧 Where the transit lives and which single shard to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinesisSourceConfig {
    pub stream_name: String,
    pub shard_id: String,
    pub region: String,
    /// 🔌 localstack, kinesalite, or whatever else speaks the Kinesis API.
    pub endpoint_url: Option<String>,
}

#[derive(Debug)]
pub(crate) struct KinesisSource {
    client: aws_sdk_kinesis::Client,
    config: KinesisSourceConfig,
}

impl KinesisSource {
    /// 🚀 Build the SDK client. Credentials come from the usual chain:
    /// env vars → ~/.aws/config → IAM role → hope.
    pub(crate) async fn new(config: KinesisSourceConfig) -> anyhow::Result<Self> {
        let mut the_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_kinesis::config::Region::new(config.region.clone()));
        if let Some(ref the_endpoint) = config.endpoint_url {
            debug!("🔌 stream endpoint overridden to {}", the_endpoint);
            the_loader = the_loader.endpoint_url(the_endpoint);
        }
        let the_aws_config = the_loader.load().await;

        Ok(Self::with_client(
            aws_sdk_kinesis::Client::new(&the_aws_config),
            config,
        ))
    }

    /// 🔧 Wrap an already-configured SDK client.
    pub(crate) fn with_client(client: aws_sdk_kinesis::Client, config: KinesisSourceConfig) -> Self {
        debug!(
            "🌊 Kinesis client ready for stream '{}' shard '{}' in {}",
            config.stream_name, config.shard_id, config.region
        );
        Self { client, config }
    }
}

#[async_trait]
impl Source for KinesisSource {
    async fn open(&mut self) -> DrainResult<Cursor> {
        let the_response = self
            .client
            .get_shard_iterator()
            .stream_name(&self.config.stream_name)
            .shard_id(&self.config.shard_id)
            .shard_iterator_type(ShardIteratorType::TrimHorizon)
            .send()
            .await
            .map_err(|e| {
                DrainError::stream_unavailable(
                    &self.config.stream_name,
                    &self.config.shard_id,
                    e,
                )
            })?;

        let the_token = the_response.shard_iterator().ok_or_else(|| {
            DrainError::stream_unavailable(
                &self.config.stream_name,
                &self.config.shard_id,
                "GetShardIterator answered without a shard iterator",
            )
        })?;

        debug!("🧭 trim-horizon cursor acquired");
        Ok(Cursor::new(the_token))
    }

    async fn fetch(&mut self, cursor: &Cursor) -> DrainResult<FetchResult> {
        let the_output = self
            .client
            .get_records()
            .shard_iterator(cursor.token())
            .send()
            .await
            .map_err(DrainError::fetch)?;

        fetch_result_from(&the_output)
    }
}

/// 🔄 Translate a `GetRecords` answer into our own vocabulary.
///
/// - missing `MillisBehindLatest` counts as caught up
/// - missing `NextShardIterator` means the shard is closed, which also counts as caught up
fn fetch_result_from(output: &GetRecordsOutput) -> DrainResult<FetchResult> {
    let records = output
        .records()
        .iter()
        .map(stream_record_from)
        .collect::<DrainResult<Vec<_>>>()?;

    let mut lag_millis = match output.millis_behind_latest() {
        Some(lag) => lag.max(0) as u64,
        None => {
            warn!("⚠️ GetRecords came back without MillisBehindLatest, treating it as caught up");
            0
        }
    };

    let next_token = match output.next_shard_iterator() {
        Some(token) => token.to_string(),
        None => {
            debug!("🏁 shard is closed, no next iterator. nothing left to chase.");
            lag_millis = 0;
            String::new()
        }
    };

    trace!(
        "📬 {} records, {} ms behind the head",
        records.len(),
        lag_millis
    );
    Ok(FetchResult {
        records,
        lag_millis,
        next_token,
    })
}

fn stream_record_from(record: &Record) -> DrainResult<StreamRecord> {
    let the_stamp = record
        .approximate_arrival_timestamp()
        .context("record arrived without an approximate arrival timestamp")
        .map_err(DrainError::fetch)?;
    let arrival_time = DateTime::<Utc>::from_timestamp(the_stamp.secs(), the_stamp.subsec_nanos())
        .context("record arrival timestamp is out of range")
        .map_err(DrainError::fetch)?;

    Ok(StreamRecord::new(arrival_time, record.data().as_ref()))
}
