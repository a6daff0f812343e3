//! # Previously, on Cassiopeia...
//!
//! 🎬 The transit was in another region. The credentials were in another account.
//! The test suite was on a laptop in a coffee shop with no Wi-Fi. Someone had to
//! pretend to be a stream. That someone was this module.
//!
//! `in_mem` provides a scripted [`Source`] and a collecting [`Sink`] for tests.
//! The [`InMemorySource`] plays back a script of polls per shard, including the
//! occasional failure, and checks that the drain hands back the token it was given.
//! The [`InMemorySink`] keeps everything it receives behind an `Arc<Mutex<...>>` so
//! the test can peek after the drain has taken ownership.
//!
//! ⚠️ NOT for production. No network calls. No heartbeat. Just vibes and heap memory. 🦆

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::{AnalyzerResponse, Sink, Source};
use crate::common::{Cursor, FetchResult, StreamRecord};
use crate::error::{DrainError, DrainResult};
use crate::transforms::OutputRecord;

/// 🎬 One scripted poll.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedPoll {
    /// 📦 A batch plus the lag reported alongside it.
    Batch {
        records: Vec<StreamRecord>,
        lag_millis: u64,
    },
    /// 💀 The poll fails with this message.
    Failure(String),
}

impl ScriptedPoll {
    pub(crate) fn batch(records: Vec<StreamRecord>, lag_millis: u64) -> Self {
        Self::Batch {
            records,
            lag_millis,
        }
    }
}

/// 📦 A make-believe stream with as many shards as the test wants and one shard it reads.
///
/// Tokens look like `<shard>:<poll number>`. A fetch with any other token fails, which is
/// how the tests prove the drain replaces its cursor after every poll. When a shard's
/// script runs out, it reports an empty, caught-up batch forever.
#[derive(Debug)]
pub(crate) struct InMemorySource {
    shard_id: String,
    shards: HashMap<String, VecDeque<ScriptedPoll>>,
    polls_served: usize,
}

impl InMemorySource {
    /// 🚀 Single-shard stream, script for `shard_id`.
    pub(crate) fn new(shard_id: impl Into<String>, script: Vec<ScriptedPoll>) -> Self {
        let shard_id = shard_id.into();
        let mut shards = HashMap::new();
        shards.insert(shard_id.clone(), script.into());
        Self {
            shard_id,
            shards,
            polls_served: 0,
        }
    }

    /// 🧩 Add another shard. The source will still only ever read `shard_id`.
    pub(crate) fn with_shard(mut self, shard_id: impl Into<String>, script: Vec<ScriptedPoll>) -> Self {
        self.shards.insert(shard_id.into(), script.into());
        self
    }

    /// 🚫 A stream where the configured shard does not exist.
    pub(crate) fn without_shards(shard_id: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            shards: HashMap::new(),
            polls_served: 0,
        }
    }

    fn token_for(&self, poll: usize) -> String {
        format!("{}:{}", self.shard_id, poll)
    }
}

#[async_trait]
impl Source for InMemorySource {
    async fn open(&mut self) -> DrainResult<Cursor> {
        if !self.shards.contains_key(&self.shard_id) {
            return Err(DrainError::stream_unavailable(
                "in-memory",
                &self.shard_id,
                "no such shard",
            ));
        }
        Ok(Cursor::new(self.token_for(0)))
    }

    async fn fetch(&mut self, cursor: &Cursor) -> DrainResult<FetchResult> {
        let the_expected_token = self.token_for(self.polls_served);
        if cursor.token() != the_expected_token {
            return Err(DrainError::fetch(format!(
                "stale cursor '{}', expected '{}'",
                cursor.token(),
                the_expected_token
            )));
        }

        let the_next_poll = self
            .shards
            .get_mut(&self.shard_id)
            .and_then(|script| script.pop_front());
        self.polls_served += 1;
        let next_token = self.token_for(self.polls_served);

        match the_next_poll {
            Some(ScriptedPoll::Batch {
                records,
                lag_millis,
            }) => Ok(FetchResult {
                records,
                lag_millis,
                next_token,
            }),
            Some(ScriptedPoll::Failure(the_message)) => Err(DrainError::fetch(the_message)),
            None => Ok(FetchResult {
                records: vec![],
                lag_millis: 0,
                next_token,
            }),
        }
    }
}

/// 📦 A sink that never forgets.
///
/// Clone-able so tests can keep a handle after handing the sink to the drain.
/// `closed` flips when the drain finishes cleanly, and stays false when it doesn't.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySink {
    pub(crate) received: Arc<tokio::sync::Mutex<Vec<OutputRecord>>>,
    pub(crate) closed: Arc<tokio::sync::Mutex<bool>>,
}

impl InMemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn receive(&mut self, record: OutputRecord) -> DrainResult<()> {
        self.received.lock().await.push(record);
        Ok(())
    }

    async fn close(&mut self) -> DrainResult<Option<AnalyzerResponse>> {
        *self.closed.lock().await = true;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn the_one_where_a_missing_shard_is_stream_unavailable() {
        let mut the_void = InMemorySource::without_shards("shardId-000000000000");
        match the_void.open().await {
            Err(DrainError::StreamUnavailable { shard, .. }) => {
                assert_eq!(shard, "shardId-000000000000")
            }
            honestly_who_knows => panic!("💀 expected StreamUnavailable, got {:?}", honestly_who_knows),
        }
    }

    #[tokio::test]
    async fn the_one_where_a_stale_cursor_gets_rejected() -> DrainResult<()> {
        let mut the_source = InMemorySource::new(
            "s0",
            vec![
                ScriptedPoll::batch(vec![StreamRecord::new(Utc::now(), "a")], 10),
                ScriptedPoll::batch(vec![], 0),
            ],
        );
        let the_first_cursor = the_source.open().await?;
        the_source.fetch(&the_first_cursor).await?;

        // 🔁 re-using the old cursor instead of next_token. rude.
        assert!(matches!(
            the_source.fetch(&the_first_cursor).await,
            Err(DrainError::Fetch { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_script_runs_out_and_the_stream_says_caught_up() -> DrainResult<()> {
        let mut the_source = InMemorySource::new("s0", vec![]);
        let the_cursor = the_source.open().await?;
        let the_result = the_source.fetch(&the_cursor).await?;
        assert!(the_result.records.is_empty());
        assert!(the_result.is_caught_up());
        assert_eq!(the_result.next_token, "s0:1");
        Ok(())
    }
}
