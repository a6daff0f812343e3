//! 🎬 *[camera pans across a Kinesis shard]*
//! 🎬 "In a world where records keep arriving..."
//! 🎬 "One loop dared to ask: are we caught up yet?"
//! 🎬 *[record scratch]* 🦆
//!
//! 🔄 The Drain Loop: the controller. Cursor → fetch → transform → sink, until the
//! stream says `lag_millis == 0`.
//!
//! ```text
//!   Start ──open ok──▶ Polling ──lag == 0──▶ Done ──▶ sink.close() ──▶ DrainSummary
//!     │                  │  ▲
//!     │                  └──┘ lag > 0: swap cursor, wait the cadence, poll again
//!     └──any error───────┴──────────────▶ Failed ──▶ Err(DrainError), sink never closed
//! ```
//!
//! 🧠 Knowledge graph:
//! - Single logical thread. Every await finishes before the next thing starts.
//! - Records go to the sink in batch order, then in-batch order. Nothing is reordered,
//!   dropped, or delivered twice within a run.
//! - Zero lag is the ONLY exit. There's no extra "one more poll just in case" after it;
//!   records that land during the final transform+send wait for the next run.
//! - Cadence defaults to zero: a busy-poll against the stream API.

use std::time::Duration;

use tracing::{debug, info, trace};

use crate::backends::{AnalyzerResponse, Sink, SinkBackend, Source, SourceBackend};
use crate::common::Cursor;
use crate::error::{DrainError, DrainResult};
use crate::progress::DrainProgress;
use crate::transforms::DocumentTransformer;

/// ⏱️ How long to wait between polls. Zero is a busy-poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollCadence {
    interval: Duration,
}

impl PollCadence {
    /// 🏎️ No waiting at all. The default, and what the stream API has learned to live with.
    pub fn busy() -> Self {
        Self::default()
    }

    pub fn every(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn wait(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// 🚦 Where the loop is.
#[derive(Debug)]
enum DrainState {
    Start,
    Polling(Cursor),
    Done,
    Failed(DrainError),
}

/// ✅ What a successful drain has to say for itself.
#[derive(Debug, Clone)]
pub struct DrainSummary {
    pub polls: u64,
    pub records: u64,
    /// 📬 Present for the analyzer sink, absent for line sinks.
    pub response: Option<AnalyzerResponse>,
}

/// 🔄 One source, one transformer, one sink, one shard.
#[derive(Debug)]
pub(crate) struct DrainLoop {
    source: SourceBackend,
    transformer: DocumentTransformer,
    sink: SinkBackend,
    cadence: PollCadence,
    progress: DrainProgress,
}

impl DrainLoop {
    pub(crate) fn new(
        source: SourceBackend,
        transformer: DocumentTransformer,
        sink: SinkBackend,
        cadence: PollCadence,
        progress: DrainProgress,
    ) -> Self {
        Self {
            source,
            transformer,
            sink,
            cadence,
            progress,
        }
    }

    /// 🚀 Run the state machine to completion.
    ///
    /// Consumes the loop: a drain is a one-shot thing, and the next run starts over at
    /// trim horizon anyway.
    pub(crate) async fn run(mut self) -> DrainResult<(DrainSummary, DrainProgress)> {
        let mut state = DrainState::Start;
        loop {
            state = match state {
                DrainState::Start => match self.source.open().await {
                    Ok(cursor) => DrainState::Polling(cursor),
                    Err(err) => DrainState::Failed(err),
                },
                DrainState::Polling(cursor) => match self.poll_once(&cursor).await {
                    Ok(Some(next_cursor)) => {
                        self.cadence.wait().await;
                        DrainState::Polling(next_cursor)
                    }
                    Ok(None) => DrainState::Done,
                    Err(err) => DrainState::Failed(err),
                },
                DrainState::Done => {
                    debug!("🏁 caught up, closing the sink");
                    let response = match self.sink.close().await {
                        Ok(response) => response,
                        Err(err) => {
                            self.progress.abandon();
                            return Err(err);
                        }
                    };
                    let summary = DrainSummary {
                        polls: self.progress.polls(),
                        records: self.progress.records(),
                        response,
                    };
                    info!(
                        "✅ drained {} records in {} polls",
                        summary.records, summary.polls
                    );
                    return Ok((summary, self.progress));
                }
                DrainState::Failed(err) => {
                    self.progress.abandon();
                    return Err(err);
                }
            };
        }
    }

    /// 📬 One trip through Polling. `Some(cursor)` to keep going, `None` when caught up.
    async fn poll_once(&mut self, cursor: &Cursor) -> DrainResult<Option<Cursor>> {
        let the_result = self.source.fetch(cursor).await?;
        let the_batch_size = the_result.records.len() as u64;
        debug!(
            "📦 poll {}: {} records, {} ms behind",
            self.progress.polls() + 1,
            the_batch_size,
            the_result.lag_millis
        );

        for record in &the_result.records {
            let the_output = self.transformer.transform(record)?;
            self.sink.receive(the_output).await?;
            trace!("🪣 record handed to the sink");
        }
        self.progress
            .record_poll(the_batch_size, the_result.lag_millis);

        if the_result.is_caught_up() {
            Ok(None)
        } else {
            Ok(Some(Cursor::new(the_result.next_token)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::{InMemorySink, InMemorySource, ScriptedPoll};
    use crate::backends::stdout::LineSink;
    use crate::backends::stdout::tests::SharedBuffer;
    use crate::common::StreamRecord;
    use crate::transforms::OutputRecord;
    use chrono::{TimeZone, Utc};

    const SHARD_ZERO: &str = "shardId-000000000000";

    fn numbered(n: u32) -> StreamRecord {
        StreamRecord::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap() + chrono::Duration::seconds(n as i64),
            format!("record-{n}"),
        )
    }

    fn payloads_of(received: &[OutputRecord]) -> Vec<String> {
        received
            .iter()
            .map(|record| match record {
                OutputRecord::Plain(plain) => plain.data.clone(),
                OutputRecord::Bulk(pair) => pair.document_line.clone(),
            })
            .collect()
    }

    fn drain_into_memory(source: InMemorySource, sink: &InMemorySink) -> DrainLoop {
        DrainLoop::new(
            SourceBackend::InMemory(source),
            DocumentTransformer::Plain,
            SinkBackend::InMemory(sink.clone()),
            PollCadence::busy(),
            DrainProgress::new("test", false),
        )
    }

    #[tokio::test]
    async fn the_one_where_every_batch_arrives_once_and_in_order() -> DrainResult<()> {
        let the_source = InMemorySource::new(
            SHARD_ZERO,
            vec![
                ScriptedPoll::batch(vec![numbered(1), numbered(2)], 3000),
                ScriptedPoll::batch(vec![], 2000),
                ScriptedPoll::batch(vec![numbered(3)], 1000),
                ScriptedPoll::batch(vec![numbered(4), numbered(5)], 0),
                // 👻 never fetched: the loop stops at zero lag
                ScriptedPoll::batch(vec![numbered(99)], 0),
            ],
        );
        let the_sink = InMemorySink::new();

        let (the_summary, _) = drain_into_memory(the_source, &the_sink).run().await?;

        assert_eq!(the_summary.polls, 4);
        assert_eq!(the_summary.records, 5);
        assert!(the_summary.response.is_none());
        assert_eq!(
            payloads_of(&the_sink.received.lock().await),
            vec!["record-1", "record-2", "record-3", "record-4", "record-5"]
        );
        assert!(*the_sink.closed.lock().await);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_empty_batches_behind_the_head_keep_the_loop_going() -> DrainResult<()> {
        let mut the_script: Vec<ScriptedPoll> =
            (0..25).map(|_| ScriptedPoll::batch(vec![], 500)).collect();
        the_script.push(ScriptedPoll::batch(vec![numbered(1)], 0));
        let the_sink = InMemorySink::new();

        let (the_summary, _) = drain_into_memory(InMemorySource::new(SHARD_ZERO, the_script), &the_sink)
            .run()
            .await?;

        assert_eq!(the_summary.polls, 26);
        assert_eq!(the_summary.records, 1);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_first_poll_is_already_caught_up() -> DrainResult<()> {
        let the_sink = InMemorySink::new();
        let (the_summary, _) = drain_into_memory(
            InMemorySource::new(SHARD_ZERO, vec![ScriptedPoll::batch(vec![], 0)]),
            &the_sink,
        )
        .run()
        .await?;

        assert_eq!(the_summary.polls, 1);
        assert_eq!(the_summary.records, 0);
        assert!(*the_sink.closed.lock().await);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_missing_stream_fails_before_anything_happens() {
        let the_sink = InMemorySink::new();
        let the_outcome = drain_into_memory(InMemorySource::without_shards(SHARD_ZERO), &the_sink)
            .run()
            .await;

        assert!(matches!(
            the_outcome,
            Err(DrainError::StreamUnavailable { .. })
        ));
        assert!(the_sink.received.lock().await.is_empty());
        assert!(!*the_sink.closed.lock().await);
    }

    #[tokio::test]
    async fn the_one_where_the_second_poll_fails_and_nothing_more_is_written() {
        let the_source = InMemorySource::new(
            SHARD_ZERO,
            vec![
                ScriptedPoll::batch(vec![numbered(1), numbered(2)], 800),
                ScriptedPoll::Failure("ProvisionedThroughputExceededException".to_string()),
                ScriptedPoll::batch(vec![numbered(3)], 0),
            ],
        );
        let the_buffer = SharedBuffer::default();
        let the_drain = DrainLoop::new(
            SourceBackend::InMemory(the_source),
            DocumentTransformer::Plain,
            SinkBackend::Stdout(LineSink::new(Box::new(the_buffer.clone()))),
            PollCadence::busy(),
            DrainProgress::new("test", false),
        );

        match the_drain.run().await {
            Err(DrainError::Fetch { source }) => {
                assert!(source.to_string().contains("ProvisionedThroughput"))
            }
            honestly_who_knows => panic!("💀 expected a fetch error, got {:?}", honestly_who_knows),
        }

        // ✅ the first batch made it out, the failure stopped everything after it
        let the_lines: Vec<String> = the_buffer.contents().lines().map(String::from).collect();
        assert_eq!(the_lines.len(), 2);
        assert!(the_lines[0].contains("record-1"));
        assert!(the_lines[1].contains("record-2"));
    }

    #[tokio::test]
    async fn the_one_where_the_second_shard_is_never_observed() -> DrainResult<()> {
        let the_second_shard_script: Vec<ScriptedPoll> = (100..110)
            .map(|n| ScriptedPoll::batch(vec![numbered(n)], 0))
            .collect();
        let the_source = InMemorySource::new(
            SHARD_ZERO,
            vec![
                ScriptedPoll::batch(vec![numbered(1)], 10),
                ScriptedPoll::batch(vec![numbered(2)], 0),
            ],
        )
        .with_shard("shardId-000000000001", the_second_shard_script);
        let the_sink = InMemorySink::new();

        drain_into_memory(the_source, &the_sink).run().await?;

        // 🧩 shard 1 had ten records ready to go. none of them show up.
        let the_payloads = payloads_of(&the_sink.received.lock().await);
        assert_eq!(the_payloads, vec!["record-1", "record-2"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_cadence_spaces_out_the_polls() -> DrainResult<()> {
        let the_source = InMemorySource::new(
            SHARD_ZERO,
            vec![
                ScriptedPoll::batch(vec![numbered(1)], 10),
                ScriptedPoll::batch(vec![numbered(2)], 10),
                ScriptedPoll::batch(vec![], 0),
            ],
        );
        let the_sink = InMemorySink::new();
        let the_start = tokio::time::Instant::now();

        let (the_summary, _) = DrainLoop::new(
            SourceBackend::InMemory(the_source),
            DocumentTransformer::LogstashBulk,
            SinkBackend::InMemory(the_sink.clone()),
            PollCadence::every(Duration::from_secs(1)),
            DrainProgress::new("test", false),
        )
        .run()
        .await?;

        assert_eq!(the_summary.polls, 3);
        // ⏱️ two waits between three polls, none after the last
        let the_elapsed = the_start.elapsed();
        assert!(the_elapsed >= Duration::from_secs(2));
        assert!(the_elapsed < Duration::from_secs(3));
        Ok(())
    }
}
