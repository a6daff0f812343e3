//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Source backends pour records out of the transit, Sink backends slurp them up.
//!
//! 🎭 This module is the casting agency. Need to read a Kinesis shard? Replay a scripted
//! stream in a test? Print lines to stdout? POST one big bulk payload to the analyzer?
//! We've got a backend for that. Trait → concrete impls → enum dispatcher, same as always.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use async_trait::async_trait;

use crate::common::{Cursor, FetchResult};
use crate::error::DrainResult;
use crate::transforms::OutputRecord;

pub(crate) mod analyzer;
#[cfg(test)]
pub(crate) mod in_mem;
pub(crate) mod kinesis;
pub(crate) mod stdout;

pub use analyzer::AnalyzerResponse;

// ===== Source Trait and Backend Enum =====

/// 🚰 A source of stream records. One shard. One cursor at a time.
///
/// # Contract 📜
/// - `open` hands back a cursor at the oldest retained record of the configured shard,
///   or `StreamUnavailable` when the stream/shard is missing or off-limits.
/// - `fetch` returns the next batch, the lag and the next token, or `Fetch` on any failure.
///   An empty batch with nonzero lag is normal. Keep polling.
/// - Exactly one shard is ever read. Other shards do not exist as far as a Source cares.
#[async_trait]
pub(crate) trait Source: std::fmt::Debug {
    /// 🧭 Cursor Manager: open a trim-horizon cursor into the shard.
    async fn open(&mut self) -> DrainResult<Cursor>;
    /// 📬 Record Fetcher: one poll.
    async fn fetch(&mut self, cursor: &Cursor) -> DrainResult<FetchResult>;
}

#[derive(Debug)]
pub(crate) enum SourceBackend {
    Kinesis(kinesis::KinesisSource),
    #[cfg(test)]
    InMemory(in_mem::InMemorySource),
}

#[async_trait]
impl Source for SourceBackend {
    async fn open(&mut self) -> DrainResult<Cursor> {
        match self {
            SourceBackend::Kinesis(k) => k.open().await,
            #[cfg(test)]
            SourceBackend::InMemory(i) => i.open().await,
        }
    }

    async fn fetch(&mut self, cursor: &Cursor) -> DrainResult<FetchResult> {
        match self {
            SourceBackend::Kinesis(k) => k.fetch(cursor).await,
            #[cfg(test)]
            SourceBackend::InMemory(i) => i.fetch(cursor).await,
        }
    }
}

// ===== Sink Trait and Backend Enum =====

/// 🕳️ A sink that consumes output records, in order.
///
/// # Contract 📜
/// - `receive` takes one record, in arrival order. Line sinks write it now.
///   Aggregating sinks stash it.
/// - `close` is called exactly once, after the drain is caught up. Aggregating sinks deliver
///   here and may return what the far end said about it.
/// - If the drain fails, `close` is never called. Nothing buffered goes anywhere.
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug {
    async fn receive(&mut self, record: OutputRecord) -> DrainResult<()>;
    async fn close(&mut self) -> DrainResult<Option<AnalyzerResponse>>;
}

#[derive(Debug)]
pub(crate) enum SinkBackend {
    Stdout(stdout::LineSink),
    Analyzer(analyzer::AnalyzerSink),
    #[cfg(test)]
    InMemory(in_mem::InMemorySink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn receive(&mut self, record: OutputRecord) -> DrainResult<()> {
        match self {
            SinkBackend::Stdout(sink) => sink.receive(record).await,
            SinkBackend::Analyzer(sink) => sink.receive(record).await,
            #[cfg(test)]
            SinkBackend::InMemory(sink) => sink.receive(record).await,
        }
    }

    async fn close(&mut self) -> DrainResult<Option<AnalyzerResponse>> {
        match self {
            SinkBackend::Stdout(sink) => sink.close().await,
            SinkBackend::Analyzer(sink) => sink.close().await,
            #[cfg(test)]
            SinkBackend::InMemory(sink) => sink.close().await,
        }
    }
}
