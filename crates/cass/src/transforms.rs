//! 🔄 Transforms: turning raw transit records into something a human or an indexer wants.
//!
//! 🎬 COLD OPEN. INT. SHARD. 2:47 AM
//!
//! The record had bytes. Just bytes. No opinions, no schema, no `@timestamp`.
//! Two translators waited at the exit. One said "I'll wrap you in a tidy JSON line."
//! The other said "I'll hand you to Logstash with a daily index and a timestamp,
//! and I will trim your braces with a character-level knife." The record chose neither.
//! The operator chose for it. That's how config works. 🦆
//!
//! ## Architecture 📐
//!
//! ```text
//!   StreamRecord ──▶ DocumentTransformer ──┬──▶ PlainJson     ──▶ OutputRecord::Plain
//!                                          └──▶ LogstashBulk  ──▶ OutputRecord::Bulk
//! ```
//!
//! Every transform is a zero-sized marker type with a static method, dispatched by the
//! [`DocumentTransformer`] enum. No vtables. Order is never touched: one record in,
//! one output record out, same position.

use serde::Serialize;

use crate::common::StreamRecord;
use crate::error::{DrainError, DrainResult};

pub(crate) mod logstash_bulk;
pub(crate) mod plain;

pub use logstash_bulk::annotate_if_object_shaped;
pub(crate) use logstash_bulk::LogstashBulk;
pub(crate) use plain::PlainJson;

/// 🔄 RecordTransform: one raw record in, one output record out.
///
/// # Contract 📜
/// - Input: `&StreamRecord`, borrowed, untouched
/// - Output: exactly one [`OutputRecord`]
/// - MUST NOT reorder, drop, or duplicate. The drain loop trusts you.
pub(crate) trait RecordTransform {
    fn transform_record(record: &StreamRecord) -> DrainResult<OutputRecord>;
}

/// 📄 The plain encoding: `{"timestamp":"…","data":"…"}`. Field order matters. serde keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainRecord {
    pub timestamp: String,
    pub data: String,
}

/// 📡 The bulk encoding: an action line and a document line. Socks. You need both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPair {
    /// `{"index":{"_index":"logstash-YY-MM-DD","_type":"data"}}`
    pub action_line: String,
    /// The payload, possibly with an `@timestamp` stitched in.
    pub document_line: String,
}

/// 📦 What comes out of a transform and goes into a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRecord {
    Plain(PlainRecord),
    Bulk(BulkPair),
}

impl OutputRecord {
    /// 🖨️ Render to wire text, without a trailing newline.
    ///
    /// Plain renders to one JSON line. Bulk renders to two lines joined by `\n`.
    pub fn render(&self) -> DrainResult<String> {
        match self {
            OutputRecord::Plain(plain) => {
                serde_json::to_string(plain).map_err(DrainError::transform)
            }
            OutputRecord::Bulk(pair) => {
                Ok(format!("{}\n{}", pair.action_line, pair.document_line))
            }
        }
    }
}

/// 🎭 The many faces of a transformer, picked by output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTransformer {
    /// 📄 stdout mode
    Plain,
    /// 📡 analyzer mode
    LogstashBulk,
}

impl DocumentTransformer {
    #[inline]
    pub fn transform(&self, record: &StreamRecord) -> DrainResult<OutputRecord> {
        match self {
            DocumentTransformer::Plain => PlainJson::transform_record(record),
            DocumentTransformer::LogstashBulk => LogstashBulk::transform_record(record),
        }
    }
}
