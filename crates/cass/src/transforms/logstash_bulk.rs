//! 📡 Logstash Bulk Transform: formatting records for the analyzer's `_bulk` appetite 🚀
//!
//! 🎬 COLD OPEN. INT. ANALYZER CONTAINER. BULK ENDPOINT. HIGH NOON
//!
//! The bulk API has rules. Two lines per document. Action first, document second.
//! One index per calendar day, named like it's 1999: `logstash-YY-MM-DD`.
//!
//! ## Knowledge Graph 🧠
//! - Action line: `{"index":{"_index":"logstash-YY-MM-DD","_type":"data"}}`
//! - Index date: the record's arrival date, UTC, two-digit year
//! - Document line: [`annotate_if_object_shaped`] on the payload text
//!
//! ⚠️ About that document line. It is NOT a JSON merge. It is string surgery with
//! a butter knife: if the payload starts with `{`, every leading and trailing brace
//! character gets trimmed off, `, "@timestamp": "…"` is appended, and the whole thing
//! is rewrapped in one pair of braces. `{}` comes out as `{, "@timestamp": "…"}`.
//! `{"a":{"b":1}}` loses its inner closing brace. Arrays and scalars pass through
//! untouched. Downstream dashboards have been built on top of exactly this output,
//! so the knife stays. 🦆

use serde::Serialize;

use super::{BulkPair, OutputRecord, RecordTransform};
use crate::common::StreamRecord;
use crate::error::{DrainError, DrainResult};

/// 🏷️ Every document is filed under this `_type`. The analyzer predates type removal.
const DOCUMENT_TYPE: &str = "data";

/// 📅 Daily index prefix.
const INDEX_PREFIX: &str = "logstash-";

#[derive(Debug, Serialize)]
struct BulkAction<'a> {
    index: BulkActionIndex<'a>,
}

#[derive(Debug, Serialize)]
struct BulkActionIndex<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
}

pub(crate) struct LogstashBulk;

impl LogstashBulk {
    /// 📅 `logstash-24-01-02` for a record that arrived on 2024-01-02 (UTC).
    pub(crate) fn index_name(record: &StreamRecord) -> String {
        format!(
            "{}{}",
            INDEX_PREFIX,
            record.arrival_time.format("%y-%m-%d")
        )
    }
}

impl RecordTransform for LogstashBulk {
    fn transform_record(record: &StreamRecord) -> DrainResult<OutputRecord> {
        let the_index = Self::index_name(record);
        let the_action = BulkAction {
            index: BulkActionIndex {
                index: &the_index,
                doc_type: DOCUMENT_TYPE,
            },
        };
        let action_line = serde_json::to_string(&the_action).map_err(DrainError::transform)?;

        let document_line =
            annotate_if_object_shaped(&record.payload_text(), &record.arrival_rfc3339());

        Ok(OutputRecord::Bulk(BulkPair {
            action_line,
            document_line,
        }))
    }
}

/// ✂️ Stitch an `@timestamp` into anything that *looks* like a JSON object.
///
/// Object-shaped means "first character is `{`". Nothing is parsed or validated:
/// all leading and trailing `{`/`}` characters are trimmed, the timestamp field is
/// appended after `, `, and one pair of braces goes back on. Anything else is returned
/// unchanged.
///
/// Lossy on purpose. Nested objects at the edges lose braces, `{}` gains a leading comma.
pub fn annotate_if_object_shaped(payload: &str, timestamp_rfc3339: &str) -> String {
    if !payload.starts_with('{') {
        return payload.to_string();
    }

    let the_guts = payload.trim_matches(|c: char| c == '{' || c == '}');
    format!("{{{}, \"@timestamp\": \"{}\"}}", the_guts, timestamp_rfc3339)
}
