//! 📄 Plain transform: timestamp and data, one line, no surprises.
//!
//! The `fetch` command's encoding. The payload goes out verbatim as a JSON string,
//! escaped by serde and otherwise unbothered. If it was JSON, it is now JSON inside
//! a string. Matryoshka, but for logs. 🦆

use super::{OutputRecord, PlainRecord, RecordTransform};
use crate::common::StreamRecord;
use crate::error::DrainResult;

pub(crate) struct PlainJson;

impl RecordTransform for PlainJson {
    fn transform_record(record: &StreamRecord) -> DrainResult<OutputRecord> {
        Ok(OutputRecord::Plain(PlainRecord {
            timestamp: record.arrival_rfc3339(),
            data: record.payload_text(),
        }))
    }
}
