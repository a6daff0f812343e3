//! 📦 Common data structures: the humble structs that ferry records out of the transit.
//!
//! 🎬 COLD OPEN. INT. KINESIS SHARD. THE OLDEST RETAINED RECORD
//!
//! It had been sitting there for twenty-three hours. Trim horizon was coming.
//! Then a cursor arrived, opaque and unannounced, and said "you're coming with me."
//!
//! ✅ A [`StreamRecord`] is what the stream gives us. A [`Cursor`] is where we are.
//! A [`FetchResult`] is one poll's worth of news. None of them are persisted anywhere,
//! so every run starts over from the oldest retained record and re-delivers everything.
//! No checkpoints. No memory. Like a goldfish, but with IAM roles. 🦆

use chrono::{DateTime, SecondsFormat, Utc};

/// 🌊 One raw record, exactly as the shard handed it over. Read-only to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// ⏰ Approximate arrival time, as stamped by the stream. UTC.
    pub arrival_time: DateTime<Utc>,
    /// 📦 The payload bytes. Maybe JSON. Maybe not. We don't validate, we deliver.
    pub payload: Vec<u8>,
}

impl StreamRecord {
    pub fn new(arrival_time: DateTime<Utc>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            arrival_time,
            payload: payload.into(),
        }
    }

    /// ⏰ Arrival time as RFC3339, second precision, `Z` suffix. `2024-01-02T03:04:05Z`.
    pub fn arrival_rfc3339(&self) -> String {
        self.arrival_time
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// 📝 Payload as text. Invalid UTF-8 becomes U+FFFD instead of becoming our problem.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// 🧭 An opaque position token into one shard.
///
/// Created once per run at trim horizon, then replaced wholesale after every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    token: String,
}

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// 📬 One poll's worth of news from the shard.
///
/// `lag_millis == 0` means "caught up, at the moment of this call". It is the only
/// termination signal. There is no end-of-stream marker: streams don't end, we just
/// stop looking.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResult {
    /// 📦 Records in arrival order. May be empty while lag is still nonzero.
    pub records: Vec<StreamRecord>,
    /// ⏱️ How far behind the head of the stream we are, in milliseconds.
    pub lag_millis: u64,
    /// 🧭 The token for the next poll.
    pub next_token: String,
}

impl FetchResult {
    pub fn is_caught_up(&self) -> bool {
        self.lag_millis == 0
    }
}
