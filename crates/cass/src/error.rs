//! 💀 The error taxonomy: every way a drain can go sideways, given a proper name.
//!
//! 🎬 *[a cursor is requested. the stream does not answer.]*
//! *[somewhere, an IAM policy smirks.]*
//!
//! Four kinds, all fatal. No retries, no partial salvage, no distinction between
//! "the network blinked" and "your credentials are from 2019". The run stops, the
//! message prints, the process exits 1. 🦆
//!
//! The rest of the crate speaks `anyhow` for plumbing (config, CLI). These typed errors
//! ride inside `anyhow::Error` up to `main` and can be downcast by tests that care
//! which door the failure came through.

/// 📦 Boxed error source. The SDK's errors, reqwest's errors, or a plain `&str` sob story.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 🎯 Result alias for the drain pipeline.
pub type DrainResult<T> = std::result::Result<T, DrainError>;

#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    /// 🔒 Opening the cursor failed: stream missing, shard missing, or not authorized.
    #[error("💀 stream '{stream}' (shard '{shard}') is unavailable")]
    StreamUnavailable {
        stream: String,
        shard: String,
        #[source]
        source: BoxError,
    },

    /// 📡 Any failure retrieving a batch. Transport, auth, throttling. All the same to us.
    #[error("💀 failed to fetch records from the transit")]
    Fetch {
        #[source]
        source: BoxError,
    },

    /// 🔄 Malformed batch data. Unreachable with the current transforms, kept for the taxonomy.
    #[error("💀 failed to transform a record")]
    Transform {
        #[source]
        source: BoxError,
    },

    /// 🕳️ The sink could not deliver. For HTTP, transport failures only: status codes are not errors.
    #[error("💀 failed to deliver records to the sink")]
    Sink {
        #[source]
        source: BoxError,
    },
}

impl DrainError {
    pub(crate) fn stream_unavailable(
        stream: impl Into<String>,
        shard: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::StreamUnavailable {
            stream: stream.into(),
            shard: shard.into(),
            source: source.into(),
        }
    }

    pub(crate) fn fetch(source: impl Into<BoxError>) -> Self {
        Self::Fetch {
            source: source.into(),
        }
    }

    pub(crate) fn transform(source: impl Into<BoxError>) -> Self {
        Self::Transform {
            source: source.into(),
        }
    }

    pub(crate) fn sink(source: impl Into<BoxError>) -> Self {
        Self::Sink {
            source: source.into(),
        }
    }
}
