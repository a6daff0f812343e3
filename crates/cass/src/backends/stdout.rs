//! 🖨️ Line Sink: one record in, one line out, right now.
//!
//! The `fetch` command's sink. No buffering beyond the line itself, no batching, a flush
//! after every record so whoever is piping us into `jq` sees it immediately.
//! If the drain dies halfway, whatever already went out stays out and nothing else follows.

use std::io::Write;

use async_trait::async_trait;
use tracing::trace;

use crate::backends::{AnalyzerResponse, Sink};
use crate::error::{DrainError, DrainResult};
use crate::transforms::OutputRecord;

pub(crate) struct LineSink {
    out: Box<dyn Write + Send>,
    lines_written: u64,
}

impl std::fmt::Debug for LineSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 `dyn Write` doesn't do Debug. we tell you what we can.
        f.debug_struct("LineSink")
            .field("lines_written", &self.lines_written)
            .finish()
    }
}

impl LineSink {
    pub(crate) fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub(crate) fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            lines_written: 0,
        }
    }
}

#[async_trait]
impl Sink for LineSink {
    async fn receive(&mut self, record: OutputRecord) -> DrainResult<()> {
        let the_line = record.render()?;
        writeln!(self.out, "{}", the_line).map_err(DrainError::sink)?;
        self.out.flush().map_err(DrainError::sink)?;
        self.lines_written += 1;
        trace!("🖨️ line {} is out the door", self.lines_written);
        Ok(())
    }

    async fn close(&mut self) -> DrainResult<Option<AnalyzerResponse>> {
        self.out.flush().map_err(DrainError::sink)?;
        Ok(None)
    }
}
