//! 📊 progress.rs: "Are we caught up yet?", every drain, every time, forever.
//!
//! 🚀 A spinner on stderr while the drain polls (records so far, current lag), and a
//! little comfy-table summary when it's done. stdout belongs to the data, so all of this
//! goes to stderr, and indicatif hides itself when stderr isn't a terminal.
//!
//! ⚠️ Watching the spinner will not make the lag go down. We've tried.

use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if you should probably call your mom.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Keeps score while the drain runs.
pub(crate) struct DrainProgress {
    stream_label: String,
    spinner: ProgressBar,
    polls: u64,
    records: u64,
    last_lag_millis: u64,
    start_time: Instant,
}

impl std::fmt::Debug for DrainProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("DrainProgress")
            .field("stream_label", &self.stream_label)
            .field("polls", &self.polls)
            .field("records", &self.records)
            .field("last_lag_millis", &self.last_lag_millis)
            .finish()
    }
}

impl DrainProgress {
    /// 🚀 `visible = false` gives a hidden spinner that still counts. Tests like that.
    pub(crate) fn new(stream_label: impl Into<String>, visible: bool) -> Self {
        let spinner = if visible {
            let the_spinner = ProgressBar::new_spinner();
            if let Ok(the_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
                the_spinner.set_style(the_style);
            }
            the_spinner.enable_steady_tick(Duration::from_millis(120));
            the_spinner
        } else {
            ProgressBar::hidden()
        };

        Self {
            stream_label: stream_label.into(),
            spinner,
            polls: 0,
            records: 0,
            last_lag_millis: 0,
            start_time: Instant::now(),
        }
    }

    /// 🔄 One poll happened. Tell the spinner.
    pub(crate) fn record_poll(&mut self, records_in_batch: u64, lag_millis: u64) {
        self.polls += 1;
        self.records += records_in_batch;
        self.last_lag_millis = lag_millis;
        self.spinner.set_message(format!(
            "draining {}: {} records, {} ms behind",
            self.stream_label,
            format_number(self.records),
            format_number(lag_millis)
        ));
    }

    pub(crate) fn polls(&self) -> u64 {
        self.polls
    }

    pub(crate) fn records(&self) -> u64 {
        self.records
    }

    /// ✅ Caught up. Clear the spinner, hand back the summary table.
    pub(crate) fn finish(&self) -> Table {
        self.spinner.finish_and_clear();
        self.summary_table()
    }

    /// 💀 Something broke. Leave the spinner where it stopped so the operator sees how far we got.
    pub(crate) fn abandon(&self) {
        self.spinner.abandon();
    }

    fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        table.add_row(vec![
            Cell::new("stream"),
            Cell::new(&self.stream_label).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new("records"),
            Cell::new(format_number(self.records)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new("polls"),
            Cell::new(format_number(self.polls)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new("elapsed"),
            Cell::new(format_duration(self.start_time.elapsed()))
                .set_alignment(CellAlignment::Right),
        ]);
        table
    }
}
