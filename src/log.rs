//! Log sinks for operator-facing output.
//!
//! Lifecycle operations report progress, validation warnings and the output
//! of the control script through a [`LogSink`]. The default sink forwards
//! every line to `tracing`; [`MemorySink`] keeps lines in memory for
//! embedding tools that want to show them elsewhere.

use std::sync::Mutex;
use tracing::Level;

/// Receives leveled text lines.
pub trait LogSink: Send + Sync {
    /// Record a single line at the given level.
    fn log(&self, level: Level, line: &str);

    /// Record a line at info level.
    fn info(&self, line: &str) {
        self.log(Level::INFO, line);
    }

    /// Record a line at warn level.
    fn warn(&self, line: &str) {
        self.log(Level::WARN, line);
    }
}

/// Forwards lines to `tracing` events under the `teamcity` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, line: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "teamcity", "{}", line),
            Level::WARN => tracing::warn!(target: "teamcity", "{}", line),
            Level::INFO => tracing::info!(target: "teamcity", "{}", line),
            Level::DEBUG => tracing::debug!(target: "teamcity", "{}", line),
            _ => tracing::trace!(target: "teamcity", "{}", line),
        }
    }
}

/// Collects lines in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded line with its level
    pub fn entries(&self) -> Vec<(Level, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Recorded lines at exactly the given level
    pub fn lines_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((level, line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order_and_levels() {
        let sink = MemorySink::new();
        sink.info("first");
        sink.warn("second");
        sink.info("third");

        assert_eq!(sink.lines_at(Level::INFO), vec!["first", "third"]);
        assert_eq!(sink.lines_at(Level::WARN), vec!["second"]);
        assert_eq!(sink.entries().len(), 3);
    }
}
