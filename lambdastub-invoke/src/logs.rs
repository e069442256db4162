//! Synthetic execution log
//!
//! Reproduces the lines the Lambda runtime writes around each invocation so
//! that `X-Amz-Log-Result` looks like the real thing.

use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Local};
use std::fmt::Display;
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Accumulated log text for one invocation
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    text: String,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, at: DateTime<Local>, message: impl Display) {
        let line = format!("{} {}", at.format(TIMESTAMP_FORMAT), message);
        info!(target: "lambdastub::function", "{}", line);
        self.text.push_str(&line);
        self.text.push('\n');
    }

    pub fn start(&mut self, at: DateTime<Local>, request_id: &str, version: &str) {
        self.line(at, format_args!("START RequestId: {} Version: {}", request_id, version));
    }

    /// Echo a request payload, handler result or error body
    pub fn echo(&mut self, at: DateTime<Local>, bytes: &[u8]) {
        self.line(at, String::from_utf8_lossy(bytes));
    }

    pub fn end(&mut self, at: DateTime<Local>, request_id: &str) {
        self.line(at, format_args!("END RequestId: {}", request_id));
    }

    /// Only the duration is measured; the other figures are placeholders
    pub fn report(&mut self, at: DateTime<Local>, request_id: &str, duration_ms: f64, memory_mb: u32) {
        self.line(
            at,
            format_args!(
                "REPORT RequestId: {}  Init Duration x.xx ms Duration:{:02.6} ms     Billed Duration yyy ms Memory Size {} MB     Max Memory Used: {} MB",
                request_id, duration_ms, memory_mb, memory_mb
            ),
        );
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Value for `X-Amz-Log-Result`: unpadded standard base64
    pub fn tail(&self) -> String {
        general_purpose::STANDARD_NO_PAD.encode(self.text.as_bytes())
    }
}

/// Wall-clock milliseconds between two instants, microsecond resolution
pub fn duration_ms(started_at: DateTime<Local>, finished_at: DateTime<Local>) -> f64 {
    let micros = (finished_at - started_at).num_microseconds().unwrap_or(0).max(0);
    micros as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_log_lines() {
        let mut log = ExecutionLog::new();
        log.start(at(), "req-1", "$LATEST");
        log.echo(at(), br#"{"key":"value"}"#);
        log.echo(at(), br#""ok""#);
        log.end(at(), "req-1");
        log.report(at(), "req-1", 1.5, 128);

        let lines: Vec<&str> = log.as_str().lines().collect();
        assert_eq!(
            lines,
            vec![
                "2024/01/02 03:04:05 START RequestId: req-1 Version: $LATEST",
                r#"2024/01/02 03:04:05 {"key":"value"}"#,
                r#"2024/01/02 03:04:05 "ok""#,
                "2024/01/02 03:04:05 END RequestId: req-1",
                "2024/01/02 03:04:05 REPORT RequestId: req-1  Init Duration x.xx ms Duration:1.500000 ms     Billed Duration yyy ms Memory Size 128 MB     Max Memory Used: 128 MB",
            ]
        );
        assert!(log.as_str().ends_with('\n'));
    }

    #[test]
    fn test_tail_is_unpadded_base64() {
        let mut log = ExecutionLog::new();
        log.end(at(), "r");

        let tail = log.tail();
        assert!(!tail.ends_with('='));
        let decoded = general_purpose::STANDARD_NO_PAD.decode(&tail).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), log.as_str());
    }

    #[test]
    fn test_duration_ms() {
        let start = at();
        assert_eq!(duration_ms(start, start + Duration::microseconds(2500)), 2.5);
        assert_eq!(duration_ms(start + Duration::seconds(1), start), 0.0);
    }
}
