//! Internal utilities for streaming command output to logs.
//!
//! Output is logged line by line while the tool runs, and the last few
//! lines are kept so a failure can be reported without rerunning the tool.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};

use super::redact_secrets;

/// Number of trailing lines kept per stream.
pub(super) const TAIL_LINES: usize = 10;

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads from a pipe, logs each line, and returns the last [`TAIL_LINES`] lines.
///
/// - `secrets` are masked in every line before it is logged or kept
/// - stdout is logged at INFO level, stderr at WARN level
/// - Binary data uses lossy UTF-8 conversion
/// - I/O errors stop reading but don't fail command execution
///   (the exit status decides success)
pub(super) fn read_pipe_to_log<R: Read>(
    pipe: Option<R>,
    stream_type: StreamType,
    secrets: &[String],
) -> Vec<String> {
    let Some(pipe) = pipe else {
        tracing::error!(
            stream = %stream_type,
            "pipe was None (unexpected: Stdio::piped() was set), no output will be captured"
        );
        return Vec::new();
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();
    let mut tail = VecDeque::with_capacity(TAIL_LINES);

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let content = line_buf.strip_suffix(b"\n").unwrap_or(&line_buf);
                let text = String::from_utf8_lossy(content);
                let line = redact_secrets(text.trim_end_matches('\r'), secrets);
                log_line(&line, stream_type);
                if tail.len() == TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }

    tail.into_iter().collect()
}

fn log_line(line: &str, stream_type: StreamType) {
    match stream_type {
        StreamType::Stdout => tracing::info!(stream = %stream_type, "{}", line),
        StreamType::Stderr => tracing::warn!(stream = %stream_type, "{}", line),
    }
}
