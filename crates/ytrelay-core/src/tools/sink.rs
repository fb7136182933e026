//! Where subprocess output goes.
//!
//! Every stream of every tool is always drained through a sink, so there is
//! no "maybe captured" state: with debug off the sink simply drops lines.

use std::collections::VecDeque;
use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSink {
    /// Drop tool output.
    #[default]
    Discard,
    /// Forward each line to `tracing` at debug level.
    Trace,
}

impl OutputSink {
    pub fn for_debug(debug: bool) -> Self {
        if debug {
            OutputSink::Trace
        } else {
            OutputSink::Discard
        }
    }

    pub fn emit(self, tool: &'static str, stream: &'static str, line: &str) {
        match self {
            OutputSink::Discard => {}
            OutputSink::Trace => tracing::debug!(tool, stream, "{}", line),
        }
    }

    /// Reads `reader` to EOF, emitting every non-empty line and returning the
    /// last `keep` of them. Lines are decoded lossily so odd bytes never stall
    /// the pipe.
    pub async fn pump<R>(
        self,
        reader: R,
        tool: &'static str,
        stream: &'static str,
        keep: usize,
    ) -> io::Result<Vec<String>>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut kept = VecDeque::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            self.emit(tool, stream, line);
            if keep > 0 {
                if kept.len() == keep {
                    kept.pop_front();
                }
                kept.push_back(line.to_string());
            }
        }
        Ok(kept.into())
    }
}
