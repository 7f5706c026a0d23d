//! Incremental decoder for `text/event-stream` bodies.
//!
//! Chunks may split lines (or CRLF pairs) anywhere; the decoder buffers partial lines and
//! only emits a message once its terminating blank line has arrived. A line or frame larger
//! than the decoder's limit fails the stream instead of growing the buffer further.

use crate::error::StreamError;

/// Upper bound for one line and for the data of one frame.
pub const MAX_FRAME_BYTES: usize = 1 << 20;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry_ms: Option<u64>,
}

impl SseMessage {
    /// Messages without an explicit event name are delivered as `message`.
    pub fn is_default_event(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

#[derive(Debug)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: Vec<String>,
    data_bytes: usize,
    max_frame: usize,
    event: Option<String>,
    id: Option<String>,
    retry_ms: Option<u64>,
    skip_lf: bool,
    started: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_frame(MAX_FRAME_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            line: Vec::new(),
            data: Vec::new(),
            data_bytes: 0,
            max_frame: max_frame.max(1),
            event: None,
            id: None,
            retry_ms: None,
            skip_lf: false,
            started: false,
        }
    }

    /// Decode `chunk`. On overflow the partial frame is dropped, along with any message
    /// completed earlier in the same chunk, and the decoder starts over clean.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseMessage>, StreamError> {
        let mut out = Vec::new();
        for &byte in chunk {
            match byte {
                b'\n' if self.skip_lf => {
                    self.skip_lf = false;
                }
                b'\n' => self.end_line(&mut out),
                b'\r' => {
                    self.end_line(&mut out);
                    self.skip_lf = true;
                }
                other => {
                    self.skip_lf = false;
                    self.line.push(other);
                    if self.line.len() > self.max_frame {
                        return Err(self.overflow("line"));
                    }
                }
            }
            if self.data_bytes > self.max_frame {
                return Err(self.overflow("frame"));
            }
        }
        Ok(out)
    }

    fn overflow(&mut self, what: &str) -> StreamError {
        let limit = self.max_frame;
        *self = Self::with_max_frame(limit);
        StreamError::Interrupted(format!("event stream {what} exceeds {limit} bytes"))
    }

    fn end_line(&mut self, out: &mut Vec<SseMessage>) {
        let raw = std::mem::take(&mut self.line);
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        if !self.started {
            self.started = true;
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_string();
            }
        }

        if line.is_empty() {
            if let Some(message) = self.dispatch() {
                out.push(message);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };
        match field {
            "data" => {
                self.data_bytes += value.len() + 1;
                self.data.push(value.to_string());
            }
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry_ms = Some(ms);
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        let retry_ms = self.retry_ms.take();
        self.data_bytes = 0;
        if self.data.is_empty() {
            return None;
        }
        Some(SseMessage {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.clone(),
            retry_ms,
        })
    }
}
