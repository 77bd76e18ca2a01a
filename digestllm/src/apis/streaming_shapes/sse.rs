use log::debug;

// ============================================================================
// FRAME CONVENTIONS
// ============================================================================

/// Wire framing rules for one vendor's Server-Sent Events stream.
///
/// Both vendors share the same shape (holdback, delimiter scan, optional
/// sentinel line, `data: ` payload lines) and differ only in these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConvention {
    /// Separator between complete records.
    pub delimiter: &'static str,
    /// Prefix marking a payload-bearing line inside a record.
    pub data_prefix: &'static str,
    /// Record that marks logical end of stream, compared after trimming.
    pub done_sentinel: Option<&'static str>,
    /// Whether surrounding whitespace is stripped from a record before it is
    /// inspected.
    pub trim_records: bool,
}

impl FrameConvention {
    /// `streamGenerateContent?alt=sse`: records end with a blank CRLF line,
    /// stream end is signalled by the body closing.
    pub const GEMINI: FrameConvention = FrameConvention {
        delimiter: "\r\n\r\n",
        data_prefix: "data: ",
        done_sentinel: None,
        trim_records: false,
    };

    /// `/chat/completions` with `stream: true`: one record per line, closed
    /// by `data: [DONE]`.
    pub const OPENAI: FrameConvention = FrameConvention {
        delimiter: "\n",
        data_prefix: "data: ",
        done_sentinel: Some("data: [DONE]"),
        trim_records: true,
    };
}

/// One complete record extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload with the `data: ` prefix stripped. Everything from the first
    /// data line to the end of the record belongs to it, joined with `\n`.
    Data(String),
    /// The termination sentinel was observed.
    Done,
}

// ============================================================================
// FRAME SPLITTER
// ============================================================================

/// Extracts complete frames from decoded text that arrives in arbitrary
/// fragments.
///
/// Everything after the last delimiter is held back until the next
/// `consume` call completes it, so the holdback never exceeds one
/// incomplete record.
#[derive(Debug)]
pub struct FrameSplitter {
    convention: FrameConvention,
    buffer: String,
    done: bool,
}

impl FrameSplitter {
    pub fn new(convention: FrameConvention) -> Self {
        Self {
            convention,
            buffer: String::new(),
            done: false,
        }
    }

    /// Append a fragment and return every frame it completes, in arrival order.
    pub fn consume(&mut self, fragment: &str) -> Vec<SseFrame> {
        if self.done {
            return Vec::new();
        }

        let delimiter = self.convention.delimiter;

        // Only the tail of the old holdback can join with the new fragment to
        // form a delimiter, so the scan resumes there.
        let mut scan_from = self
            .buffer
            .len()
            .saturating_sub(delimiter.len().saturating_sub(1));
        while !self.buffer.is_char_boundary(scan_from) {
            scan_from -= 1;
        }
        self.buffer.push_str(fragment);

        let mut frames = Vec::new();
        let mut consumed = 0;
        let mut saw_done = false;

        while let Some(offset) = self.buffer[scan_from..].find(delimiter) {
            let record_end = scan_from + offset;
            let record = &self.buffer[consumed..record_end];
            match parse_record(&self.convention, record) {
                Some(SseFrame::Done) => {
                    frames.push(SseFrame::Done);
                    saw_done = true;
                    break;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
            consumed = record_end + delimiter.len();
            scan_from = consumed;
        }

        if saw_done {
            debug!(
                "stream sentinel observed, discarding {} trailing bytes",
                self.buffer.len() - consumed
            );
            self.done = true;
            self.buffer.clear();
        } else {
            self.buffer.drain(..consumed);
        }

        frames
    }

    /// Handle end of input. A non-empty holdback is parsed as one final
    /// record instead of being discarded, since the last chunk may not be
    /// delimiter-terminated.
    pub fn flush(&mut self) -> Vec<SseFrame> {
        if self.done || self.buffer.is_empty() {
            self.buffer.clear();
            return Vec::new();
        }

        let record = std::mem::take(&mut self.buffer);
        debug!("flushing unterminated record of {} bytes", record.len());
        match parse_record(&self.convention, &record) {
            Some(SseFrame::Done) => {
                self.done = true;
                vec![SseFrame::Done]
            }
            Some(frame) => vec![frame],
            None => Vec::new(),
        }
    }

    /// Whether the termination sentinel has been observed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Bytes currently held back as an incomplete record.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Turn one delimiter-bounded record into a frame, if it carries anything.
fn parse_record(convention: &FrameConvention, record: &str) -> Option<SseFrame> {
    let record = if convention.trim_records {
        record.trim()
    } else {
        record
    };

    if convention.done_sentinel == Some(record) {
        return Some(SseFrame::Done);
    }

    let mut payload: Option<String> = None;
    for raw_line in record.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        match (payload.as_mut(), line.strip_prefix(convention.data_prefix)) {
            (Some(joined), Some(data)) => {
                joined.push('\n');
                joined.push_str(data);
            }
            // continuation of a payload that itself contains line breaks
            (Some(joined), None) => {
                joined.push('\n');
                joined.push_str(raw_line);
            }
            (None, Some(data)) => payload = Some(data.to_string()),
            // comments, event: lines and keep-alives before the payload
            (None, None) => {}
        }
    }

    payload
        .filter(|data| !data.trim().is_empty())
        .map(SseFrame::Data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(payload: &str) -> SseFrame {
        SseFrame::Data(payload.to_string())
    }

    #[test]
    fn test_gemini_records_split_on_blank_crlf_line() {
        let mut splitter = FrameSplitter::new(FrameConvention::GEMINI);
        let frames = splitter.consume("data: {\"a\":1}\r\n\r\ndata: {\"b\":2}\r\n\r\ndata: {\"c\"");

        assert_eq!(frames, vec![data("{\"a\":1}"), data("{\"b\":2}")]);
        assert_eq!(splitter.buffered_len(), "data: {\"c\"".len());

        let frames = splitter.consume(":3}\r\n\r\n");
        assert_eq!(frames, vec![data("{\"c\":3}")]);
        assert_eq!(splitter.buffered_len(), 0);
    }

    #[test]
    fn test_gemini_payload_keeps_embedded_line_breaks() {
        let mut splitter = FrameSplitter::new(FrameConvention::GEMINI);
        let frames = splitter.consume("data: {\"text\":\"line one\nline two\"}\r\n\r\n");
        assert_eq!(frames, vec![data("{\"text\":\"line one\nline two\"}")]);
    }

    #[test]
    fn test_gemini_ignores_non_data_lines() {
        let mut splitter = FrameSplitter::new(FrameConvention::GEMINI);
        let frames = splitter.consume(": keep-alive\r\n\r\nevent: ping\r\ndata: {}\r\n\r\n");
        assert_eq!(frames, vec![data("{}")]);
    }

    #[test]
    fn test_delimiter_split_across_fragments() {
        let mut splitter = FrameSplitter::new(FrameConvention::GEMINI);
        assert!(splitter.consume("data: {}\r").is_empty());
        assert!(splitter.consume("\n\r").is_empty());
        assert_eq!(splitter.consume("\n"), vec![data("{}")]);
    }

    #[test]
    fn test_openai_sentinel_stops_the_splitter() {
        let mut splitter = FrameSplitter::new(FrameConvention::OPENAI);
        let frames = splitter.consume("data: {\"x\":1}\n\ndata: [DONE]\ndata: {\"y\":2}\n");

        assert_eq!(frames, vec![data("{\"x\":1}"), SseFrame::Done]);
        assert!(splitter.is_done());
        assert_eq!(splitter.buffered_len(), 0);
        assert!(splitter.consume("data: {\"z\":3}\n").is_empty());
        assert!(splitter.flush().is_empty());
    }

    #[test]
    fn test_openai_sentinel_split_mid_literal() {
        let mut splitter = FrameSplitter::new(FrameConvention::OPENAI);
        assert!(splitter.consume("data: [DO").is_empty());
        assert_eq!(splitter.consume("NE]\r\n"), vec![SseFrame::Done]);
    }

    #[test]
    fn test_openai_records_are_trimmed() {
        let mut splitter = FrameSplitter::new(FrameConvention::OPENAI);
        let frames = splitter.consume("  data: {\"x\":1}\r\n: comment\n\n");
        assert_eq!(frames, vec![data("{\"x\":1}")]);
    }

    #[test]
    fn test_flush_parses_unterminated_record() {
        let mut splitter = FrameSplitter::new(FrameConvention::GEMINI);
        assert!(splitter.consume("data: {\"last\":true}").is_empty());
        assert_eq!(splitter.flush(), vec![data("{\"last\":true}")]);
        assert!(splitter.flush().is_empty());
    }

    #[test]
    fn test_flush_recognises_unterminated_sentinel() {
        let mut splitter = FrameSplitter::new(FrameConvention::OPENAI);
        assert!(splitter.consume("data: [DONE]").is_empty());
        assert_eq!(splitter.flush(), vec![SseFrame::Done]);
        assert!(splitter.is_done());
    }

    #[test]
    fn test_empty_data_lines_are_skipped() {
        let mut splitter = FrameSplitter::new(FrameConvention::OPENAI);
        assert!(splitter.consume("data: \n\n").is_empty());
    }

    #[test]
    fn test_scan_resumes_after_multibyte_holdback() {
        let mut splitter = FrameSplitter::new(FrameConvention::GEMINI);
        assert!(splitter.consume("data: {\"t\":\"摘").is_empty());
        assert_eq!(
            splitter.consume("要\"}\r\n\r\n"),
            vec![data("{\"t\":\"摘要\"}")]
        );
    }
}
