//! JSONL event source
//!
//! Yields one `PulseEvent` per non-blank line, lazily and exactly once.

use super::event::PulseEvent;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug)]
pub enum EventSourceError {
    Io(std::io::Error),
    Parse { line: usize, source: serde_json::Error },
    InvalidUtf8 { line: usize, source: std::string::FromUtf8Error },
}

impl EventSourceError {
    /// Line-level errors leave the stream readable; the line can be skipped.
    pub fn is_line_error(&self) -> bool {
        !matches!(self, EventSourceError::Io(_))
    }
}

impl From<std::io::Error> for EventSourceError {
    fn from(err: std::io::Error) -> Self {
        EventSourceError::Io(err)
    }
}

impl std::fmt::Display for EventSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSourceError::Io(e) => write!(f, "IO error: {}", e),
            EventSourceError::Parse { line, source } => {
                write!(f, "Malformed event on line {}: {}", line, source)
            }
            EventSourceError::InvalidUtf8 { line, source } => {
                write!(f, "Line {} is not valid UTF-8: {}", line, source)
            }
        }
    }
}

impl std::error::Error for EventSourceError {}

pub struct EventReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    finished: bool,
}

impl EventReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventSourceError> {
        let file = File::open(path.as_ref())?;
        log::info!("📖 Reading events from: {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<PulseEvent, EventSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line_no += 1;
                    let line_no = self.line_no;

                    let line = match String::from_utf8(std::mem::take(&mut self.buf)) {
                        Ok(line) => line,
                        Err(source) => {
                            return Some(Err(EventSourceError::InvalidUtf8 { line: line_no, source }))
                        }
                    };

                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    return Some(
                        PulseEvent::from_jsonl(line)
                            .map_err(|source| EventSourceError::Parse { line: line_no, source }),
                    );
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_events_and_skips_blank_lines() {
        let input = concat!(
            r#"{"run":1,"lumi":5,"bx":41,"eb_digis":[{"id":7,"samples":[4196,4196,4196,4196,4196,4196,4196,4196,4196,4196]}]}"#,
            "\n\n   \n",
            r#"{"run":1,"lumi":6,"bx":40}"#,
            "\n"
        );
        let events: Vec<PulseEvent> = EventReader::new(Cursor::new(input))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].eb_digis[0].id, 7);
        assert_eq!(events[0].eb_digis[0].samples, [0x1064; 10]);
        assert!(events[0].ee_digis.is_empty());
        assert_eq!(events[1].lumi, 6);
        assert!(events[1].eb_digis.is_empty());
    }

    #[test]
    fn test_parse_error_reports_line_and_continues() {
        let input = "{\"run\":1,\"lumi\":1,\"bx\":1}\nnot json\n{\"run\":1,\"lumi\":2,\"bx\":1}\n";
        let mut reader = EventReader::new(Cursor::new(input));

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(EventSourceError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert_eq!(reader.next().unwrap().unwrap().lumi, 2);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_wrong_sample_count_is_rejected() {
        let input = r#"{"run":1,"lumi":1,"bx":1,"ee_digis":[{"id":1,"samples":[1,2,3]}]}"#;
        let mut reader = EventReader::new(Cursor::new(input));

        assert!(matches!(reader.next(), Some(Err(EventSourceError::Parse { .. }))));
    }

    #[test]
    fn test_invalid_utf8_line_reports_its_line() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"run\":1,\"lumi\":1,\"bx\":1}\n");
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(b"not json\n");
        input.extend_from_slice(b"{\"run\":1,\"lumi\":2,\"bx\":1}\n");
        let mut reader = EventReader::new(Cursor::new(input));

        assert_eq!(reader.next().unwrap().unwrap().lumi, 1);
        match reader.next().unwrap() {
            Err(e @ EventSourceError::InvalidUtf8 { .. }) => {
                assert!(e.is_line_error());
                assert!(matches!(e, EventSourceError::InvalidUtf8 { line: 2, .. }));
            }
            other => panic!("expected utf-8 error, got {:?}", other),
        }
        match reader.next().unwrap() {
            Err(EventSourceError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert_eq!(reader.next().unwrap().unwrap().lumi, 2);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_last_line_without_newline() {
        let input = "{\"run\":1,\"lumi\":1,\"bx\":1}\n{\"run\":1,\"lumi\":8,\"bx\":1}";
        let lumis: Vec<u32> = EventReader::new(Cursor::new(input))
            .map(|e| e.unwrap().lumi)
            .collect();

        assert_eq!(lumis, vec![1, 8]);
    }
}
