//! Line framing for the request stream.
//!
//! Bytes arrive one at a time from the transport. The buffer accumulates a
//! line until `\n`, tracking overflow and invalid bytes so the error can be
//! reported at the line boundary instead of mid-stream.

use heapless::String;

/// Maximum accepted request line length, excluding the terminator.
///
/// The longest legal line is `RGB ` plus 96 hex digits.
pub const MAX_LINE_LEN: usize = 100;

/// Line-level failures, reported when the terminating `\n` arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// More than [`MAX_LINE_LEN`] bytes before the terminator.
    TooLong,
    /// A byte outside printable ASCII appeared in the line.
    Invalid,
}

/// Bounded accumulator for one request line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: String<MAX_LINE_LEN>,
    too_long: bool,
    invalid: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte from the transport.
    ///
    /// Returns `Some` when a `\n` completes a line: the accumulated text, or
    /// the error to report for it. `\r` bytes are stripped. The completed
    /// line may be empty; callers ignore those.
    pub fn feed(&mut self, byte: u8) -> Option<Result<String<MAX_LINE_LEN>, LineError>> {
        match byte {
            b'\n' => {
                let result = if self.too_long {
                    Err(LineError::TooLong)
                } else if self.invalid {
                    Err(LineError::Invalid)
                } else {
                    Ok(self.buf.clone())
                };
                self.reset();
                Some(result)
            }
            b'\r' => None,
            0x20..=0x7E => {
                if self.buf.push(byte as char).is_err() {
                    self.too_long = true;
                }
                None
            }
            _ => {
                self.invalid = true;
                None
            }
        }
    }

    /// Discard the partial line and all error flags.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.too_long = false;
        self.invalid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(buf: &mut LineBuffer, s: &str) -> Option<Result<String<MAX_LINE_LEN>, LineError>> {
        let mut last = None;
        for b in s.bytes() {
            last = buf.feed(b);
        }
        last
    }

    #[test]
    fn test_simple_line() {
        let mut buf = LineBuffer::new();
        let line = feed_str(&mut buf, "VER\n").unwrap().unwrap();
        assert_eq!(line.as_str(), "VER");
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buf = LineBuffer::new();
        let line = feed_str(&mut buf, "FRE\r\n").unwrap().unwrap();
        assert_eq!(line.as_str(), "FRE");
    }

    #[test]
    fn test_empty_line() {
        let mut buf = LineBuffer::new();
        let line = buf.feed(b'\n').unwrap().unwrap();
        assert!(line.is_empty());
    }

    #[test]
    fn test_overflow_reported_at_newline() {
        let mut buf = LineBuffer::new();
        for _ in 0..150 {
            assert!(buf.feed(b'A').is_none());
        }
        assert_eq!(buf.feed(b'\n'), Some(Err(LineError::TooLong)));
        // The buffer recovers for the next line.
        let line = feed_str(&mut buf, "VER\n").unwrap().unwrap();
        assert_eq!(line.as_str(), "VER");
    }

    #[test]
    fn test_invalid_byte() {
        let mut buf = LineBuffer::new();
        buf.feed(b'V');
        buf.feed(0x07);
        buf.feed(b'R');
        assert_eq!(buf.feed(b'\n'), Some(Err(LineError::Invalid)));
    }

    #[test]
    fn test_max_length_line_accepted() {
        let mut buf = LineBuffer::new();
        for _ in 0..MAX_LINE_LEN {
            buf.feed(b'F');
        }
        let line = buf.feed(b'\n').unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN);
    }
}
