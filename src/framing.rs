//! CRLF line framing over a raw byte stream.
//!
//! The socket hands us arbitrarily sized chunks: one read may carry zero,
//! one, or many protocol lines, and the last one may be cut anywhere,
//! including in the middle of a UTF-8 sequence. The framer accumulates
//! bytes and yields only complete lines, decoding each line on its own so
//! a character split across two reads is never corrupted.

/// Splits a raw byte stream into complete CRLF-terminated lines.
///
/// Holds the unfinished tail between reads. One framer per connection: a
/// fresh session constructs a fresh framer, so a partial line left over
/// from a dead connection can never prefix the next connection's first
/// read.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw read, returning every line it completed, in order.
    ///
    /// Lines come back without the delimiter. Invalid UTF-8 is replaced,
    /// never an error. A read ending exactly on a delimiter leaves an
    /// empty remainder rather than dropping anything.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = find_crlf(&self.buf[start..]) {
            let end = start + pos;
            lines.push(String::from_utf8_lossy(&self.buf[start..end]).into_owned());
            start = end + CRLF.len();
        }
        self.buf.drain(..start);

        lines
    }
}

const CRLF: &[u8] = b"\r\n";

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_read_many_lines() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"PING :a\r\n:s 001 n :Welcome\r\n");
        assert_eq!(lines, vec!["PING :a", ":s 001 n :Welcome"]);
    }

    #[test]
    fn read_with_no_complete_line() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"PRIVMSG #chan ").is_empty());
        assert_eq!(framer.feed(b":hello\r\n"), vec!["PRIVMSG #chan :hello"]);
    }

    #[test]
    fn read_ending_exactly_on_delimiter() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"first\r\n"), vec!["first"]);
        // The remainder became empty, not lost: the next line is intact.
        assert_eq!(framer.feed(b"second\r\n"), vec!["second"]);
    }

    #[test]
    fn byte_at_a_time() {
        let mut framer = LineFramer::new();
        let mut lines = Vec::new();
        for byte in b"first\r\nsecond\r\n" {
            lines.extend(framer.feed(&[*byte]));
        }
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn delimiter_split_across_reads() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"first\r").is_empty());
        assert_eq!(framer.feed(b"\nsecond\r\n"), vec!["first", "second"]);
    }

    #[test]
    fn multibyte_char_split_across_reads() {
        let mut framer = LineFramer::new();
        let bytes = "héllo\r\n".as_bytes();
        // Cut inside the two-byte 'é'.
        assert!(framer.feed(&bytes[..2]).is_empty());
        assert_eq!(framer.feed(&bytes[2..]), vec!["héllo"]);
    }

    #[test]
    fn invalid_bytes_are_replaced_not_fatal() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"ok \xff\xfe bytes\r\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ok "));
        assert!(lines[0].ends_with(" bytes"));
    }

    #[test]
    fn arbitrary_chunking_reconstructs_the_stream() {
        let payload = b"one\r\ntwo\r\nthree\r\nfour and more\r\n";
        let expected = vec!["one", "two", "three", "four and more"];

        // Whole payload at once.
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(payload), expected);

        // Every possible split point of the payload into two reads.
        for cut in 0..payload.len() {
            let mut framer = LineFramer::new();
            let mut lines = framer.feed(&payload[..cut]);
            lines.extend(framer.feed(&payload[cut..]));
            assert_eq!(lines, expected, "split at byte {cut}");
        }
    }
}
