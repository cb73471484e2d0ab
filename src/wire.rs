//! The line-oriented wire format: parsing inbound lines and framing
//! outbound ones.
//!
//! Only the subset the engine speaks is modeled. An inbound line is
//! `[:source] COMMAND params... [:trailing]`; anything that does not fit
//! parses to `None` and is ignored upstream rather than treated as an
//! error.

/// Longest protocol line, delimiter included.
pub const MAX_LINE_LEN: usize = 512;

/// Bytes reserved for the `:source` prefix the server prepends when it
/// relays our message to other clients.
pub const RELAY_MARGIN: usize = 100;

/// The protocol line delimiter.
pub const CRLF: &str = "\r\n";

/// One parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The line as received, delimiter stripped.
    pub raw: String,
    /// The `:source` prefix, if present. Absent on server-initiated
    /// commands like `PING`.
    pub source: Option<String>,
    /// Command token: a word (`PRIVMSG`) or a numeric (`001`).
    pub command: String,
    /// Positional parameters; a trailing `:param` becomes the last entry
    /// with spaces intact.
    pub params: Vec<String>,
}

impl Message {
    /// Parse one line. Returns `None` for lines too short to mean
    /// anything.
    pub fn parse(line: &str) -> Option<Self> {
        let raw = line.trim_end_matches(['\r', '\n']);
        let mut rest = raw;

        let source = match rest.strip_prefix(':') {
            Some(prefixed) => {
                let (source, tail) = prefixed.split_once(' ')?;
                rest = tail.trim_start_matches(' ');
                Some(source.to_string())
            }
            None => None,
        };

        let command = match rest.split_once(' ') {
            Some((command, tail)) => {
                rest = tail.trim_start_matches(' ');
                command
            }
            None => {
                let command = rest;
                rest = "";
                command
            }
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    params.push(param.to_string());
                    rest = tail.trim_start_matches(' ');
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            raw: raw.to_string(),
            source,
            command: command.to_string(),
            params,
        })
    }

    /// The nick part of the source (`nick!user@host` → `nick`).
    pub fn source_nick(&self) -> Option<&str> {
        self.source
            .as_deref()
            .map(|s| s.split('!').next().unwrap_or(s))
    }

    /// True when the source carries a user hostmask rather than a bare
    /// server name.
    pub fn is_user_source(&self) -> bool {
        self.source.as_deref().is_some_and(|s| s.contains('!'))
    }
}

/// True when `target` names a channel rather than a user.
pub fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

/// Frame one logical message as `PRIVMSG` lines.
///
/// Embedded CR/LF is collapsed to spaces so caller-supplied text can never
/// smuggle extra protocol lines. The payload is chunked so every framed
/// line fits the protocol budget with [`RELAY_MARGIN`] to spare; chunks
/// split on `char` boundaries, never mid-sequence. Empty or
/// whitespace-only text yields no lines at all.
///
/// Lines come back without the delimiter; the send path appends it.
pub fn format_privmsg(target: &str, text: &str) -> Vec<String> {
    let text = text.replace(['\r', '\n'], " ");
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let prefix = format!("PRIVMSG {target} :");
    let budget = MAX_LINE_LEN
        .saturating_sub(prefix.len() + CRLF.len() + RELAY_MARGIN)
        .max(4); // always room for one UTF-8 char, whatever the target length

    split_chunks(text, budget)
        .into_iter()
        .map(|chunk| format!("{prefix}{chunk}"))
        .collect()
}

/// Split into chunks of at most `budget` bytes on char boundaries.
fn split_chunks(text: &str, budget: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > budget {
        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}
