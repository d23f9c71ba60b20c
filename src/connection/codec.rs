//! State code decoding
//!
//! The monitor writes ASCII decimal codes, normally one per line. A single
//! read may carry several codes or end in the middle of one, so bytes after
//! the last ASCII whitespace are held back until a later read terminates them.

/// Longest unterminated token kept across reads. An `i32` needs at most 11.
const MAX_TOKEN_LEN: usize = 32;

/// One whitespace-separated token of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Code(i32),
    /// Anything that is not a decimal `i32`, kept for logging
    Malformed(String),
}

/// Reassembles tokens that straddle read boundaries
#[derive(Debug, Default)]
pub struct CodeDecoder {
    pending: Vec<u8>,
    /// Skipping the rest of a token that already exceeded `MAX_TOKEN_LEN`
    discarding: bool,
}

impl CodeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every token completed by `chunk`, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut rest = chunk;

        if self.discarding {
            match rest.iter().position(u8::is_ascii_whitespace) {
                Some(end) => {
                    self.discarding = false;
                    rest = &rest[end..];
                }
                None => return tokens,
            }
        }

        match rest.iter().rposition(u8::is_ascii_whitespace) {
            Some(end) => {
                self.pending.extend_from_slice(&rest[..end]);
                tokens.extend(decode_chunk(&self.pending));
                self.pending.clear();
                self.pending.extend_from_slice(&rest[end + 1..]);
            }
            None => self.pending.extend_from_slice(rest),
        }

        if self.pending.len() > MAX_TOKEN_LEN {
            tokens.push(malformed(&self.pending));
            self.pending.clear();
            self.discarding = true;
        }
        tokens
    }

    /// Decode the unterminated tail once the stream has ended cleanly
    pub fn finish(&mut self) -> Option<Token> {
        let tail = std::mem::take(&mut self.pending);
        let discarding = std::mem::replace(&mut self.discarding, false);
        if discarding || tail.is_empty() {
            return None;
        }
        Some(decode_token(&tail))
    }

    /// Drop any partial token, e.g. after the connection broke
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }
}

/// Decode every token in `chunk`, in order. A blank chunk yields nothing.
fn decode_chunk(chunk: &[u8]) -> impl Iterator<Item = Token> + '_ {
    chunk
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .map(decode_token)
}

fn decode_token(token: &[u8]) -> Token {
    std::str::from_utf8(token)
        .ok()
        .and_then(|text| text.parse::<i32>().ok())
        .map(Token::Code)
        .unwrap_or_else(|| malformed(token))
}

fn malformed(token: &[u8]) -> Token {
    Token::Malformed(String::from_utf8_lossy(token).into_owned())
}
