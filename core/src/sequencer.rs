//! Issuance-ordered staleness tokens.
//!
//! Every list-mutating request takes a token before it is sent. When its
//! response arrives it may only touch shared state if its token is still the
//! latest one issued; anything else is a superseded result and is dropped.
//! Ordering is therefore by issuance, never by completion.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl Token {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token and records it as the latest.
    pub fn next_token(&self) -> Token {
        Token(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, token: Token) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_increase_monotonically() {
        let seq = RequestSequencer::new();
        let a = seq.next_token();
        let b = seq.next_token();
        assert!(b > a);
        assert_eq!(b.value(), a.value() + 1);
    }

    #[test]
    fn only_last_issued_is_latest() {
        let seq = RequestSequencer::new();
        let first = seq.next_token();
        assert!(seq.is_latest(first));

        let second = seq.next_token();
        assert!(!seq.is_latest(first));
        assert!(seq.is_latest(second));
    }
}
