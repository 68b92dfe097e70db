//! Session token minting.
//!
//! Tokens are random bytes from the thread-local generator, hex encoded. They
//! are opaque handles for re-binding a connection, not credentials: the
//! generator is not vetted for use across an untrusted network.

use rand::RngCore;

const TOKEN_BYTES: usize = 16;

/// Length in characters of every minted token.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

pub fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tokens_are_fixed_length_lowercase_hex() {
        let token = mint_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn tokens_are_distinct() {
        let tokens: HashSet<String> = (0..1000).map(|_| mint_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
