use uuid::Uuid;

/// The single user record lives under a fixed key.
pub const SINGLETON_USER_KEY: &[u8] = b"user";

/// UUID v7 bytes sort by creation time, so tree iteration is insertion-ordered.
pub fn word_key(word_id: &Uuid) -> [u8; 16] {
    *word_id.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_keys_follow_creation_order() {
        let older = Uuid::now_v7();
        let newer = Uuid::now_v7();
        assert!(word_key(&older) < word_key(&newer));
    }
}
