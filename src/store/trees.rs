pub const WORDS: &str = "words";
pub const USERS: &str = "users";
pub const META: &str = "meta";
