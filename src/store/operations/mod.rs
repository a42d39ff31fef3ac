pub mod users;
pub mod words;
