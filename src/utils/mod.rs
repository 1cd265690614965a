pub mod json_recovery;
pub mod text;
pub mod time;
