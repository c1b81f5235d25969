//! Snapshot persistence

mod json_file;

pub use json_file::JsonFileCheckpoint;
