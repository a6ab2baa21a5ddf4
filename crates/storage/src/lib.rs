#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AnswersRecord, InMemoryRepository, LocalStateRepository, Storage, StorageError, StorageKey,
};
