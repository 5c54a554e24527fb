pub mod analysis;
pub mod cli;
pub mod config;
pub mod exec;
pub mod keys;
pub mod model;
pub mod sort;
pub mod store;
pub mod tsv;
pub mod utils;

pub use crate::exec::WorkerPool;
pub use crate::sort::KeySorter;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClonescanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClonescanError>;
