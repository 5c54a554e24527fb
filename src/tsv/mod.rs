pub mod reader;
pub mod receiver;

pub use reader::Reader;
pub use receiver::{receive, Ingest, IngestOverrides};
