//! External sort of repertoire keys.
//!
//! A repertoire can be far larger than memory, so sorting works in two
//! phases: bounded chunks are sorted and deduplicated in memory and spilled
//! to temp files, then file pairs are merged in parallel rounds until one
//! sorted survivor remains. The survivor doubles as a cacheable artifact
//! stored next to the repertoire.

pub mod arena;
pub mod item;
pub mod sorter;

pub use arena::TempArena;
pub use item::{KeyItem, KeyReader, KeyWriter};
pub use sorter::{KeySorter, KeyStream, SorterConfig};
