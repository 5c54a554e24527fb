pub mod locus;
pub mod rearrangement;
pub mod repertoire;

pub use locus::{FrameType, Locus, LocusGroup};
pub use rearrangement::Rearrangement;
pub use repertoire::Repertoire;
