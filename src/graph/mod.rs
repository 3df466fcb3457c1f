//! Lineage graph model consumed by the registration engine
//!
//! Spots and links live in arenas and are addressed by copyable ids. Tag sets
//! annotate spots and links. `GraphHandle` puts a graph behind its own
//! reader/writer lock for sharing between threads.

mod arena;
mod handle;
mod model;
mod snapshot;
mod tags;

pub use arena::{Arena, ArenaId, LinkId, SpotId};
pub use handle::GraphHandle;
pub use model::{GraphListener, LineageGraph, Link, Spot, MAX_CHILDREN};
pub use snapshot::{GraphSnapshot, LinkRecord, SpotRecord, TagSetRecord};
pub use tags::{Tag, TagId, TagSet, TagSetId, TagSetModel};
