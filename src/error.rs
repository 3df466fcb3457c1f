//! Error types for graph access, configuration and registration.
//!
//! Only transform estimation can make a registration fail. Missing mapping
//! entries, non-dividing branches and leaves are ordinary states and never
//! surface here.

use crate::graph::{LinkId, SpotId, TagSetId};

/// Failures of the lineage graph layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Unknown spot: {0}")]
    UnknownSpot(SpotId),

    #[error("Unknown link: {0}")]
    UnknownLink(LinkId),

    #[error("Spot {0} already has two children")]
    TooManyChildren(SpotId),

    #[error("Spot {0} already has a parent")]
    AlreadyHasParent(SpotId),

    #[error("Unknown tag set: {0}")]
    UnknownTagSet(TagSetId),

    #[error("No tag set named '{0}'")]
    UnknownTagSetName(String),

    #[error("Tag set {set} has no tag '{tag}'")]
    UnknownTag { set: String, tag: String },

    #[error("Both sides of a read/write pair refer to the same graph")]
    SameGraph,

    #[error("Graph lock poisoned")]
    LockPoisoned,

    #[error("Tree sorting needs at least one left and one right anchor")]
    EmptyAnchors,

    #[error("Snapshot references unknown spot id {0}")]
    UnknownSnapshotSpot(u32),

    #[error("Snapshot references unknown tag set #{0}")]
    UnknownSnapshotTagSet(usize),
}

/// Failures of a registration run
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Insufficient anchors: found {found} paired dividing roots, need at least {required}")]
    InsufficientAnchors { found: usize, required: usize },

    #[error("Degenerate fit: anchor points are collinear or coincident")]
    DegenerateFit,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failures while loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
