//! Lineage registration
//!
//! Matches the cell-lineage trees of two embryos of the same species: pairs
//! founder cells by name, estimates the similarity transform between the
//! embryos from them, walks both trees in lock-step to build a branch
//! correspondence, and reorders children of one embryo to follow the other.

pub mod annotate;
pub mod coloring;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod registration;
pub mod sort_tree;
pub mod synthetic;

pub use config::{AnnotationConfig, RegistrationConfig};
pub use error::{ConfigError, GraphError, RegistrationError};
pub use graph::{GraphHandle, GraphSnapshot, LineageGraph, SpotId};
pub use registration::{
    flip_children, register_handles, register_lineages, sort_second_to_match, Mapping,
    Registration, SimilarityTransform,
};
