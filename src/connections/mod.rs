//! Connection graph
//!
//! A pairwise relationship table written both by explicit connect requests
//! and by the coworker verification path. One document per directional
//! request, queried bidirectionally where the operation calls for it.

pub mod graph;

pub use graph::ConnectionGraph;
