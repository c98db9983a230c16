//! Core data structures for reference scaffolding.
//!
//! - [`Placement`](types::Placement), [`Orientation`](types::Orientation): an
//!   oriented segment and the signed-side convention used at every API boundary
//! - [`AdjacencyGraph`](adjacency::AdjacencyGraph): symmetric weighted graph over
//!   segment sides
//! - [`Reference`](reference::Reference): ordered, oriented segments partitioned
//!   into intervals bounded by stub nodes
//!
//! ## Sides
//!
//! Segment `i` has two sides, `+i` and `-i`. A segment placed as `+i` shows `+i`
//! to its predecessor and `-i` to its successor; placed as `-i` the roles swap.
//! Consecutive placements `x`, `y` therefore realise the adjacency `(-x, y)`.

pub mod adjacency;
pub mod reference;
pub mod types;
