//! Affinity scoring and reference quality diagnostics.
//!
//! - [`zscore`](zscore::zscore): closed-form expected adjacency support between
//!   two segments, used to weight evidence before it enters an
//!   [`AdjacencyGraph`](crate::core::adjacency::AdjacencyGraph)
//! - [`reference_score`](diagnostics::reference_score): total link weight realised
//!   by a [`Reference`](crate::core::reference::Reference)
//! - [`bad_adjacency_count`](diagnostics::bad_adjacency_count): consecutive
//!   placements without direct supporting evidence

pub mod diagnostics;
pub mod zscore;
