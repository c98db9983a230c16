//! Parsers for scaffolding inputs.
//!
//! All inputs are tab- or comma-delimited text (comma for `.csv` files):
//!
//! | Input | Columns | Notes |
//! |-------|---------|-------|
//! | Weights | `side_a side_b weight` | adjacency weights used directly |
//! | Links | `side_a side_b gap length_a length_b [support]` | weighted with the affinity model |
//! | Stubs | `left right` | one interval per line |
//!
//! Sides are signed segment ids. Blank lines and `#` comments are ignored, and
//! a first line whose leading field is not an integer is treated as a header.
//!
//! ## Example
//!
//! ```rust
//! use ref_scaffold::parsing::tsv::parse_weights_text;
//!
//! let records = parse_weights_text("1\t-3\t2.5\n", '\t').unwrap();
//! assert_eq!(records[0].side_b, -3);
//! ```

pub mod tsv;
