//! Carton - The artist's toolbox for Lumen.
//!
//! Small, dependency-light building blocks shared by every other crate in
//! the workspace: byte ranges, line tables, content fingerprints, and the
//! collection types the rest of the workspace standardises on.
//!
//! # Example
//!
//! ```
//! use lumen_carton::{LineIndex, SourceRange};
//!
//! let text = "---\nconst a = 1;\n---\n<div/>";
//! let index = LineIndex::new(text);
//! assert_eq!(index.offset(1, 6), 10);
//!
//! let range = SourceRange::new(4, 16);
//! assert!(range.contains(10));
//! ```

pub mod hash;
pub mod line_index;
pub mod source_range;

pub use hash::{content_hash, hash_str, Fingerprint};
pub use line_index::{ColumnEncoding, LineIndex};
pub use source_range::SourceRange;

// Re-export compact_str::CompactString for convenience
pub use compact_str::CompactString;

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export bitflags for flag types
pub use bitflags::bitflags;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};
