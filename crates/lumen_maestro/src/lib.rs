//! # lumen_maestro
//!
//! Maestro - Virtual code projection core for Lumen editor tooling.
//!
//! ## Name Origin
//!
//! **Maestro** is a master conductor who coordinates an orchestra.
//! `lumen_maestro` coordinates the markup parser, the frontmatter data
//! parser and the external template compiler, and keeps every projection
//! they produce mapped back to the component source.
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                      lumen_maestro (core)                         |
//! +------------------------------------------------------------------+
//! |                                                                    |
//! |  +--------------------+     +-------------------+                  |
//! |  |   Document Store   |---->|    Workspace      |                  |
//! |  |  (Rope edits,      |     | (version checks,  |                  |
//! |  |   snapshots)       |     |  tree replacement)|                  |
//! |  +--------------------+     +-------------------+                  |
//! |                                      |                             |
//! |                                      v                             |
//! |  +-----------------------------------------------------------+    |
//! |  |                   Virtual Code Layer                       |    |
//! |  |  regions -> tsx (repaired map) | styles | scripts          |    |
//! |  |           frontmatter-ts (data projection)                 |    |
//! |  |  SourceMap with capability-gated bidirectional lookups     |    |
//! |  +-----------------------------------------------------------+    |
//! |                                      |                             |
//! |                                      v                             |
//! |  +-----------------------------------------------------------+    |
//! |  |                    Syntax Analysis Layer                   |    |
//! |  |  lumen_armature | lumen_folio | lumen_relief               |    |
//! |  +-----------------------------------------------------------+    |
//! +------------------------------------------------------------------+
//! ```
//!
//! ## Usage
//!
//! ```
//! use lumen_maestro::compiler::{CompileError, CompileOutput, TemplateCompiler};
//! use lumen_maestro::{LumenConfig, Workspace};
//!
//! struct Offline;
//!
//! impl TemplateCompiler for Offline {
//!     fn compile(&self, _text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
//!         Err(CompileError::Failed("offline".into()))
//!     }
//! }
//!
//! let workspace = Workspace::new(Offline, LumenConfig::default());
//! let tree = workspace
//!     .open("src/pages/index.astro", "<style>a { color: red; }</style>", 1)
//!     .unwrap();
//! assert!(tree.find("src/pages/index.astro.0.css").is_some());
//! ```

pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod regions;
pub mod virtual_code;
pub mod workspace;

pub use config::LumenConfig;
pub use diagnostics::{reshape_frontmatter_diagnostics, ToLsp};
pub use document::{DocumentKind, DocumentStore, Snapshot, UpdateError};
pub use regions::{scan_regions, RegionKind, SourceRegion};
pub use virtual_code::{
    Capabilities, Mapping, SourceMap, VirtualCode, VirtualCodeGenerator, VirtualCodeTree,
    VirtualLanguage,
};
pub use workspace::Workspace;
