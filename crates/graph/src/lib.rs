//! # MegaMol Graph
//!
//! Editable module/call dependency graph of a MegaMol project.
//!
//! ## Features
//!
//! - **Module registry** - instantiate module classes from a stock catalog
//! - **Typed connections** - bind caller and callee slots with a compatible call class
//! - **Grouping** - organise modules into groups with derived interface slots
//! - **Consistency** - cascading deletes, empty-group sweeps, invariant audits
//! - **Persistence** - name-addressed project documents and edit commands
//!
//! ## Architecture
//!
//! ```text
//! CatalogDocument
//!     │
//!     ├──> Catalog (validated module/call stock)
//!     │
//!     └──> Graph
//!            ├─ Modules ── CallSlots (caller: one call, callee: fan-in)
//!            ├─ Calls ──── caller slot -> callee slot
//!            ├─ Groups ─── InterfaceSlots (derived from boundary calls)
//!            │
//!            ├──> Analysis (petgraph)
//!            │      ├─ Caller/callee modules
//!            │      └─ Dependency layers
//!            │
//!            └──> ProjectDocument / EditCommand (megamol-protocol)
//! ```

mod analysis;
mod catalog;
mod config;
mod connection;
mod edit;
mod error;
mod graph;
mod grouping;
mod id;
mod interface;
mod project;
mod slot;
mod types;

pub use analysis::{DependencyGraph, Violation};
pub use catalog::{CallIndex, Catalog};
pub use config::{GraphConfig, UncleanDeletionPolicy};
pub use edit::EditOutcome;
pub use error::{GraphError, Result};
pub use graph::Graph;
pub use id::{IdAllocator, Uid};
pub use slot::{compatible_call_index, shares_call_class, CallSlot};
pub use types::{Call, CallState, Group, InterfaceSlot, Module, Parameter};
