//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (SchemaRepository, FileSystem)
//! but are themselves concrete structs, not traits.

mod editor;

pub use editor::{EditorOptions, EditorService};
