//! Domain layer: the field tree and its editing rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod error;
pub mod mutator;
pub mod node;
pub mod path;
pub mod render;
pub mod reorder;
pub mod rules;
pub mod schema;
pub mod store;
pub mod validator;

pub use error::{DomainError, DomainResult};
pub use mutator::{CopyNaming, Direction, DropTarget, Placement, TreeMutator};
pub use node::{FieldKind, MoveAnimation, Node, NodeId, PropertyKeys};
pub use path::NodePath;
pub use render::TreeRender;
pub use reorder::{PendingMove, ReorderQueue};
pub use rules::{ContainmentRules, StructuralViolation, ViolationKind};
pub use schema::{LoadOutcome, MalformedInput, SchemaTransformer, SkippedEntry};
pub use store::NodeStore;
pub use validator::{RequiredProperties, TreeValidator, ValidationIssue, ValidationReport};
