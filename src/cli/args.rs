//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::domain::NodePath;

/// Hierarchical field-schema editor: build nested configuration schemas from sections, groups and fields
#[derive(Parser, Debug)]
#[command(name = "fieldtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory for local config (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Nodes are addressed by sibling indices from the root, e.g. `0/2/1`.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a schema as tree, or list stored contexts
    Show {
        /// Schema context (e.g. a post type)
        context: Option<String>,
    },

    /// Check required properties and name uniqueness
    Validate { context: String },

    /// Add a field with template defaults
    Add {
        context: String,
        /// Field type, see `fieldtree types`
        field_type: String,
        /// Parent node (default: top level)
        #[arg(short, long)]
        parent: Option<NodePath>,
    },

    /// Set properties: key=<json> (plain text is taken as a string)
    Set {
        context: String,
        path: NodePath,
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Edit a node's properties as JSON in $EDITOR
    Edit { context: String, path: NodePath },

    /// Delete a node and everything below it
    Delete { context: String, path: NodePath },

    /// Copy a node and its subtree right after it
    Duplicate { context: String, path: NodePath },

    /// Swap a node with its previous sibling
    MoveUp { context: String, path: NodePath },

    /// Swap a node with its next sibling
    MoveDown { context: String, path: NodePath },

    /// Move a node like a drag and drop
    Move {
        context: String,
        path: NodePath,
        #[command(flatten)]
        target: MoveTarget,
    },

    /// Change a node's field type
    Retype {
        context: String,
        path: NodePath,
        field_type: String,
    },

    /// Replace a schema with a JSON file
    Import {
        context: String,
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Print a schema as JSON
    Export {
        context: String,
        /// Write to file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// List known field types
    Types,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Drop target of `move`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct MoveTarget {
    /// Drop onto a node: into an empty group/section, otherwise next to it
    #[arg(long)]
    pub onto: Option<NodePath>,

    /// Append as last child of a group/section
    #[arg(long)]
    pub into: Option<NodePath>,

    /// Append at top level
    #[arg(long)]
    pub root: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,

    /// Edit config file
    Edit {
        /// Edit global config
        #[arg(short, long)]
        global: bool,
    },
}
