//! fieldtree: edit hierarchical field schemas as a validated tree.
//!
//! - `domain`: node arena, containment rules, mutations, schema conversion, validation
//! - `application`: field-type templates and the editing session service
//! - `infrastructure`: filesystem, schema storage, external editor, DI
//! - `cli`: clap commands on top of the services

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
