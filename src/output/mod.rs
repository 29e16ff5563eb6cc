//! Output formatting for subnet data.
//!
//! This module turns trees into consumable rows and prints them:
//! - [`table`] - per-leaf row facts (range, usable range, host count, type)
//! - [`terminal`] - terminal output with colors

mod table;
mod terminal;

pub use table::{build_rows, parent_row, SubnetRow};
pub use terminal::{format_field, print_outcome, print_table};
