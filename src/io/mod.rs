//! Input/Output operations for SCF runs
//!
//! This module handles logging setup and the plain-text result tables.

mod output;

pub use output::{setup_output, write_dos_table, write_sweep_table};
