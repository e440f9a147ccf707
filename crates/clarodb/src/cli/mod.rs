//! Command-line interface: settings plus the `import` and `tables`
//! standalone commands. The `tui` command lives in `crate::tui`.

pub mod config;
pub mod import;
pub mod tables;
