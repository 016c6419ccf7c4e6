//! Validation modules

pub mod file_name;

pub use file_name::sanitize_file_name;
