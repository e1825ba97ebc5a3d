pub mod config;
pub mod context;
pub mod course_paths;
pub mod file_cleaner;
pub mod logging;
pub mod pacing;
