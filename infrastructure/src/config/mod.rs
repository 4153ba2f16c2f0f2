//! Configuration loading

mod file_config;
mod loader;

pub use file_config::{FileConfig, FileConsensusConfig, FileMemoryConfig, FileNodeConfig};
pub use loader::ConfigLoader;
