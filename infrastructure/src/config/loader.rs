//! Config discovery and merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::PathBuf;

/// Discovers config files and folds them over the built-in defaults
pub struct ConfigLoader;

impl ConfigLoader {
    /// Merge every discovered source, lowest priority first.
    ///
    /// Later merges win: built-in defaults, then the per-user file under
    /// the platform config directory, then `hive.toml` / `.hive.toml` in
    /// the working directory, then an explicitly passed path.
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        // An explicit path outranks everything discovered
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().map_err(Box::new)
    }

    /// Built-in defaults only, skipping file discovery (`--no-config`)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Where the per-user config lives: `hive-mind/config.toml` under the
    /// platform config directory (`~/.config` on Linux)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hive-mind").join("config.toml"))
    }

    /// First of `hive.toml` / `.hive.toml` present in the working directory
    pub fn project_config_path() -> Option<PathBuf> {
        for filename in &["hive.toml", ".hive.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Show which sources would be merged and which actually exist
    pub fn print_config_sources() {
        println!("Configuration sources (in priority order):");

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./hive.toml or ./.hive.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}
