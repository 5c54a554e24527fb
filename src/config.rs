//! Aggregated configuration, loadable from a TOML file and serializable
//! back out with every default filled in.

use crate::analysis::{MrdConfig, OverlapConfig, SearchConfig, TopXConfig, TrackingConfig};
use crate::sort::SorterConfig;
use crate::store::fs::FsStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: FsStoreConfig,
    #[serde(default)]
    pub sorter: SorterConfig,
    #[serde(default)]
    pub overlap: OverlapConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub topx: TopXConfig,
    #[serde(default)]
    pub mrd: MrdConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::ClonescanError::Config(format!("failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> crate::Result<()> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::ClonescanError::Config(format!("failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
