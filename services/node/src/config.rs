//! Node configuration loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Human-readable node name, also the default mining payload.
    pub name: String,
    /// Address the RPC listener binds to.
    pub rpc_addr: String,
    /// Directory holding the node database.
    pub data_dir: PathBuf,
    pub log: LogConfig,
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level when RUST_LOG is unset.
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Worker threads; zero means one.
    pub threads: usize,
    /// Difficulty new rounds start at unless the RPC call overrides it.
    pub difficulty: u64,
}

impl NodeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            name: "weft-node-001".to_string(),
            rpc_addr: "127.0.0.1:8573".to_string(),
            data_dir: PathBuf::from("./weft-data"),
            log: LogConfig {
                level: "info".to_string(),
                json: false,
            },
            miner: MinerConfig {
                threads: 2,
                difficulty: 1_000_000,
            },
        }
    }

    /// Renders the default config and writes it to `path`.
    pub fn write_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let config = Self::default_config();
        let rendered = toml::to_string_pretty(&config)?;
        std::fs::write(path, rendered)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_toml() {
        let config = NodeConfig::default_config();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.rpc_addr, config.rpc_addr);
        assert_eq!(parsed.miner.difficulty, config.miner.difficulty);
        assert_eq!(parsed.log.level, config.log.level);
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weft.toml");
        NodeConfig::write_default(&path).unwrap();
        let loaded = NodeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.name, "weft-node-001");
        assert_eq!(loaded.miner.threads, 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(NodeConfig::from_file("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "name = ").unwrap();
        assert!(NodeConfig::from_file(&path).is_err());
    }
}
