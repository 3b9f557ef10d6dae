//! INI file configuration adapter.

use crate::domain::error::PortsimError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
    /// Directory that relative paths in the file are resolved against.
    base_dir: PathBuf,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PortsimError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| PortsimError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self { config, base_dir })
    }

    pub fn from_string(content: &str) -> Result<Self, PortsimError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| PortsimError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self {
            config,
            base_dir: PathBuf::new(),
        })
    }

    /// Resolve a path-valued key relative to the config file's directory.
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_string(section, key)
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.base_dir.join(s.trim()))
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[data]
prices = prices.csv

[allocation]
targets = Stocks=60,Bonds=40

[portfolios]
num_portfolios = 250
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "prices"),
            Some("prices.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("allocation", "targets"),
            Some("Stocks=60,Bonds=40".to_string())
        );
        assert_eq!(
            adapter.get_string("portfolios", "num_portfolios"),
            Some("250".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[data]\nprices = p.csv\n").unwrap();
        assert_eq!(adapter.get_string("data", "assets"), None);
        assert_eq!(adapter.get_string("report", "top"), None);
    }

    #[test]
    fn require_string_rejects_missing_and_blank() {
        let adapter = FileConfigAdapter::from_string("[allocation]\nregime =\n").unwrap();
        let err = adapter.require_string("allocation", "regime").unwrap_err();
        assert!(matches!(err, PortsimError::ConfigMissing { key, .. } if key == "regime"));
        let err = adapter.require_string("allocation", "strategy").unwrap_err();
        assert!(matches!(err, PortsimError::ConfigMissing { key, .. } if key == "strategy"));
    }

    #[test]
    fn from_file_resolves_paths_relative_to_config() {
        let file = create_temp_config("[data]\nprices = inputs/prices.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        let expected = file.path().parent().unwrap().join("inputs/prices.csv");
        assert_eq!(adapter.get_path("data", "prices"), Some(expected));
        assert_eq!(adapter.get_path("data", "assets"), None);
    }

    #[test]
    fn from_file_returns_parse_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/portsim.ini").unwrap_err();
        assert!(matches!(err, PortsimError::ConfigParse { file, .. } if file.contains("portsim.ini")));
    }
}
