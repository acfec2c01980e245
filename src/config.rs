//! Engine settings, loadable from YAML or JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::{err_ctx, err_io, YantraResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Encoding in force where no token overrides it.
    pub encoding: Encoding,
    /// Report every token attempt through `tracing`.
    pub trace: bool,
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> YantraResult<Self> {
        serde_yaml::from_str(text).map_err(|error| {
            err_ctx!(Config, format!("invalid YAML configuration: {error}"), HELP)
        })
    }

    pub fn from_json_str(text: &str) -> YantraResult<Self> {
        serde_json::from_str(text).map_err(|error| {
            err_ctx!(Config, format!("invalid JSON configuration: {error}"), HELP)
        })
    }

    /// Reads a configuration file; `.json` files are JSON, anything else YAML.
    pub fn load(path: impl AsRef<Path>) -> YantraResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|cause| err_io!(format!("cannot read {}", path.display()), cause))?;
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }
}

const HELP: &str = "known keys are `encoding` (sign, charset, byte_order) and `trace`";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{ByteOrder, Sign};

    #[test]
    fn test_yaml_partial_config() {
        let config = EngineConfig::from_yaml_str("encoding:\n  byte_order: little_endian\n").unwrap();
        assert_eq!(config.encoding.byte_order, ByteOrder::LittleEndian);
        assert_eq!(config.encoding.sign, Sign::Unsigned);
        assert!(!config.trace);
    }

    #[test]
    fn test_json_config() {
        let config = EngineConfig::from_json_str(r#"{"trace": true}"#).unwrap();
        assert!(config.trace);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let error = EngineConfig::from_yaml_str("colour: blue\n").unwrap_err();
        assert_eq!(error.error_type(), crate::diagnostics::ErrorType::Config);
    }
}
