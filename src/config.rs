//! Data source descriptor files
//!
//! A data source is described by one YAML or JSON document holding a
//! [`DataSourceInfo`]. The format follows the file extension; anything that
//! is not `.json` is read as YAML.

use crate::error::{Error, Result};
use crate::model::DataSourceInfo;
use std::fs;
use std::path::Path;

/// Document format of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

impl Format {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// Load and validate a data source descriptor file
pub fn load_data_source(path: impl AsRef<Path>) -> Result<DataSourceInfo> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!("Data source file '{}' not found", path.display()))
        } else {
            Error::config(format!(
                "Failed to read data source file '{}': {e}",
                path.display()
            ))
        }
    })?;
    load_data_source_from_str(&content, Format::from_path(path))
}

/// Parse and validate a data source descriptor
pub fn load_data_source_from_str(content: &str, format: Format) -> Result<DataSourceInfo> {
    let data_source: DataSourceInfo = match format {
        Format::Yaml => serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse data source YAML: {e}")))?,
        Format::Json => serde_json::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse data source JSON: {e}")))?,
    };

    validate_data_source(&data_source)?;
    Ok(data_source)
}

/// Check the fields every backend relies on
pub fn validate_data_source(data_source: &DataSourceInfo) -> Result<()> {
    if data_source.name.trim().is_empty() {
        return Err(Error::config("Data source name cannot be empty"));
    }

    if data_source.data_source_type.trim().is_empty() {
        return Err(Error::config(format!(
            "Data source '{}' has no type",
            data_source.name
        )));
    }

    if data_source.data_source_type != data_source.data_source_type.trim() {
        return Err(Error::config(format!(
            "Data source '{}' type '{}' has surrounding whitespace",
            data_source.name, data_source.data_source_type
        )));
    }

    data_source.validate_remote()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use test_case::test_case;

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
id: 4
type: duckdb
name: sales
database: /data/sales.duckdb
"#;

        let ds = load_data_source_from_str(yaml, Format::Yaml).unwrap();
        assert_eq!(ds.id, 4);
        assert_eq!(ds.data_source_type, "duckdb");
        assert_eq!(ds.database, "/data/sales.duckdb");
        assert!(!ds.remote);
        assert_eq!(ds.ssh_port, crate::model::DEFAULT_SSH_PORT);
    }

    #[test]
    fn test_parse_remote_json() {
        let json = r#"{
            "id": 9,
            "type": "postgresql",
            "name": "warehouse",
            "server": "db.internal",
            "port": 5432,
            "remote": true,
            "gateway": "bastion.example.com",
            "sshPort": 2222,
            "sshUser": "ops",
            "connectionProperties": {"schema": "public"}
        }"#;

        let ds = load_data_source_from_str(json, Format::Json).unwrap();
        assert!(ds.remote);
        assert_eq!(ds.gateway, "bastion.example.com");
        assert_eq!(ds.ssh_port, 2222);
        assert_eq!(ds.ssh_user, "ops");
        assert_eq!(ds.connection_properties["schema"], "public");
    }

    #[test_case("id: 1\ntype: duckdb\nname: ''\n" ; "empty name")]
    #[test_case("id: 1\ntype: ''\nname: x\n" ; "empty type")]
    #[test_case("id: 1\ntype: ' mysql'\nname: x\n" ; "padded type")]
    #[test_case("id: 1\ntype: mysql\nname: x\nremote: true\n" ; "remote without gateway")]
    #[test_case("type: mysql\nname: x\n" ; "missing id")]
    fn test_invalid_descriptor(yaml: &str) {
        let err = load_data_source_from_str(yaml, Format::Yaml).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test_case("ds.json", Format::Json)]
    #[test_case("ds.JSON", Format::Json)]
    #[test_case("ds.yaml", Format::Yaml)]
    #[test_case("ds.yml", Format::Yaml)]
    #[test_case("ds", Format::Yaml)]
    fn test_format_from_path(path: &str, expected: Format) {
        assert_eq!(Format::from_path(&PathBuf::from(path)), expected);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, r#"{"id": 1, "type": "memory", "name": "g", "database": "social"}"#).unwrap();

        let ds = load_data_source(&path).unwrap();
        assert_eq!(ds.database, "social");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_data_source(dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("not found"));
    }
}
