pub mod plan;
pub mod schema;
pub mod validate;

use anyhow::{Context as AnyhowContext, Result, bail};
use edgeconf::{ServiceDefinition, ServiceKind, ServiceMetadata};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Declared document format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "Cannot tell the format of {} (expected .toml or .json)",
                path.display()
            ),
        }
    }
}

/// Parse a declared document into its attribute map
fn parse_document(content: &str, format: Format) -> Result<Map<String, Value>> {
    let value: Value = match format {
        Format::Toml => toml::from_str(content).context("Invalid TOML")?,
        Format::Json => serde_json::from_str(content).context("Invalid JSON")?,
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => bail!("A declaration must be a table of attributes"),
    }
}

/// Load a declared document from disk
pub fn load_document(path: &Path) -> Result<Map<String, Value>> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    log::debug!("Loaded {} as {format:?}", path.display());
    parse_document(&content, format).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Service definition for a kind
pub fn service(kind: ServiceKind) -> ServiceDefinition {
    ServiceDefinition::new(ServiceMetadata::new(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert!(Format::from_path(Path::new("a.yaml")).is_err());
    }

    #[test]
    fn test_parse_toml_document() {
        let doc = parse_document(
            r#"
[[acl]]
name = "blocklist"

[[logentries]]
name = "le"
token = "t"
port = 443
"#,
            Format::Toml,
        )
        .unwrap();

        assert_eq!(doc["acl"][0]["name"], "blocklist");
        assert_eq!(doc["logentries"][0]["port"], 443);
    }

    #[test]
    fn test_parse_rejects_non_table() {
        assert!(parse_document("[1, 2]", Format::Json).is_err());
        assert!(parse_document("null", Format::Json).unwrap().is_empty());
    }
}
