//! Handler configuration.
//!
//! Handlers are parameterised by the kind of service they belong to. Some
//! fields only exist for one kind (log formatting is a VCL concept), and
//! some attributes only exist for one kind (packages are compute-only).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of edge service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// VCL-configured delivery service
    #[default]
    Vcl,
    /// Compute service running a WebAssembly package
    Wasm,
}

impl ServiceKind {
    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vcl => "vcl",
            Self::Wasm => "wasm",
        }
    }

    /// All service kinds
    pub fn all() -> &'static [ServiceKind] {
        &[ServiceKind::Vcl, ServiceKind::Wasm]
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vcl" => Ok(Self::Vcl),
            "wasm" | "compute" => Ok(Self::Wasm),
            other => Err(format!(
                "unknown service kind '{other}' (expected one of: vcl, wasm)"
            )),
        }
    }
}

/// Metadata shared by every handler of one service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// Kind of the service the handlers belong to
    #[serde(default)]
    pub kind: ServiceKind,
}

impl ServiceMetadata {
    /// Metadata for a service of the given kind
    pub fn new(kind: ServiceKind) -> Self {
        Self { kind }
    }

    /// Whether VCL-only fields are enabled
    pub fn is_vcl(&self) -> bool {
        self.kind == ServiceKind::Vcl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_kind_from_str() {
        assert_eq!("vcl".parse::<ServiceKind>(), Ok(ServiceKind::Vcl));
        assert_eq!("WASM".parse::<ServiceKind>(), Ok(ServiceKind::Wasm));
        assert_eq!("compute".parse::<ServiceKind>(), Ok(ServiceKind::Wasm));
        assert!("nginx".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn test_service_metadata_serde() {
        let meta: ServiceMetadata = serde_json::from_str(r#"{"kind":"wasm"}"#).unwrap();
        assert_eq!(meta, ServiceMetadata::new(ServiceKind::Wasm));
        assert!(!meta.is_vcl());

        let default: ServiceMetadata = serde_json::from_str("{}").unwrap();
        assert!(default.is_vcl());
    }

    #[test]
    fn test_service_kind_display_round_trips() {
        for kind in ServiceKind::all() {
            assert_eq!(kind.to_string().parse::<ServiceKind>(), Ok(*kind));
        }
    }
}
