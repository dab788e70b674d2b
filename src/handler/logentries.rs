//! Logentries logging endpoint attribute
//!
//! The formatting fields (`format`, `format_version`, `response_condition`,
//! `placement`) only exist on VCL services. On compute services they are
//! left out of the schema and never reported on read.

use super::BlockSpec;
use crate::api::{ApiClient, CreateLogentriesInput, Logentries};
use crate::config::ServiceMetadata;
use crate::schema::{FieldDescriptor, Validation};
use declarative::{Keyed, RemoteResult, ServiceVersion, prune};
use serde::{Deserialize, Serialize};

/// Default Apache-style log line
pub const DEFAULT_FORMAT: &str = "%h %l %u %t %r %>s";

/// Default Logentries ingestion port
pub const DEFAULT_PORT: u32 = 20000;

/// Accepted logging format versions
pub const FORMAT_VERSIONS: &[i64] = &[1, 2];

/// Accepted placements for the generated logging call
pub const PLACEMENTS: &[&str] = &["none", "waf_debug"];

/// A declared Logentries endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogentriesBlock {
    pub name: String,
    pub token: String,
    #[serde(default = "default_port")]
    pub port: u32,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
}

fn default_port() -> u32 {
    DEFAULT_PORT
}

fn default_use_tls() -> bool {
    true
}

impl LogentriesBlock {
    /// A block with the given name and token and every other field defaulted
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            port: DEFAULT_PORT,
            use_tls: true,
            format: None,
            format_version: None,
            response_condition: None,
            placement: None,
        }
    }

    fn to_input(&self) -> CreateLogentriesInput {
        CreateLogentriesInput {
            name: self.name.clone(),
            port: self.port,
            use_tls: self.use_tls,
            token: self.token.clone(),
            format: self.format.clone(),
            format_version: self.format_version.filter(|v| *v != 0),
            response_condition: self.response_condition.clone(),
            placement: self.placement.clone(),
        }
    }
}

impl Keyed for LogentriesBlock {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }
}

pub struct LogentriesSpec;

impl BlockSpec for LogentriesSpec {
    const KEY: &'static str = "logentries";
    const KIND: &'static str = "Logentries";

    type Block = LogentriesBlock;
    type Entity = Logentries;

    fn fields(meta: &ServiceMetadata) -> Vec<FieldDescriptor> {
        let mut fields = vec![
            FieldDescriptor::string("name")
                .required()
                .describe("Unique name to refer to this logging setup"),
            FieldDescriptor::string("token")
                .required()
                .describe("Use token based authentication"),
            FieldDescriptor::int("port")
                .default_value(DEFAULT_PORT)
                .describe("The port number configured in Logentries"),
            FieldDescriptor::bool("use_tls")
                .default_value(true)
                .describe("Whether to use TLS for secure logging"),
        ];

        if meta.is_vcl() {
            fields.extend([
                FieldDescriptor::string("format")
                    .default_value(DEFAULT_FORMAT)
                    .describe("Apache-style string or VCL variables to use for log formatting"),
                FieldDescriptor::int("format_version")
                    .default_value(1)
                    .validate_with(Validation::OneOfInt(FORMAT_VERSIONS))
                    .describe("The version of the custom logging format. Can be either 1 or 2"),
                FieldDescriptor::string("response_condition")
                    .default_value("")
                    .describe("Name of a condition to apply this logging"),
                FieldDescriptor::string("placement")
                    .validate_with(Validation::OneOfStr(PLACEMENTS))
                    .describe("Where in the generated VCL the logging call should be placed"),
            ]);
        }

        fields
    }

    fn create(
        client: &dyn ApiClient,
        version: &ServiceVersion,
        block: &LogentriesBlock,
    ) -> RemoteResult<Logentries> {
        let input = block.to_input();
        log::debug!("Create Logentries opts: {input:?}");
        client.create_logentries(version, &input)
    }

    fn delete(client: &dyn ApiClient, version: &ServiceVersion, name: &String) -> RemoteResult<()> {
        client.delete_logentries(version, name)
    }

    fn list(client: &dyn ApiClient, version: &ServiceVersion) -> RemoteResult<Vec<Logentries>> {
        client.list_logentries(version)
    }

    fn normalize(entity: Logentries, meta: &ServiceMetadata) -> LogentriesBlock {
        let mut block = LogentriesBlock {
            name: entity.name,
            token: entity.token,
            port: entity.port,
            use_tls: entity.use_tls,
            format: None,
            format_version: None,
            response_condition: None,
            placement: None,
        };

        if meta.is_vcl() {
            block.format = prune(entity.format);
            block.format_version = Some(entity.format_version);
            block.response_condition = prune(entity.response_condition);
            block.placement = prune(entity.placement);
        }

        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiOp, MockClient};
    use crate::config::ServiceKind;
    use crate::handler::{Change, LogentriesHandler, ServiceAttribute};
    use crate::schema::SchemaError;
    use crate::state::{MemoryState, StateStore};
    use declarative::RemoteError;
    use serde_json::json;

    fn version() -> ServiceVersion {
        ServiceVersion::new("svc", 7)
    }

    fn vcl() -> LogentriesHandler {
        LogentriesHandler::new(ServiceMetadata::new(ServiceKind::Vcl))
    }

    fn wasm() -> LogentriesHandler {
        LogentriesHandler::new(ServiceMetadata::new(ServiceKind::Wasm))
    }

    #[test]
    fn test_vcl_decode_applies_defaults() {
        let value = json!([{ "name": "a", "token": "t" }]);
        let blocks = vcl().decode(Some(&value)).unwrap();

        assert_eq!(blocks[0].port, DEFAULT_PORT);
        assert!(blocks[0].use_tls);
        assert_eq!(blocks[0].format.as_deref(), Some(DEFAULT_FORMAT));
        assert_eq!(blocks[0].format_version, Some(1));
        assert_eq!(blocks[0].response_condition, None);
        assert_eq!(blocks[0].placement, None);
    }

    #[test]
    fn test_declared_empty_strings_decode_as_absent() {
        let value = json!([{
            "name": "a",
            "token": "t",
            "format": "",
            "response_condition": "",
            "placement": ""
        }]);
        let blocks = vcl().decode(Some(&value)).unwrap();

        assert_eq!(blocks[0].format, None);
        assert_eq!(blocks[0].response_condition, None);
        assert_eq!(blocks[0].placement, None);
    }

    #[test]
    fn test_recorded_decode_skips_defaults() {
        let value = json!([{ "name": "a", "token": "t", "port": 1, "use_tls": false }]);
        let blocks = vcl().decode_recorded(Some(&value)).unwrap();

        assert_eq!(blocks[0].format, None);
        assert_eq!(blocks[0].format_version, None);
        assert!(!blocks[0].use_tls);
    }

    #[test]
    fn test_read_back_matches_declaration() {
        let client = MockClient::new();
        let declared = json!([{ "name": "a", "token": "t" }]);
        vcl()
            .process(&Change::new(None, Some(&declared)), &version(), &client)
            .unwrap();

        let read_back = vcl().read_blocks(&version(), &client).unwrap();
        assert_eq!(read_back, vcl().decode(Some(&declared)).unwrap());

        let mut state = MemoryState::new();
        vcl().read(&version(), &client, &mut state).unwrap();
        let recorded = state.get("logentries").unwrap();
        assert_eq!(vcl().decode_recorded(Some(&recorded)).unwrap(), read_back);

        client.clear_calls();
        let summary = vcl()
            .process(&Change::new(Some(&recorded), Some(&declared)), &version(), &client)
            .unwrap();
        assert!(summary.is_noop());
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_wasm_schema_omits_vcl_fields() {
        let schema = wasm().schema();
        for field in ["format", "format_version", "response_condition", "placement"] {
            assert!(schema.field(field).is_none(), "{field} should be VCL only");
        }
        assert!(vcl().schema().field("format").is_some());

        let value = json!([{ "name": "a", "token": "t", "format": "%h" }]);
        assert!(matches!(
            wasm().decode(Some(&value)),
            Err(crate::handler::HandlerError::Decode {
                source: SchemaError::UnknownField { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_validators_reject_bad_values() {
        let bad_version = json!([{ "name": "a", "token": "t", "format_version": 3 }]);
        assert!(vcl().validate(Some(&bad_version)).is_err());

        let bad_placement = json!([{ "name": "a", "token": "t", "placement": "header" }]);
        assert!(vcl().validate(Some(&bad_placement)).is_err());

        let good = json!([{ "name": "a", "token": "t", "format_version": 2, "placement": "waf_debug" }]);
        assert!(vcl().validate(Some(&good)).is_ok());
    }

    #[test]
    fn test_create_sends_declared_fields() {
        let client = MockClient::new();
        let new = json!([{ "name": "a", "token": "t", "port": 1 }]);

        let summary = vcl()
            .process(&Change::new(None, Some(&new)), &version(), &client)
            .unwrap();

        assert_eq!(summary.created, 1);
        assert!(client.calls_of(ApiOp::DeleteLogentries).is_empty());

        let created = client.logentries(&version());
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "a");
        assert_eq!(created[0].port, 1);
        assert_eq!(created[0].format, DEFAULT_FORMAT);
    }

    #[test]
    fn test_changed_endpoint_is_replaced() {
        let client = MockClient::new();
        let old = json!([{ "name": "a", "token": "t", "port": 1 }]);
        let new = json!([{ "name": "a", "token": "t", "port": 2 }]);
        vcl()
            .process(&Change::new(None, Some(&old)), &version(), &client)
            .unwrap();
        client.clear_calls();

        vcl()
            .process(&Change::new(Some(&old), Some(&new)), &version(), &client)
            .unwrap();

        let ops: Vec<_> = client.calls().into_iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![ApiOp::DeleteLogentries, ApiOp::CreateLogentries]);
        assert_eq!(client.logentries(&version())[0].port, 2);
    }

    #[test]
    fn test_read_prunes_empty_strings() {
        let client = MockClient::new();
        client.seed_logentries(
            &version(),
            Logentries {
                name: "a".into(),
                port: 20000,
                use_tls: true,
                token: "t".into(),
                format_version: 2,
                ..Logentries::default()
            },
        );
        let mut state = MemoryState::new();

        vcl().read(&version(), &client, &mut state).unwrap();

        assert_eq!(
            state.get("logentries").unwrap(),
            json!([{
                "name": "a",
                "token": "t",
                "port": 20000,
                "use_tls": true,
                "format_version": 2
            }])
        );
    }

    #[test]
    fn test_wasm_read_omits_vcl_fields() {
        let client = MockClient::new();
        client.seed_logentries(
            &version(),
            Logentries {
                name: "a".into(),
                token: "t".into(),
                format: "%h".into(),
                format_version: 2,
                ..Logentries::default()
            },
        );

        let blocks = wasm().read_blocks(&version(), &client).unwrap();
        assert_eq!(blocks[0].format, None);
        assert_eq!(blocks[0].format_version, None);
    }

    #[test]
    fn test_read_failure_names_service_and_version() {
        let client = MockClient::new();
        client.fail(
            ApiOp::ListLogentries,
            None,
            RemoteError::from_status(503, "unavailable"),
        );
        let mut state = MemoryState::new();

        let err = vcl().read(&version(), &client, &mut state).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("svc"));
        assert!(message.contains('7'));
        assert!(state.get("logentries").is_none());
    }
}
