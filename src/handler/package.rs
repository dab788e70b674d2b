//! Deployment package attribute of compute services
//!
//! A service version holds exactly one package. Uploading a new archive
//! replaces it, so there is no delete step. The server never reports the
//! local filename back; read re-injects it from the last recorded state.

use super::{Change, HandlerError, PlannedStep, ServiceAttribute, store};
use crate::api::{ApiClient, Package, UpdatePackageInput};
use crate::schema::{AttributeSchema, FieldDescriptor, SchemaError};
use crate::state::StateStore;
use declarative::{
    ApplyResult, ApplySummary, Keyed, Operation, Phase, ServiceVersion, prune_empty_strings,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const KEY: &str = "package";
const KIND: &str = "package";

/// The declared deployment package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageBlock {
    pub filename: String,
    /// SHA-512 of the archive, used to trigger re-uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code_hash: Option<String>,
}

impl Keyed for PackageBlock {
    type Key = String;

    fn key(&self) -> String {
        self.filename.clone()
    }
}

/// Handler for the `package` attribute
#[derive(Debug, Clone, Default)]
pub struct PackageHandler;

impl PackageHandler {
    pub fn new() -> Self {
        Self
    }

    fn decode(&self, value: Option<&Value>) -> Result<Option<PackageBlock>, HandlerError> {
        let blocks: Vec<PackageBlock> = self
            .schema()
            .decode(value)
            .map_err(|source| HandlerError::Decode { key: KEY, source })?;
        Ok(blocks.into_iter().next())
    }

    /// The previously uploaded package, if the recorded state names one
    ///
    /// A read without a recorded filename stores a block holding only the
    /// hash. That block describes no local archive, so it counts as absent.
    fn decode_recorded(&self, value: Option<&Value>) -> Result<Option<PackageBlock>, HandlerError> {
        if recorded_filename(value).is_empty() {
            return Ok(None);
        }
        let blocks: Vec<PackageBlock> = self
            .schema()
            .decode_recorded(value)
            .map_err(|source| HandlerError::Decode { key: KEY, source })?;
        Ok(blocks.into_iter().next())
    }

    /// The block to upload, or `None` when the declaration is unchanged
    ///
    /// A declaration without a hash inherits the previous hash when the
    /// filename is the same, so only a filename or hash change re-uploads.
    fn pending(&self, change: &Change<'_>) -> Result<Option<PackageBlock>, HandlerError> {
        let old = self.decode_recorded(change.old)?;
        let Some(mut new) = self.decode(change.new)? else {
            return Err(HandlerError::Decode {
                key: KEY,
                source: SchemaError::MissingAttribute(KEY.to_string()),
            });
        };

        if let Some(old) = &old
            && new.source_code_hash.is_none()
            && new.filename == old.filename
        {
            new.source_code_hash = old.source_code_hash.clone();
        }

        if old.as_ref() == Some(&new) {
            return Ok(None);
        }
        Ok(Some(new))
    }

    fn flatten(package: Package, filename: String) -> Value {
        let mut block = Map::new();
        block.insert("filename".to_string(), Value::String(filename));
        block.insert(
            "source_code_hash".to_string(),
            Value::String(package.metadata.hash_sum),
        );
        prune_empty_strings(&mut block);
        Value::Array(vec![Value::Object(block)])
    }
}

/// Filename held by a recorded package value, empty when there is none
fn recorded_filename(value: Option<&Value>) -> String {
    value
        .and_then(|v| v.get(0))
        .and_then(|b| b.get("filename"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl ServiceAttribute for PackageHandler {
    fn key(&self) -> &'static str {
        KEY
    }

    fn schema(&self) -> AttributeSchema {
        AttributeSchema::single(
            KEY,
            vec![
                FieldDescriptor::string("filename")
                    .required()
                    .describe("The path to the Wasm deployment package within your local filesystem"),
                FieldDescriptor::string("source_code_hash")
                    .optional_computed()
                    .describe("SHA-512 hash of the package file, used to trigger updates"),
            ],
        )
    }

    fn preview(&self, change: &Change<'_>) -> Result<Vec<PlannedStep>, HandlerError> {
        Ok(self
            .pending(change)?
            .map(|block| PlannedStep {
                phase: Phase::Create,
                key: block.key(),
            })
            .into_iter()
            .collect())
    }

    fn process(
        &self,
        change: &Change<'_>,
        version: &ServiceVersion,
        client: &dyn ApiClient,
    ) -> Result<ApplySummary, HandlerError> {
        let mut summary = ApplySummary::default();
        let Some(block) = self.pending(change)? else {
            log::debug!("{KIND}: unchanged on {version}");
            return Ok(summary);
        };

        let input = UpdatePackageInput {
            package_path: block.filename.clone(),
        };
        log::debug!("Update package opts: {input:?}");

        let package = client.update_package(version, &input).map_err(|source| {
            declarative::Error::remote(KIND, Operation::Update, version, Some(block.key()), source)
        })?;

        log::info!(
            "{KIND}: uploaded {} to {version} (hash {})",
            block.filename,
            if package.metadata.hash_sum.is_empty() {
                "unknown"
            } else {
                package.metadata.hash_sum.as_str()
            }
        );
        summary.add_result(&ApplyResult::Created);
        Ok(summary)
    }

    fn read(
        &self,
        version: &ServiceVersion,
        client: &dyn ApiClient,
        state: &mut dyn StateStore,
    ) -> Result<(), HandlerError> {
        log::debug!("Refreshing package for {version}");
        let package = client
            .get_package(version)
            .map_err(|source| HandlerError::read(KIND, version, source))?;

        let filename = recorded_filename(state.get(KEY).as_ref());
        store(state, KEY, &Self::flatten(package, filename))
    }
}
