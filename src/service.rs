//! Service definitions: the ordered set of attribute handlers for one
//! service kind, driven as a unit by the orchestrator.

use crate::api::ApiClient;
use crate::config::{ServiceKind, ServiceMetadata};
use crate::handler::{
    AclHandler, Change, LogentriesHandler, PackageHandler, PlannedStep, ServiceAttribute,
};
use crate::schema::{Schema, SchemaError};
use crate::state::StateStore;
use anyhow::{Context, Result, bail};
use declarative::{ApplySummary, ServiceVersion};
use serde_json::{Map, Value};

/// Attribute handlers of one service kind, in processing order
#[derive(Debug)]
pub struct ServiceDefinition {
    metadata: ServiceMetadata,
    attributes: Vec<Box<dyn ServiceAttribute>>,
}

impl ServiceDefinition {
    /// Standard handler set for the given metadata
    pub fn new(metadata: ServiceMetadata) -> Self {
        let attributes: Vec<Box<dyn ServiceAttribute>> = match metadata.kind {
            ServiceKind::Vcl => vec![
                Box::new(AclHandler::new(metadata.clone())),
                Box::new(LogentriesHandler::new(metadata.clone())),
            ],
            ServiceKind::Wasm => vec![
                Box::new(PackageHandler::new()),
                Box::new(LogentriesHandler::new(metadata.clone())),
            ],
        };
        Self::with_attributes(metadata, attributes)
    }

    /// Definition with an explicit handler list
    pub fn with_attributes(
        metadata: ServiceMetadata,
        attributes: Vec<Box<dyn ServiceAttribute>>,
    ) -> Self {
        Self {
            metadata,
            attributes,
        }
    }

    pub fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    pub fn attributes(&self) -> impl Iterator<Item = &dyn ServiceAttribute> {
        self.attributes.iter().map(|a| &**a)
    }

    pub fn attribute(&self, key: &str) -> Option<&dyn ServiceAttribute> {
        self.attributes().find(|a| a.key() == key)
    }

    /// Register every handler's schema into the sink
    pub fn register_all(&self, schema: &mut Schema) -> Result<(), SchemaError> {
        for attribute in &self.attributes {
            attribute.register(schema)?;
        }
        Ok(())
    }

    /// Fresh schema holding every handler's attribute
    pub fn schema(&self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::new();
        self.register_all(&mut schema)?;
        Ok(schema)
    }

    /// Validate a whole declared document
    pub fn validate_all(&self, document: &Map<String, Value>) -> Result<()> {
        if let Some(unknown) = document.keys().find(|k| self.attribute(k).is_none()) {
            bail!(
                "unknown attribute '{unknown}' for a {} service",
                self.metadata.kind
            );
        }

        for attribute in &self.attributes {
            let key = attribute.key();
            attribute
                .validate(document.get(key))
                .with_context(|| format!("Invalid {key} declaration"))?;
        }
        Ok(())
    }

    /// Steps each changed attribute would run, without touching the remote
    pub fn preview_all(
        &self,
        old: &Map<String, Value>,
        new: &Map<String, Value>,
    ) -> Result<Vec<(&'static str, Vec<PlannedStep>)>> {
        let mut previews = Vec::new();
        for attribute in &self.attributes {
            let key = attribute.key();
            let change = Change::new(old.get(key), new.get(key));
            if !change.is_changed() {
                continue;
            }

            let steps = attribute
                .preview(&change)
                .with_context(|| format!("Error planning {key}"))?;
            previews.push((key, steps));
        }
        Ok(previews)
    }

    /// Reconcile every changed attribute against the draft version
    ///
    /// Handlers run in definition order; the first failure stops processing
    /// and is returned with the attribute key as context.
    pub fn process_all(
        &self,
        old: &Map<String, Value>,
        new: &Map<String, Value>,
        version: &ServiceVersion,
        client: &dyn ApiClient,
    ) -> Result<ApplySummary> {
        let mut summary = ApplySummary::default();

        for attribute in &self.attributes {
            let key = attribute.key();
            let change = Change::new(old.get(key), new.get(key));
            if !change.is_changed() {
                log::debug!("{key}: no declared change");
                continue;
            }

            let result = attribute
                .process(&change, version, client)
                .with_context(|| {
                    format!("Error processing {key} for service {}", version.service_id)
                })?;
            summary.merge(&result);
        }

        log::info!("Processed {version}: {summary}");
        Ok(summary)
    }

    /// Read every attribute of the active version into the state sink
    pub fn read_all(
        &self,
        version: &ServiceVersion,
        client: &dyn ApiClient,
        state: &mut dyn StateStore,
    ) -> Result<()> {
        for attribute in &self.attributes {
            let key = attribute.key();
            attribute
                .read(version, client, state)
                .with_context(|| format!("Error refreshing {key} for service {}", version.service_id))?;
        }
        Ok(())
    }
}
