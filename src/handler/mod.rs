//! Attribute handlers for edge service sub-resources
//!
//! Every nested attribute of a service (ACLs, logging endpoints, the
//! deployment package) is modeled as a [`ServiceAttribute`] with:
//! - Schema registration (the field descriptor table)
//! - Process (reconcile the declared old/new values against the draft version)
//! - Read (normalize the remote state of the active version into the state sink)

pub mod acl;
pub mod logentries;
pub mod package;

pub use acl::{AclBlock, AclSpec};
pub use logentries::{LogentriesBlock, LogentriesSpec};
pub use package::{PackageBlock, PackageHandler};

use crate::api::ApiClient;
use crate::config::ServiceMetadata;
use crate::schema::{AttributeSchema, FieldDescriptor, Schema, SchemaError};
use crate::state::StateStore;
use declarative::{
    ApplySummary, ErrorCategory, Keyed, LogProgress, Phase, Plan, Remote,
    RemoteError, RemoteResult, ServiceVersion,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Acl attribute handler
pub type AclHandler = BlockSetHandler<AclSpec>;

/// Logentries attribute handler
pub type LogentriesHandler = BlockSetHandler<LogentriesSpec>;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by attribute handlers
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid '{key}' declaration: {source}")]
    Decode {
        key: &'static str,
        #[source]
        source: SchemaError,
    },

    #[error(transparent)]
    Reconcile(#[from] declarative::Error),

    #[error("failed to read {kind} for service {service_id}, version {version}: {source}")]
    Read {
        kind: &'static str,
        service_id: String,
        version: u32,
        #[source]
        source: RemoteError,
    },

    #[error("failed to encode '{key}' state: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl HandlerError {
    /// Wrap a failed remote read
    pub fn read(kind: &'static str, version: &ServiceVersion, source: RemoteError) -> Self {
        Self::Read {
            kind,
            service_id: version.service_id.clone(),
            version: version.number,
            source,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Reconcile(err) => err.category(),
            Self::Read { source, .. } => source.category(),
            Self::Decode { .. } | Self::Encode { .. } => ErrorCategory::Other,
        }
    }
}

// ============================================================================
// Attribute Contract
// ============================================================================

/// Previous and next declared value of one attribute
#[derive(Debug, Clone, Copy, Default)]
pub struct Change<'a> {
    pub old: Option<&'a Value>,
    pub new: Option<&'a Value>,
}

impl<'a> Change<'a> {
    pub fn new(old: Option<&'a Value>, new: Option<&'a Value>) -> Self {
        Self { old, new }
    }

    /// Whether the declared value changed at all
    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

/// One remote mutation a process call would perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub phase: Phase,
    pub key: String,
}

impl fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::Remove => write!(f, "- {}", self.key),
            Phase::Create => write!(f, "+ {}", self.key),
        }
    }
}

/// A nested attribute of a service definition
pub trait ServiceAttribute: fmt::Debug {
    /// Attribute key in the declared document (e.g. "acl")
    fn key(&self) -> &'static str;

    /// Field descriptor table for this attribute
    fn schema(&self) -> AttributeSchema;

    /// Register this attribute's schema into the sink
    fn register(&self, schema: &mut Schema) -> Result<(), SchemaError> {
        schema.register(self.schema())
    }

    /// Validate a declared value without touching the remote
    fn validate(&self, value: Option<&Value>) -> Result<(), HandlerError> {
        self.schema()
            .validate(value)
            .map_err(|source| HandlerError::Decode {
                key: self.key(),
                source,
            })
    }

    /// Steps [`process`](Self::process) would run for a change, in order
    fn preview(&self, change: &Change<'_>) -> Result<Vec<PlannedStep>, HandlerError>;

    /// Reconcile the remote draft version with a declared change
    fn process(
        &self,
        change: &Change<'_>,
        version: &ServiceVersion,
        client: &dyn ApiClient,
    ) -> Result<ApplySummary, HandlerError>;

    /// Read the remote state of a version into the state sink
    ///
    /// A failure to store into the sink is logged and does not fail the read.
    fn read(
        &self,
        version: &ServiceVersion,
        client: &dyn ApiClient,
        state: &mut dyn StateStore,
    ) -> Result<(), HandlerError>;
}

/// Store a read result, logging instead of failing when the sink refuses it
pub(crate) fn store<T: Serialize>(
    state: &mut dyn StateStore,
    key: &'static str,
    value: &T,
) -> Result<(), HandlerError> {
    let value = serde_json::to_value(value).map_err(|source| HandlerError::Encode { key, source })?;
    if let Err(err) = state.set(key, value) {
        log::warn!("Error setting {key}: {err}");
    }
    Ok(())
}

// ============================================================================
// Keyed Block Sets
// ============================================================================

/// Per-kind description of a set of keyed blocks
pub trait BlockSpec {
    /// Attribute key in the declared document
    const KEY: &'static str;

    /// Kind label for logs and errors
    const KIND: &'static str;

    /// Declared block
    type Block: Keyed + Serialize + DeserializeOwned;

    /// Remote entity
    type Entity;

    /// Field table, which may depend on the service kind
    fn fields(meta: &ServiceMetadata) -> Vec<FieldDescriptor>;

    fn create(
        client: &dyn ApiClient,
        version: &ServiceVersion,
        block: &Self::Block,
    ) -> RemoteResult<Self::Entity>;

    fn delete(
        client: &dyn ApiClient,
        version: &ServiceVersion,
        key: &<Self::Block as Keyed>::Key,
    ) -> RemoteResult<()>;

    fn list(client: &dyn ApiClient, version: &ServiceVersion) -> RemoteResult<Vec<Self::Entity>>;

    /// Map a remote entity back into the declared shape
    fn normalize(entity: Self::Entity, meta: &ServiceMetadata) -> Self::Block;
}

/// Adapts a [`BlockSpec`] and a client into a [`Remote`]
pub struct SpecRemote<'a, S> {
    client: &'a dyn ApiClient,
    _spec: PhantomData<fn() -> S>,
}

impl<'a, S> SpecRemote<'a, S> {
    pub fn new(client: &'a dyn ApiClient) -> Self {
        Self {
            client,
            _spec: PhantomData,
        }
    }
}

impl<S: BlockSpec> Remote<S::Block> for SpecRemote<'_, S> {
    type Entity = S::Entity;

    fn kind(&self) -> &'static str {
        S::KIND
    }

    fn create(&self, version: &ServiceVersion, block: &S::Block) -> RemoteResult<S::Entity> {
        S::create(self.client, version, block)
    }

    fn delete(
        &self,
        version: &ServiceVersion,
        key: &<S::Block as Keyed>::Key,
    ) -> RemoteResult<()> {
        S::delete(self.client, version, key)
    }

    fn list(&self, version: &ServiceVersion) -> RemoteResult<Vec<S::Entity>> {
        S::list(self.client, version)
    }
}

/// Handler for any attribute that is a set of keyed blocks
pub struct BlockSetHandler<S> {
    meta: ServiceMetadata,
    _spec: PhantomData<fn() -> S>,
}

impl<S> fmt::Debug for BlockSetHandler<S>
where
    S: BlockSpec,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockSetHandler")
            .field("key", &S::KEY)
            .field("meta", &self.meta)
            .finish()
    }
}

impl<S: BlockSpec> BlockSetHandler<S> {
    pub fn new(meta: ServiceMetadata) -> Self {
        Self {
            meta,
            _spec: PhantomData,
        }
    }

    pub fn metadata(&self) -> &ServiceMetadata {
        &self.meta
    }

    /// Decode a declared value into typed blocks
    pub fn decode(&self, value: Option<&Value>) -> Result<Vec<S::Block>, HandlerError> {
        self.schema()
            .decode(value)
            .map_err(|source| HandlerError::Decode {
                key: S::KEY,
                source,
            })
    }

    /// Decode a value stored by a previous read
    pub fn decode_recorded(&self, value: Option<&Value>) -> Result<Vec<S::Block>, HandlerError> {
        self.schema()
            .decode_recorded(value)
            .map_err(|source| HandlerError::Decode {
                key: S::KEY,
                source,
            })
    }

    /// Build the plan for a change from recorded state to a declaration
    pub fn plan(&self, change: &Change<'_>) -> Result<Plan<S::Block>, HandlerError> {
        let old = self.decode_recorded(change.old)?;
        let new = self.decode(change.new)?;
        Ok(Plan::from_diff(declarative::diff(
            Some(old.as_slice()),
            Some(new.as_slice()),
        )))
    }

    /// Reconcile typed blocks against a version
    ///
    /// `None` on either side is treated as an empty collection.
    pub fn reconcile(
        &self,
        old: Option<&[S::Block]>,
        new: Option<&[S::Block]>,
        version: &ServiceVersion,
        client: &dyn ApiClient,
    ) -> Result<ApplySummary, HandlerError> {
        let plan = Plan::from_diff(declarative::diff(old, new));
        self.apply(&plan, version, client)
    }

    fn apply(
        &self,
        plan: &Plan<S::Block>,
        version: &ServiceVersion,
        client: &dyn ApiClient,
    ) -> Result<ApplySummary, HandlerError> {
        let remote = SpecRemote::<S>::new(client);
        let summary = declarative::apply(&remote, version, plan, &mut LogProgress)?;
        Ok(summary)
    }

    /// List and normalize the blocks currently on a version
    pub fn read_blocks(
        &self,
        version: &ServiceVersion,
        client: &dyn ApiClient,
    ) -> Result<Vec<S::Block>, HandlerError> {
        let entities = SpecRemote::<S>::new(client)
            .list(version)
            .map_err(|source| HandlerError::read(S::KIND, version, source))?;
        log::debug!("{}: read {} entities from {version}", S::KIND, entities.len());

        Ok(declarative::normalize_with(entities, |e| {
            S::normalize(e, &self.meta)
        }))
    }
}

impl<S: BlockSpec> ServiceAttribute for BlockSetHandler<S> {
    fn key(&self) -> &'static str {
        S::KEY
    }

    fn schema(&self) -> AttributeSchema {
        AttributeSchema::set(S::KEY, S::fields(&self.meta))
    }

    fn preview(&self, change: &Change<'_>) -> Result<Vec<PlannedStep>, HandlerError> {
        Ok(self
            .plan(change)?
            .steps()
            .iter()
            .map(|step| PlannedStep {
                phase: step.phase(),
                key: step.key().to_string(),
            })
            .collect())
    }

    fn process(
        &self,
        change: &Change<'_>,
        version: &ServiceVersion,
        client: &dyn ApiClient,
    ) -> Result<ApplySummary, HandlerError> {
        let plan = self.plan(change)?;
        self.apply(&plan, version, client)
    }

    fn read(
        &self,
        version: &ServiceVersion,
        client: &dyn ApiClient,
        state: &mut dyn StateStore,
    ) -> Result<(), HandlerError> {
        let blocks = self.read_blocks(version, client)?;
        store(state, S::KEY, &blocks)
    }
}
