//! Remote control-plane API surface
//!
//! Entity and input types mirror what the control plane returns and
//! accepts. Unset string fields come back as empty strings and unset
//! numbers as zero; normalization is responsible for telling those apart
//! from real values.
//!
//! The transport is not part of this crate. Anything implementing
//! [`ApiClient`] can be plugged in; [`crate::client::MockClient`] is the
//! in-memory implementation used by tests and offline tooling.

use declarative::{RemoteResult, ServiceVersion};
use serde::{Deserialize, Serialize};

/// An access control list attached to a service version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// Server-assigned identifier
    pub id: String,
    /// Unique name within the service version
    pub name: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_version: u32,
}

/// Input for creating an ACL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAclInput {
    pub name: String,
}

/// A Logentries logging endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logentries {
    pub name: String,
    pub port: u32,
    pub use_tls: bool,
    pub token: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub format_version: u32,
    #[serde(default)]
    pub response_condition: String,
    #[serde(default)]
    pub placement: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_version: u32,
}

/// Input for creating a Logentries endpoint
///
/// `None` leaves the field to the server default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateLogentriesInput {
    pub name: String,
    pub port: u32,
    pub use_tls: bool,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
}

/// A deployment package for a compute service version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_version: u32,
    #[serde(default)]
    pub metadata: PackageMetadata,
}

/// Metadata the server extracts from an uploaded package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    /// SHA-512 of the uploaded archive
    #[serde(default)]
    pub hash_sum: String,
    #[serde(default)]
    pub size: u64,
}

/// Input for uploading a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePackageInput {
    /// Local path of the package archive
    pub package_path: String,
}

/// Control-plane client capability
///
/// Every call is scoped to one service version. Delete and get calls on an
/// entity that does not exist must fail with
/// [`RemoteError::NotFound`](declarative::RemoteError::NotFound).
pub trait ApiClient {
    fn create_acl(&self, version: &ServiceVersion, input: &CreateAclInput) -> RemoteResult<Acl>;
    fn delete_acl(&self, version: &ServiceVersion, name: &str) -> RemoteResult<()>;
    fn list_acls(&self, version: &ServiceVersion) -> RemoteResult<Vec<Acl>>;

    fn create_logentries(
        &self,
        version: &ServiceVersion,
        input: &CreateLogentriesInput,
    ) -> RemoteResult<Logentries>;
    fn delete_logentries(&self, version: &ServiceVersion, name: &str) -> RemoteResult<()>;
    fn list_logentries(&self, version: &ServiceVersion) -> RemoteResult<Vec<Logentries>>;

    fn get_package(&self, version: &ServiceVersion) -> RemoteResult<Package>;
    fn update_package(
        &self,
        version: &ServiceVersion,
        input: &UpdatePackageInput,
    ) -> RemoteResult<Package>;
}
