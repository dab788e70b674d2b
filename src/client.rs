//! In-memory control-plane client.
//!
//! [`MockClient`] keeps per-version entity lists in memory, enforces name
//! uniqueness the way the real API does, journals every call and can be
//! told to fail specific operations. Clones share the same state, so a test
//! can hand one clone to the code under test and inspect another.
//!
//! # Example
//!
//! ```
//! use edgeconf::client::{ApiOp, MockClient};
//! use edgeconf::api::{ApiClient, CreateAclInput};
//! use declarative::{RemoteError, ServiceVersion};
//!
//! let client = MockClient::new();
//! let version = ServiceVersion::new("svc", 1);
//!
//! client
//!     .create_acl(&version, &CreateAclInput { name: "blocklist".into() })
//!     .unwrap();
//! assert_eq!(client.acls(&version).len(), 1);
//!
//! client.fail(ApiOp::DeleteAcl, Some("blocklist"), RemoteError::from_status(500, "boom"));
//! assert!(client.delete_acl(&version, "blocklist").is_err());
//! ```

use crate::api::{
    Acl, ApiClient, CreateAclInput, CreateLogentriesInput, Logentries, Package, PackageMetadata,
    UpdatePackageInput,
};
use declarative::{RemoteError, RemoteResult, ServiceVersion};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// API operation, used to journal calls and target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOp {
    CreateAcl,
    DeleteAcl,
    ListAcls,
    CreateLogentries,
    DeleteLogentries,
    ListLogentries,
    GetPackage,
    UpdatePackage,
}

/// One journaled API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: ApiOp,
    pub version: u32,
    /// Entity name or package path, when the call addresses one
    pub target: Option<String>,
}

impl Call {
    fn new(op: ApiOp, version: &ServiceVersion, target: Option<&str>) -> Self {
        Self {
            op,
            version: version.number,
            target: target.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
struct Fault {
    op: ApiOp,
    target: Option<String>,
    error: RemoteError,
}

impl Fault {
    fn matches(&self, call: &Call) -> bool {
        self.op == call.op && (self.target.is_none() || self.target == call.target)
    }
}

#[derive(Debug, Clone, Default)]
struct VersionData {
    acls: Vec<Acl>,
    logentries: Vec<Logentries>,
    package: Option<Package>,
}

#[derive(Debug, Default)]
struct Inner {
    versions: HashMap<ServiceVersion, VersionData>,
    calls: Vec<Call>,
    faults: Vec<Fault>,
    package_hashes: HashMap<String, String>,
    next_id: u64,
}

impl Inner {
    /// Journal a call and return the injected failure for it, if any
    fn record(&mut self, call: Call) -> RemoteResult<()> {
        let fault = self.faults.iter().find(|f| f.matches(&call)).cloned();
        self.calls.push(call);
        match fault {
            Some(f) => Err(f.error),
            None => Ok(()),
        }
    }

    fn version_mut(&mut self, version: &ServiceVersion) -> &mut VersionData {
        self.versions.entry(version.clone()).or_default()
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:022x}", self.next_id)
    }
}

/// In-memory client for tests and offline use
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    inner: Arc<Mutex<Inner>>,
}

impl MockClient {
    /// Create a new empty mock client.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every matching call fail with `error` until cleared.
    ///
    /// With `target` set, only calls addressing that entity name (or package
    /// path) fail.
    pub fn fail(&self, op: ApiOp, target: Option<&str>, error: RemoteError) {
        self.lock().faults.push(Fault {
            op,
            target: target.map(str::to_string),
            error,
        });
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        self.lock().faults.clear();
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Journaled calls of one operation.
    pub fn calls_of(&self, op: ApiOp) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    /// Forget the call journal.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Seed an ACL without journaling a call.
    pub fn seed_acl(&self, version: &ServiceVersion, name: &str) {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.version_mut(version).acls.push(Acl {
            id,
            name: name.to_string(),
            service_id: version.service_id.clone(),
            service_version: version.number,
        });
    }

    /// Seed a Logentries endpoint without journaling a call.
    pub fn seed_logentries(&self, version: &ServiceVersion, endpoint: Logentries) {
        self.lock().version_mut(version).logentries.push(Logentries {
            service_id: version.service_id.clone(),
            service_version: version.number,
            ..endpoint
        });
    }

    /// Seed a package without journaling a call.
    pub fn seed_package(&self, version: &ServiceVersion, hash_sum: &str) {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.version_mut(version).package = Some(Package {
            id,
            service_id: version.service_id.clone(),
            service_version: version.number,
            metadata: PackageMetadata {
                hash_sum: hash_sum.to_string(),
                ..PackageMetadata::default()
            },
        });
    }

    /// Hash the server reports after uploading the package at `path`.
    ///
    /// Paths without a configured hash upload with an empty hash sum.
    pub fn set_package_hash(&self, path: &str, hash_sum: &str) {
        self.lock()
            .package_hashes
            .insert(path.to_string(), hash_sum.to_string());
    }

    /// ACLs currently on a version.
    pub fn acls(&self, version: &ServiceVersion) -> Vec<Acl> {
        self.lock()
            .versions
            .get(version)
            .map(|v| v.acls.clone())
            .unwrap_or_default()
    }

    /// Logentries endpoints currently on a version.
    pub fn logentries(&self, version: &ServiceVersion) -> Vec<Logentries> {
        self.lock()
            .versions
            .get(version)
            .map(|v| v.logentries.clone())
            .unwrap_or_default()
    }

    /// Package currently on a version.
    pub fn package(&self, version: &ServiceVersion) -> Option<Package> {
        self.lock()
            .versions
            .get(version)
            .and_then(|v| v.package.clone())
    }
}

impl ApiClient for MockClient {
    fn create_acl(&self, version: &ServiceVersion, input: &CreateAclInput) -> RemoteResult<Acl> {
        let mut inner = self.lock();
        inner.record(Call::new(ApiOp::CreateAcl, version, Some(&input.name)))?;

        if inner.version_mut(version).acls.iter().any(|a| a.name == input.name) {
            return Err(RemoteError::from_status(
                409,
                format!("duplicate ACL name {}", input.name),
            ));
        }

        let acl = Acl {
            id: inner.next_id(),
            name: input.name.clone(),
            service_id: version.service_id.clone(),
            service_version: version.number,
        };
        inner.version_mut(version).acls.push(acl.clone());
        Ok(acl)
    }

    fn delete_acl(&self, version: &ServiceVersion, name: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner.record(Call::new(ApiOp::DeleteAcl, version, Some(name)))?;

        let acls = &mut inner.version_mut(version).acls;
        let before = acls.len();
        acls.retain(|a| a.name != name);
        if acls.len() == before {
            return Err(RemoteError::not_found(format!("ACL {name}")));
        }
        Ok(())
    }

    fn list_acls(&self, version: &ServiceVersion) -> RemoteResult<Vec<Acl>> {
        let mut inner = self.lock();
        inner.record(Call::new(ApiOp::ListAcls, version, None))?;
        Ok(inner.version_mut(version).acls.clone())
    }

    fn create_logentries(
        &self,
        version: &ServiceVersion,
        input: &CreateLogentriesInput,
    ) -> RemoteResult<Logentries> {
        let mut inner = self.lock();
        inner.record(Call::new(ApiOp::CreateLogentries, version, Some(&input.name)))?;

        let data = inner.version_mut(version);
        if data.logentries.iter().any(|l| l.name == input.name) {
            return Err(RemoteError::from_status(
                409,
                format!("duplicate Logentries name {}", input.name),
            ));
        }

        let endpoint = Logentries {
            name: input.name.clone(),
            port: input.port,
            use_tls: input.use_tls,
            token: input.token.clone(),
            format: input.format.clone().unwrap_or_default(),
            format_version: input.format_version.unwrap_or_default(),
            response_condition: input.response_condition.clone().unwrap_or_default(),
            placement: input.placement.clone().unwrap_or_default(),
            service_id: version.service_id.clone(),
            service_version: version.number,
        };
        data.logentries.push(endpoint.clone());
        Ok(endpoint)
    }

    fn delete_logentries(&self, version: &ServiceVersion, name: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner.record(Call::new(ApiOp::DeleteLogentries, version, Some(name)))?;

        let endpoints = &mut inner.version_mut(version).logentries;
        let before = endpoints.len();
        endpoints.retain(|l| l.name != name);
        if endpoints.len() == before {
            return Err(RemoteError::not_found(format!("Logentries {name}")));
        }
        Ok(())
    }

    fn list_logentries(&self, version: &ServiceVersion) -> RemoteResult<Vec<Logentries>> {
        let mut inner = self.lock();
        inner.record(Call::new(ApiOp::ListLogentries, version, None))?;
        Ok(inner.version_mut(version).logentries.clone())
    }

    fn get_package(&self, version: &ServiceVersion) -> RemoteResult<Package> {
        let mut inner = self.lock();
        inner.record(Call::new(ApiOp::GetPackage, version, None))?;
        inner
            .version_mut(version)
            .package
            .clone()
            .ok_or_else(|| RemoteError::not_found(format!("package for {version}")))
    }

    fn update_package(
        &self,
        version: &ServiceVersion,
        input: &UpdatePackageInput,
    ) -> RemoteResult<Package> {
        let mut inner = self.lock();
        inner.record(Call::new(
            ApiOp::UpdatePackage,
            version,
            Some(&input.package_path),
        ))?;

        let hash_sum = inner
            .package_hashes
            .get(&input.package_path)
            .cloned()
            .unwrap_or_default();
        let id = inner.next_id();
        let package = Package {
            id,
            service_id: version.service_id.clone(),
            service_version: version.number,
            metadata: PackageMetadata {
                hash_sum,
                ..PackageMetadata::default()
            },
        };
        inner.version_mut(version).package = Some(package.clone());
        Ok(package)
    }
}
