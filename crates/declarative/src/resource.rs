//! Block identity and the remote capability
//!
//! A declared block is anything with a stable key and structural equality.
//! A [`Remote`] is the create/delete/list surface for one block kind,
//! scoped to a single service version.

use crate::error::RemoteResult;
use crate::types::ServiceVersion;
use std::fmt;
use std::hash::Hash;

/// A declared block with a stable identity
///
/// The key must be unique within one declared collection. The remote API
/// enforces the same uniqueness per service version, which is why a changed
/// block is deleted before its replacement is created.
///
/// Equality and hashing must cover every field, not just the key: a block
/// whose key is unchanged but whose other fields differ is a different block.
///
/// # Example
///
/// ```
/// use declarative::Keyed;
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Backend {
///     name: String,
///     port: u16,
/// }
///
/// impl Keyed for Backend {
///     type Key = String;
///
///     fn key(&self) -> String {
///         self.name.clone()
///     }
/// }
///
/// let b = Backend { name: "origin".into(), port: 443 };
/// assert_eq!(b.key(), "origin");
/// ```
pub trait Keyed: Clone + Eq + Hash + fmt::Debug {
    /// Identity type (typically the block name)
    type Key: Clone + Eq + Hash + fmt::Display + fmt::Debug;

    /// Stable identity of this block
    fn key(&self) -> Self::Key;
}

/// Remote capability for one kind of keyed block
///
/// Implementations translate declared blocks into whatever request shape the
/// remote API expects. Errors must be classified: a delete of an entity that
/// does not exist returns [`RemoteError::NotFound`](crate::RemoteError::NotFound),
/// never a generic request error.
pub trait Remote<B: Keyed> {
    /// Server representation of a created block
    type Entity;

    /// Human-readable kind label used in logs and errors (e.g. "ACL")
    fn kind(&self) -> &'static str;

    /// Create a block on the given version
    fn create(&self, version: &ServiceVersion, block: &B) -> RemoteResult<Self::Entity>;

    /// Delete the block with the given key from the given version
    fn delete(&self, version: &ServiceVersion, key: &B::Key) -> RemoteResult<()>;

    /// List every block of this kind on the given version
    fn list(&self, version: &ServiceVersion) -> RemoteResult<Vec<Self::Entity>>;
}

impl<B: Keyed, R: Remote<B> + ?Sized> Remote<B> for &R {
    type Entity = R::Entity;

    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn create(&self, version: &ServiceVersion, block: &B) -> RemoteResult<Self::Entity> {
        (**self).create(version, block)
    }

    fn delete(&self, version: &ServiceVersion, key: &B::Key) -> RemoteResult<()> {
        (**self).delete(version, key)
    }

    fn list(&self, version: &ServiceVersion) -> RemoteResult<Vec<Self::Entity>> {
        (**self).list(version)
    }
}
