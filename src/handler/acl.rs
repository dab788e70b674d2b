//! ACL attribute

use super::BlockSpec;
use crate::api::{Acl, ApiClient, CreateAclInput};
use crate::config::ServiceMetadata;
use crate::schema::FieldDescriptor;
use declarative::{FromRemote, Keyed, RemoteResult, ServiceVersion};
use serde::{Deserialize, Serialize};

/// A declared ACL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclBlock {
    pub name: String,
    /// Server-assigned id, only present on read-back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_id: Option<String>,
}

impl AclBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            acl_id: None,
        }
    }
}

impl Keyed for AclBlock {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }
}

impl FromRemote<Acl> for AclBlock {
    fn from_remote(acl: Acl) -> Self {
        Self {
            name: acl.name,
            acl_id: declarative::prune(acl.id),
        }
    }
}

pub struct AclSpec;

impl BlockSpec for AclSpec {
    const KEY: &'static str = "acl";
    const KIND: &'static str = "ACL";

    type Block = AclBlock;
    type Entity = Acl;

    fn fields(_meta: &ServiceMetadata) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::string("name")
                .required()
                .describe("Unique name to refer to this ACL"),
            FieldDescriptor::string("acl_id")
                .computed()
                .describe("Generated acl id"),
        ]
    }

    fn create(client: &dyn ApiClient, version: &ServiceVersion, block: &AclBlock) -> RemoteResult<Acl> {
        client.create_acl(
            version,
            &CreateAclInput {
                name: block.name.clone(),
            },
        )
    }

    fn delete(client: &dyn ApiClient, version: &ServiceVersion, name: &String) -> RemoteResult<()> {
        client.delete_acl(version, name)
    }

    fn list(client: &dyn ApiClient, version: &ServiceVersion) -> RemoteResult<Vec<Acl>> {
        client.list_acls(version)
    }

    fn normalize(entity: Acl, _meta: &ServiceMetadata) -> AclBlock {
        AclBlock::from_remote(entity)
    }
}
