//! Normalization of remote entities into the declared shape
//!
//! Remote responses use zero values to mean "not set". Carrying those back
//! as explicit empty strings would make a declaration that simply omitted a
//! field look different from the read-back, so string fields holding the
//! empty string are pruned. Numeric and boolean fields are kept as-is.

use serde_json::{Map, Value};

/// Conversion from a remote entity into a declared block
pub trait FromRemote<E>: Sized {
    /// Build the declared representation of a remote entity
    fn from_remote(entity: E) -> Self;
}

/// Normalize a list of remote entities into declared blocks
pub fn normalize<E, B: FromRemote<E>>(entities: impl IntoIterator<Item = E>) -> Vec<B> {
    entities.into_iter().map(B::from_remote).collect()
}

/// Normalize with a caller-supplied conversion
///
/// Use this when the conversion needs context the entity does not carry,
/// such as a write-only field re-injected from the last known declaration.
pub fn normalize_with<E, B, F>(entities: impl IntoIterator<Item = E>, f: F) -> Vec<B>
where
    F: FnMut(E) -> B,
{
    entities.into_iter().map(f).collect()
}

/// Prune an artifact empty string into an absent value
pub fn prune(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Prune an optional string, collapsing `Some("")` into `None`
pub fn prune_opt(value: Option<String>) -> Option<String> {
    value.and_then(prune)
}

/// Remove every empty-string entry from a flattened block
///
/// Returns the number of entries removed.
pub fn prune_empty_strings(map: &mut Map<String, Value>) -> usize {
    let before = map.len();
    map.retain(|_, v| !matches!(v, Value::String(s) if s.is_empty()));
    before - map.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Entity {
        name: String,
        format: String,
        port: u32,
    }

    #[derive(Debug, PartialEq)]
    struct Block {
        name: String,
        format: Option<String>,
        port: u32,
    }

    impl FromRemote<Entity> for Block {
        fn from_remote(entity: Entity) -> Self {
            Self {
                name: entity.name,
                format: prune(entity.format),
                port: entity.port,
            }
        }
    }

    #[test]
    fn test_normalize_prunes_empty_strings_only() {
        let blocks: Vec<Block> = normalize(vec![Entity {
            name: "a".into(),
            format: String::new(),
            port: 0,
        }]);

        assert_eq!(
            blocks,
            vec![Block {
                name: "a".into(),
                format: None,
                port: 0,
            }]
        );
    }

    #[test]
    fn test_normalize_with_reinjects_context() {
        let last_known = "pkg.tar.gz".to_string();
        let blocks = normalize_with(vec!["hash"], |h| (last_known.clone(), h.to_string()));
        assert_eq!(blocks, vec![("pkg.tar.gz".to_string(), "hash".to_string())]);
    }

    #[test]
    fn test_prune_opt() {
        assert_eq!(prune_opt(Some(String::new())), None);
        assert_eq!(prune_opt(Some("x".into())), Some("x".into()));
        assert_eq!(prune_opt(None), None);
    }

    #[test]
    fn test_prune_empty_strings_map() {
        let mut map = json!({
            "name": "a",
            "format": "",
            "port": 0,
            "use_tls": false
        })
        .as_object()
        .cloned()
        .unwrap();

        assert_eq!(prune_empty_strings(&mut map), 1);
        assert_eq!(
            Value::Object(map),
            json!({ "name": "a", "port": 0, "use_tls": false })
        );
    }
}
