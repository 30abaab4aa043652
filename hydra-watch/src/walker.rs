//! Finds the normalized entities (`__typename` + `id`) inside arbitrary response data.

use serde_json::{Map, Value};
use std::{borrow::Cow, fmt};

/// Identifies one normalized entity, formatted as `Typename:id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(typename: &str, id: &str) -> Self {
        EntityKey(format!("{}:{}", typename, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(key: &str) -> Self {
        EntityKey(key.to_string())
    }
}

/// A `(typename, id)` pair found in the data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity<'a> {
    pub typename: &'a str,
    pub id: Cow<'a, str>
}

impl Entity<'_> {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.typename, &self.id)
    }
}

fn entity_of(fields: &Map<String, Value>) -> Option<Entity<'_>> {
    let typename = match fields.get("__typename") {
        Some(Value::String(typename)) => typename.as_str(),
        _ => return None
    };
    let id = match fields.get("id") {
        Some(Value::String(id)) => Cow::Borrowed(id.as_str()),
        Some(Value::Number(id)) => Cow::Owned(id.to_string()),
        _ => return None
    };
    Some(Entity { typename, id })
}

/// Calls `visit` for every entity in `data`, parents before children.
///
/// Arrays are only descended into if their first element is an object or an array. The rest of
/// the elements aren't checked, so a list whose first item is a scalar is skipped as a whole.
pub fn walk_entities<'a, F>(data: &'a Value, visit: &mut F)
where
    F: FnMut(Entity<'a>)
{
    match data {
        Value::Array(items) => match items.first() {
            Some(Value::Object(_)) | Some(Value::Array(_)) => {
                for item in items {
                    walk_entities(item, visit);
                }
            }
            _ => {}
        },
        Value::Object(fields) => {
            if let Some(entity) = entity_of(fields) {
                visit(entity);
            }
            for value in fields.values() {
                walk_entities(value, visit);
            }
        }
        _ => {}
    }
}

/// Collects every entity in `data`, in the order [`walk_entities`](./fn.walk_entities.html)
/// visits them.
///
/// ```
/// # use hydra_watch::walker::extract_entities;
/// # use serde_json::json;
/// let data = json!({
///     "film": {
///         "__typename": "Film",
///         "id": "1",
///         "director": { "__typename": "Person", "id": 2 }
///     }
/// });
///
/// let keys: Vec<String> = extract_entities(&data)
///     .iter()
///     .map(|entity| entity.key().to_string())
///     .collect();
/// assert_eq!(keys, vec!["Film:1", "Person:2"]);
/// ```
pub fn extract_entities(data: &Value) -> Vec<Entity<'_>> {
    let mut entities = Vec::new();
    walk_entities(data, &mut |entity| entities.push(entity));
    entities
}

#[cfg(test)]
mod tests {
    use super::{extract_entities, EntityKey};
    use serde_json::json;

    fn keys(data: &serde_json::Value) -> Vec<String> {
        extract_entities(data)
            .iter()
            .map(|entity| entity.key().to_string())
            .collect()
    }

    #[test]
    fn finds_nested_entities() {
        let data = json!({
            "__typename": "Film",
            "id": "id",
            "nested": { "__typename": "Person", "id": "id" }
        });

        assert_eq!(keys(&data), vec!["Film:id", "Person:id"]);
    }

    #[test]
    fn scalars_and_nulls_yield_nothing() {
        assert!(keys(&json!(null)).is_empty());
        assert!(keys(&json!("Film:1")).is_empty());
        assert!(keys(&json!(42)).is_empty());
        assert!(keys(&json!({ "film": null, "count": 3 })).is_empty());
    }

    #[test]
    fn requires_both_id_and_typename() {
        let data = json!({
            "a": { "__typename": "Film" },
            "b": { "id": "1" },
            "c": { "__typename": "Film", "id": null },
            "d": { "__typename": null, "id": "1" }
        });

        assert!(keys(&data).is_empty());
    }

    #[test]
    fn walks_children_of_anonymous_objects() {
        let data = json!({
            "connection": {
                "edges": [{ "node": { "__typename": "Film", "id": 4 } }]
            }
        });

        assert_eq!(keys(&data), vec!["Film:4"]);
    }

    #[test]
    fn walks_every_element_of_object_lists() {
        let data = json!({
            "films": [
                { "__typename": "Film", "id": "1" },
                { "__typename": "Film", "id": "2" },
                { "__typename": "Film", "id": "3" }
            ]
        });

        assert_eq!(keys(&data), vec!["Film:1", "Film:2", "Film:3"]);
    }

    #[test]
    fn only_checks_first_element_of_lists() {
        let skipped = json!([1, { "__typename": "Film", "id": "1" }]);
        let empty = json!([]);
        let nested = json!([[{ "__typename": "Film", "id": "1" }]]);

        assert!(keys(&skipped).is_empty());
        assert!(keys(&empty).is_empty());
        assert_eq!(keys(&nested), vec!["Film:1"]);
    }

    #[test]
    fn formats_entity_keys() {
        assert_eq!(EntityKey::new("Film", "1").as_str(), "Film:1");
        assert_eq!(EntityKey::from("Person:2").to_string(), "Person:2");
    }
}
