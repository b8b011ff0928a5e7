//! ChangeCollector - pure before/after diffing
//!
//! Given before/after snapshots, computes the minimal set of facts
//! representing the transition:
//! - Entity level: at most one ADD / MOD / DEL fact
//! - Collection level: a symmetric difference keyed by `ElementKey`
//!
//! Equality is STRUCTURAL (field by field), never identity-based: the
//! same logical element may be re-instantiated between snapshots and
//! must not produce a fact.
//!
//! This is a stateless pure-function module. Identical inputs produce
//! identical facts in identical (key) order.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::metadata::KeyRule;

use super::{AuditFact, CollectorError, ElementKey, OwnerKey, RowKey};

/// Stateless change collection.
pub struct ChangeCollector;

impl ChangeCollector {
    /// Diffs an entity's scalar/embedded state.
    ///
    /// Returns None when before and after are structurally equal,
    /// ADD when before is absent, DEL when after is absent, MOD
    /// otherwise.
    pub fn entity_change(
        owner: &OwnerKey,
        before: Option<&Value>,
        after: Option<&Value>,
    ) -> Option<AuditFact> {
        let key = RowKey::entity(owner.clone());
        match (before, after) {
            (None, None) => None,
            (None, Some(after)) => Some(AuditFact::added(key, after.clone())),
            (Some(_), None) => Some(AuditFact::deleted(key)),
            (Some(before), Some(after)) => {
                if before == after {
                    None
                } else {
                    Some(AuditFact::modified(key, after.clone()))
                }
            }
        }
    }

    /// Diffs a collection attribute's keyed element snapshots.
    ///
    /// Keys only in `after` produce ADD, keys only in `before` produce
    /// DEL, keys in both with structurally unequal payloads produce
    /// MOD, equal payloads produce nothing. Facts are emitted in key
    /// order.
    pub fn collection_change(
        owner: &OwnerKey,
        attribute: &str,
        before: &BTreeMap<ElementKey, Value>,
        after: &BTreeMap<ElementKey, Value>,
    ) -> Vec<AuditFact> {
        let mut facts = Vec::new();

        for (element, payload) in after {
            let key = RowKey::element(owner.clone(), attribute, element.clone());
            match before.get(element) {
                None => facts.push(AuditFact::added(key, payload.clone())),
                Some(previous) if previous != payload => {
                    facts.push(AuditFact::modified(key, payload.clone()));
                }
                Some(_) => {}
            }
        }

        for element in before.keys() {
            if !after.contains_key(element) {
                let key = RowKey::element(owner.clone(), attribute, element.clone());
                facts.push(AuditFact::deleted(key));
            }
        }

        facts
    }

    /// Projects an unkeyed element sequence onto a key space.
    ///
    /// Collections without unique per-element keys must pass through
    /// this projection before `collection_change` applies. Each
    /// distinct key is exactly one slot; a duplicate or underivable
    /// key is an error, never silently resolved.
    pub fn project_elements(
        rule: &KeyRule,
        attribute: &str,
        elements: &[Value],
    ) -> Result<BTreeMap<ElementKey, Value>, CollectorError> {
        let mut projected = BTreeMap::new();

        for (index, element) in elements.iter().enumerate() {
            let key = match rule {
                KeyRule::Positional => ElementKey::positional(index),
                KeyRule::NaturalKey { field } => {
                    Self::extract_natural_key(attribute, field, index, element)?
                }
                // Map attributes arrive pre-keyed; a bare sequence
                // has lost its keys and cannot be audited.
                KeyRule::MapKey => {
                    return Err(CollectorError::UnkeyedMapCollection {
                        attribute: attribute.to_string(),
                    })
                }
            };

            if projected.insert(key.clone(), element.clone()).is_some() {
                return Err(CollectorError::DuplicateElementKey {
                    attribute: attribute.to_string(),
                    key,
                });
            }
        }

        Ok(projected)
    }

    /// Extracts a scalar natural-key field as a stable string.
    fn extract_natural_key(
        attribute: &str,
        field: &str,
        index: usize,
        element: &Value,
    ) -> Result<ElementKey, CollectorError> {
        let value = element
            .get(field)
            .ok_or_else(|| CollectorError::MissingNaturalKey {
                attribute: attribute.to_string(),
                field: field.to_string(),
                index,
            })?;

        match value {
            Value::String(s) => Ok(ElementKey::new(s.clone())),
            Value::Number(n) => Ok(ElementKey::new(n.to_string())),
            Value::Bool(b) => Ok(ElementKey::new(b.to_string())),
            _ => Err(CollectorError::NonScalarNaturalKey {
                attribute: attribute.to_string(),
                field: field.to_string(),
                index,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use serde_json::json;

    fn owner() -> OwnerKey {
        OwnerKey::new("Person", "1")
    }

    fn keyed(entries: &[(&str, Value)]) -> BTreeMap<ElementKey, Value> {
        entries
            .iter()
            .map(|(k, v)| (ElementKey::new(*k), v.clone()))
            .collect()
    }

    // === Entity diffing ===

    #[test]
    fn test_entity_insert_is_add() {
        let fact =
            ChangeCollector::entity_change(&owner(), None, Some(&json!({"name": "Ada"}))).unwrap();
        assert_eq!(fact.kind(), ChangeKind::Add);
        assert_eq!(fact.payload(), &json!({"name": "Ada"}));
    }

    #[test]
    fn test_entity_delete_is_del() {
        let fact =
            ChangeCollector::entity_change(&owner(), Some(&json!({"name": "Ada"})), None).unwrap();
        assert_eq!(fact.kind(), ChangeKind::Del);
    }

    #[test]
    fn test_entity_update_is_mod() {
        let fact = ChangeCollector::entity_change(
            &owner(),
            Some(&json!({"name": "Ada"})),
            Some(&json!({"name": "Grace"})),
        )
        .unwrap();
        assert_eq!(fact.kind(), ChangeKind::Mod);
        assert_eq!(fact.payload(), &json!({"name": "Grace"}));
    }

    #[test]
    fn test_structurally_equal_entity_is_noop() {
        // Re-instantiated but structurally identical state must not
        // produce a fact.
        let before = json!({"name": "Ada", "age": 36});
        let after = json!({"name": "Ada", "age": 36});
        assert!(ChangeCollector::entity_change(&owner(), Some(&before), Some(&after)).is_none());
    }

    #[test]
    fn test_absent_to_absent_is_noop() {
        assert!(ChangeCollector::entity_change(&owner(), None, None).is_none());
    }

    // === Collection diffing ===

    #[test]
    fn test_collection_symmetric_difference() {
        let before = keyed(&[("a", json!("value1")), ("b", json!("value2"))]);
        let after = keyed(&[("b", json!("changed")), ("c", json!("value3"))]);

        let facts = ChangeCollector::collection_change(&owner(), "embs", &before, &after);

        assert_eq!(facts.len(), 3);
        // Emitted in key order: after-side first (b MOD, c ADD), then
        // before-only deletions (a DEL).
        assert_eq!(facts[0].kind(), ChangeKind::Mod);
        assert_eq!(facts[0].key().element_key().unwrap().as_str(), "b");
        assert_eq!(facts[1].kind(), ChangeKind::Add);
        assert_eq!(facts[1].key().element_key().unwrap().as_str(), "c");
        assert_eq!(facts[2].kind(), ChangeKind::Del);
        assert_eq!(facts[2].key().element_key().unwrap().as_str(), "a");
    }

    #[test]
    fn test_equal_elements_emit_nothing() {
        let before = keyed(&[("a", json!("v")), ("b", json!("w"))]);
        let after = keyed(&[("a", json!("v")), ("b", json!("w"))]);

        let facts = ChangeCollector::collection_change(&owner(), "embs", &before, &after);
        assert!(facts.is_empty());
    }

    #[test]
    fn test_untouched_siblings_are_undisturbed() {
        let before = keyed(&[("a", json!("value1")), ("b", json!("value2"))]);
        let after = keyed(&[("a", json!("value3")), ("b", json!("value2"))]);

        let facts = ChangeCollector::collection_change(&owner(), "embs", &before, &after);

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].key().element_key().unwrap().as_str(), "a");
    }

    #[test]
    fn test_empty_to_populated_is_all_adds() {
        let facts = ChangeCollector::collection_change(
            &owner(),
            "embs",
            &BTreeMap::new(),
            &keyed(&[("a", json!(1)), ("b", json!(2))]),
        );
        assert!(facts.iter().all(|f| f.kind() == ChangeKind::Add));
        assert_eq!(facts.len(), 2);
    }

    // === Element projection ===

    #[test]
    fn test_positional_projection() {
        let elements = vec![json!("x"), json!("y"), json!("x")];
        let projected =
            ChangeCollector::project_elements(&KeyRule::Positional, "tags", &elements).unwrap();

        assert_eq!(projected.len(), 3);
        assert_eq!(projected[&ElementKey::positional(0)], json!("x"));
        assert_eq!(projected[&ElementKey::positional(2)], json!("x"));
    }

    #[test]
    fn test_natural_key_projection() {
        let rule = KeyRule::natural_key("code");
        let elements = vec![
            json!({"code": "home", "number": "555-1"}),
            json!({"code": "work", "number": "555-2"}),
        ];
        let projected = ChangeCollector::project_elements(&rule, "phones", &elements).unwrap();

        assert_eq!(projected.len(), 2);
        assert_eq!(
            projected[&ElementKey::new("home")],
            json!({"code": "home", "number": "555-1"})
        );
    }

    #[test]
    fn test_numeric_natural_key_is_stringified() {
        let rule = KeyRule::natural_key("id");
        let elements = vec![json!({"id": 7, "v": "a"})];
        let projected = ChangeCollector::project_elements(&rule, "items", &elements).unwrap();
        assert!(projected.contains_key(&ElementKey::new("7")));
    }

    #[test]
    fn test_missing_natural_key_is_reported() {
        let rule = KeyRule::natural_key("code");
        let elements = vec![json!({"number": "555-1"})];
        let err = ChangeCollector::project_elements(&rule, "phones", &elements).unwrap_err();

        assert_eq!(
            err,
            CollectorError::MissingNaturalKey {
                attribute: "phones".to_string(),
                field: "code".to_string(),
                index: 0,
            }
        );
    }

    #[test]
    fn test_non_scalar_natural_key_is_reported() {
        let rule = KeyRule::natural_key("code");
        let elements = vec![json!({"code": {"nested": true}})];
        let err = ChangeCollector::project_elements(&rule, "phones", &elements).unwrap_err();

        assert!(matches!(err, CollectorError::NonScalarNaturalKey { .. }));
    }

    #[test]
    fn test_duplicate_natural_key_is_reported_not_overwritten() {
        let rule = KeyRule::natural_key("code");
        let elements = vec![
            json!({"code": "home", "number": "555-1"}),
            json!({"code": "home", "number": "555-9"}),
        ];
        let err = ChangeCollector::project_elements(&rule, "phones", &elements).unwrap_err();

        assert_eq!(
            err,
            CollectorError::DuplicateElementKey {
                attribute: "phones".to_string(),
                key: ElementKey::new("home"),
            }
        );
    }

    #[test]
    fn test_map_keyed_sequence_is_rejected() {
        let elements = vec![json!("value1")];
        let err = ChangeCollector::project_elements(&KeyRule::MapKey, "embs", &elements)
            .unwrap_err();

        assert_eq!(
            err,
            CollectorError::UnkeyedMapCollection {
                attribute: "embs".to_string(),
            }
        );
    }

    #[test]
    fn test_projection_is_deterministic() {
        let rule = KeyRule::natural_key("code");
        let elements = vec![json!({"code": "b"}), json!({"code": "a"})];

        let p1 = ChangeCollector::project_elements(&rule, "x", &elements).unwrap();
        let p2 = ChangeCollector::project_elements(&rule, "x", &elements).unwrap();
        assert_eq!(p1, p2);
    }
}
