//! Resource state passed between the host framework and handlers.

use crate::schema::{AttributeType, Schema};
use crate::{ProviderError, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Attribute values keyed by name, used with [`ResourceData::set_many`].
pub type ResourceFields<'a> = Vec<(&'a str, Value)>;

/// The id and attribute values of one resource instance.
///
/// Values are typed by the schema the data was created from: setting an
/// unknown attribute or a value of the wrong type is an error. Reading an
/// unset attribute yields the zero value of its type.
#[derive(Clone)]
pub struct ResourceData {
    id: String,
    attributes: BTreeMap<String, Value>,
    prior: BTreeMap<String, Value>,
    kinds: BTreeMap<String, AttributeType>,
    sensitive: BTreeSet<String>,
}

impl ResourceData {
    /// Creates empty data for `schema`.
    pub fn new(schema: &Schema) -> Self {
        Self {
            id: String::new(),
            attributes: BTreeMap::new(),
            prior: BTreeMap::new(),
            kinds: schema
                .attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.kind))
                .collect(),
            sensitive: schema
                .attributes
                .iter()
                .filter(|(_, attr)| attr.sensitive)
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }

    /// Sets the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets current values from a JSON object.
    ///
    /// # Errors
    ///
    /// Fails if `attrs` is not an object or contains unknown or mistyped
    /// attributes.
    pub fn with_attributes(mut self, attrs: Value) -> Result<Self> {
        for (name, value) in into_object(attrs)? {
            self.set(&name, value)?;
        }
        Ok(self)
    }

    /// Sets prior values from a JSON object; [`has_change`](Self::has_change)
    /// compares against these. Prior values fill in attributes that are unset
    /// or null in the current values, so an unchanged attribute reads the same
    /// as before.
    pub fn with_prior_state(mut self, attrs: Value) -> Result<Self> {
        for (name, value) in into_object(attrs)? {
            self.check(&name, &value)?;
            if !value.is_null() {
                let current = self.attributes.entry(name.clone()).or_insert(Value::Null);
                if current.is_null() {
                    *current = value.clone();
                }
            }
            self.prior.insert(name, value);
        }
        Ok(self)
    }

    /// Returns the id, empty if the resource does not exist.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets the id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Clears the id, marking the resource as gone.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Returns the raw value of an attribute, `None` if unset.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    /// Returns a string attribute, or `""` if unset.
    pub fn get_str(&self, name: &str) -> Result<String> {
        match self.get(name) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(invalid(name, AttributeType::String)),
        }
    }

    /// Returns an integer attribute, or `0` if unset.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            None => Ok(0),
            Some(v) => v.as_i64().ok_or_else(|| invalid(name, AttributeType::Int)),
        }
    }

    /// Sets an attribute.
    ///
    /// # Errors
    ///
    /// Fails if the attribute is unknown or `value` has the wrong type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check(name, &value)?;
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// Sets several attributes, wrapping the first failure with the
    /// attribute name.
    pub fn set_many(&mut self, fields: ResourceFields<'_>) -> Result<()> {
        for (name, value) in fields {
            self.set(name, value)
                .map_err(|e| ProviderError::context(format!("failed to set {name:?}"), e))?;
        }
        Ok(())
    }

    /// Returns the prior value of an attribute, `None` if it had none.
    pub fn prior(&self, name: &str) -> Option<&Value> {
        self.prior.get(name).filter(|v| !v.is_null())
    }

    /// Checks if an attribute differs from its prior value.
    pub fn has_change(&self, name: &str) -> bool {
        let prior = self.prior.get(name).filter(|v| !v.is_null());
        prior != self.get(name)
    }

    /// Returns the current values as a JSON object, including `id`.
    pub fn to_state(&self) -> Value {
        let mut map: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }

    fn check(&self, name: &str, value: &Value) -> Result<()> {
        let kind = self.kinds.get(name).ok_or_else(|| ProviderError::InvalidAttribute {
            name: name.to_string(),
            expected: "known attribute".to_string(),
        })?;

        let ok = value.is_null()
            || match kind {
                AttributeType::String => value.is_string(),
                AttributeType::Int => value.is_i64(),
            };
        if ok {
            Ok(())
        } else {
            Err(invalid(name, *kind))
        }
    }
}

fn invalid(name: &str, kind: AttributeType) -> ProviderError {
    ProviderError::InvalidAttribute {
        name: name.to_string(),
        expected: kind.to_string(),
    }
}

fn into_object(attrs: Value) -> Result<Map<String, Value>> {
    match attrs {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ProviderError::InvalidAttribute {
            name: "<root>".to_string(),
            expected: "object".to_string(),
        }),
    }
}

impl fmt::Debug for ResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted: BTreeMap<&str, &dyn fmt::Debug> = self
            .attributes
            .iter()
            .map(|(k, v)| {
                let shown: &dyn fmt::Debug = if self.sensitive.contains(k) {
                    &"[REDACTED]"
                } else {
                    v
                };
                (k.as_str(), shown)
            })
            .collect();

        f.debug_struct("ResourceData")
            .field("id", &self.id)
            .field("attributes", &redacted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("plaintext", Attribute::required_string().sensitive())
            .with_attribute("generation", Attribute::computed_int())
    }

    #[test]
    fn test_zero_values() {
        let d = ResourceData::new(&schema());
        assert_eq!(d.get_str("name").unwrap(), "");
        assert_eq!(d.get_int("generation").unwrap(), 0);
        assert_eq!(d.id(), "");
    }

    #[test]
    fn test_set_and_get() {
        let mut d = ResourceData::new(&schema());
        d.set("name", "api-key").unwrap();
        d.set("generation", 3).unwrap();

        assert_eq!(d.get_str("name").unwrap(), "api-key");
        assert_eq!(d.get_int("generation").unwrap(), 3);
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut d = ResourceData::new(&schema());
        assert!(d.set("generation", "three").is_err());
    }

    #[test]
    fn test_set_many_wraps_error() {
        let mut d = ResourceData::new(&schema());
        let err = d
            .set_many(vec![("name", json!("s")), ("bogus", json!(1))])
            .unwrap_err();

        assert!(err.to_string().starts_with("failed to set \"bogus\""));
        assert_eq!(d.get_str("name").unwrap(), "s");
    }

    #[test]
    fn test_has_change() {
        let d = ResourceData::new(&schema())
            .with_attributes(json!({"plaintext": "p2"}))
            .unwrap()
            .with_prior_state(json!({"name": "s", "plaintext": "p"}))
            .unwrap();

        assert!(d.has_change("plaintext"));
        assert!(!d.has_change("name"));
        assert_eq!(d.get_str("name").unwrap(), "s");
    }

    #[test]
    fn test_prior_state_fills_null_values() {
        let d = ResourceData::new(&schema())
            .with_attributes(json!({"plaintext": "p", "generation": null}))
            .unwrap()
            .with_prior_state(json!({"plaintext": "p", "generation": 4}))
            .unwrap();

        assert_eq!(d.get_int("generation").unwrap(), 4);
        assert!(!d.has_change("generation"));
    }

    #[test]
    fn test_to_state_includes_id() {
        let d = ResourceData::new(&schema())
            .with_id("b/s#1")
            .with_attributes(json!({"name": "s"}))
            .unwrap();

        assert_eq!(d.to_state(), json!({"id": "b/s#1", "name": "s"}));
    }

    #[test]
    fn test_debug_redacts_sensitive() {
        let d = ResourceData::new(&schema())
            .with_attributes(json!({"name": "s", "plaintext": "hunter2"}))
            .unwrap();

        let debug = format!("{d:?}");
        assert!(debug.contains("\"s\""));
        assert!(!debug.contains("hunter2"));
    }
}
