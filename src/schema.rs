//! Attribute schemas for the provider, its resources and data sources.

use crate::state::ResourceData;
use crate::{ProviderError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "integer"),
        }
    }
}

/// Describes a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Value type
    pub kind: AttributeType,
    /// Human-readable description
    pub description: String,
    /// Must be set in configuration
    pub required: bool,
    /// May be set in configuration
    pub optional: bool,
    /// Populated by the provider
    pub computed: bool,
    /// Changing the value replaces the resource
    pub force_new: bool,
    /// Value must never be shown or logged
    pub sensitive: bool,
    /// Attributes that may not be set together with this one
    pub conflicts_with: Vec<String>,
    /// Environment variables consulted, in order, when the value is unset
    pub env_default: Vec<String>,
}

impl Attribute {
    fn new(kind: AttributeType) -> Self {
        Self {
            kind,
            description: String::new(),
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            conflicts_with: Vec::new(),
            env_default: Vec::new(),
        }
    }

    /// A string that must be configured.
    pub fn required_string() -> Self {
        Self {
            required: true,
            ..Self::new(AttributeType::String)
        }
    }

    /// A string that may be configured.
    pub fn optional_string() -> Self {
        Self {
            optional: true,
            ..Self::new(AttributeType::String)
        }
    }

    /// A string populated by the provider.
    pub fn computed_string() -> Self {
        Self {
            computed: true,
            ..Self::new(AttributeType::String)
        }
    }

    /// An integer that may be configured.
    pub fn optional_int() -> Self {
        Self {
            optional: true,
            ..Self::new(AttributeType::Int)
        }
    }

    /// An integer populated by the provider.
    pub fn computed_int() -> Self {
        Self {
            computed: true,
            ..Self::new(AttributeType::Int)
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the attribute as replacing the resource when changed.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Marks the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Declares attributes that may not be set together with this one.
    pub fn conflicts_with(mut self, names: &[&str]) -> Self {
        self.conflicts_with = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Declares environment variables used as defaults, first set wins.
    pub fn env_default(mut self, vars: &[&str]) -> Self {
        self.env_default = vars.iter().map(|s| s.to_string()).collect();
        self
    }

    fn matches(&self, value: &Value) -> bool {
        match self.kind {
            AttributeType::String => value.is_string(),
            AttributeType::Int => value.is_i64(),
        }
    }
}

/// A named set of attributes.
///
/// ```
/// use berglas_provider::schema::{Attribute, Schema};
///
/// let schema = Schema::new()
///     .with_attribute("bucket", Attribute::required_string().force_new())
///     .with_attribute("generation", Attribute::computed_int());
///
/// assert!(schema.internal_validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Human-readable description
    pub description: String,
    /// Attributes keyed by name
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Checks configuration values against the schema.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::MissingAttribute`] if a required attribute is unset
    /// - [`ProviderError::InvalidAttribute`] if a value has the wrong type
    /// - [`ProviderError::ConflictingAttributes`] if two conflicting
    ///   attributes are both set
    pub fn validate(&self, data: &ResourceData) -> Result<()> {
        for (name, attr) in &self.attributes {
            match data.get(name) {
                None if attr.required => {
                    return Err(ProviderError::MissingAttribute(name.clone()));
                }
                None => {}
                Some(value) if !attr.matches(value) => {
                    return Err(ProviderError::InvalidAttribute {
                        name: name.clone(),
                        expected: attr.kind.to_string(),
                    });
                }
                Some(_) => {}
            }

            if !is_set(data, name) {
                continue;
            }
            for other in &attr.conflicts_with {
                if is_set(data, other) {
                    return Err(ProviderError::ConflictingAttributes(
                        name.clone(),
                        other.clone(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Rejects in-place updates that change a `force_new` attribute.
    ///
    /// Only attributes with a prior value are compared; the host plans a
    /// replacement for those instead of an update.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::RequiresReplace`] naming the first changed
    /// attribute.
    pub fn check_in_place_update(&self, data: &ResourceData) -> Result<()> {
        for (name, attr) in &self.attributes {
            if attr.force_new && data.prior(name).is_some() && data.has_change(name) {
                return Err(ProviderError::RequiresReplace(name.clone()));
            }
        }
        Ok(())
    }

    /// Fills unset attributes from their environment defaults.
    ///
    /// `lookup` resolves an environment variable; pass
    /// `|k| std::env::var(k).ok()` to read the process environment.
    pub fn apply_env_defaults<F>(&self, data: &mut ResourceData, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (name, attr) in &self.attributes {
            if data.get(name).is_some() {
                continue;
            }
            let found = attr
                .env_default
                .iter()
                .find_map(|var| lookup(var).filter(|v| !v.is_empty()));
            if let Some(value) = found {
                data.set(name, value)?;
            }
        }
        Ok(())
    }

    /// Checks that the schema itself is consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidSchema`] describing the first problem.
    pub fn internal_validate(&self) -> Result<()> {
        for (name, attr) in &self.attributes {
            let invalid = |msg: &str| Err(ProviderError::InvalidSchema(format!("{name}: {msg}")));

            if attr.required && (attr.optional || attr.computed) {
                return invalid("required cannot be combined with optional or computed");
            }
            if !attr.required && !attr.optional && !attr.computed {
                return invalid("one of required, optional or computed must be set");
            }
            if !attr.env_default.is_empty() && !attr.optional {
                return invalid("env_default is only allowed on optional attributes");
            }
            for other in &attr.conflicts_with {
                if other == name {
                    return invalid("cannot conflict with itself");
                }
                match self.attributes.get(other) {
                    None => return invalid(&format!("conflicts_with unknown attribute {other:?}")),
                    Some(o) if o.required => {
                        return invalid(&format!("conflicts_with required attribute {other:?}"))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

fn is_set(data: &ResourceData, name: &str) -> bool {
    match data.get(name) {
        None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider_like() -> Schema {
        Schema::new()
            .with_attribute(
                "credentials",
                Attribute::optional_string()
                    .env_default(&["CREDS_A", "CREDS_B"])
                    .conflicts_with(&["access_token"]),
            )
            .with_attribute(
                "access_token",
                Attribute::optional_string()
                    .env_default(&["TOKEN"])
                    .conflicts_with(&["credentials"]),
            )
    }

    fn data(schema: &Schema, attrs: serde_json::Value) -> ResourceData {
        ResourceData::new(schema).with_attributes(attrs).unwrap()
    }

    #[test]
    fn test_internal_validate_ok() {
        assert!(provider_like().internal_validate().is_ok());
    }

    #[test]
    fn test_internal_validate_rejects_required_computed() {
        let mut attr = Attribute::required_string();
        attr.computed = true;
        let schema = Schema::new().with_attribute("x", attr);

        assert!(matches!(
            schema.internal_validate(),
            Err(ProviderError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_internal_validate_rejects_unknown_conflict() {
        let schema = Schema::new()
            .with_attribute("x", Attribute::optional_string().conflicts_with(&["y"]));
        let err = schema.internal_validate().unwrap_err();
        assert!(err.to_string().contains("unknown attribute"));
    }

    #[test]
    fn test_internal_validate_rejects_env_default_on_computed() {
        let schema =
            Schema::new().with_attribute("x", Attribute::computed_string().env_default(&["X"]));
        assert!(schema.internal_validate().is_err());
    }

    #[test]
    fn test_validate_conflicts() {
        let schema = provider_like();
        let d = data(&schema, json!({"credentials": "{}", "access_token": "t"}));

        let err = schema.validate(&d).unwrap_err();
        assert!(matches!(err, ProviderError::ConflictingAttributes(_, _)));
    }

    #[test]
    fn test_validate_empty_values_do_not_conflict() {
        let schema = provider_like();
        let d = data(&schema, json!({"credentials": "", "access_token": "t"}));
        assert!(schema.validate(&d).is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let schema = Schema::new().with_attribute("bucket", Attribute::required_string());
        let d = data(&schema, json!({}));

        let err = schema.validate(&d).unwrap_err();
        assert!(matches!(err, ProviderError::MissingAttribute(name) if name == "bucket"));
    }

    #[test]
    fn test_check_in_place_update_rejects_force_new_change() {
        let schema = Schema::new()
            .with_attribute("key", Attribute::required_string().force_new())
            .with_attribute("plaintext", Attribute::required_string());

        let changed = data(&schema, json!({"key": "k2", "plaintext": "p"}))
            .with_prior_state(json!({"key": "k1", "plaintext": "p"}))
            .unwrap();
        let err = schema.check_in_place_update(&changed).unwrap_err();
        assert!(matches!(err, ProviderError::RequiresReplace(name) if name == "key"));

        let unchanged = data(&schema, json!({"key": "k1", "plaintext": "p2"}))
            .with_prior_state(json!({"key": "k1", "plaintext": "p"}))
            .unwrap();
        assert!(schema.check_in_place_update(&unchanged).is_ok());
    }

    #[test]
    fn test_apply_env_defaults_first_set_wins() {
        let schema = provider_like();
        let mut d = data(&schema, json!({}));

        schema
            .apply_env_defaults(&mut d, |k| match k {
                "CREDS_A" => Some(String::new()),
                "CREDS_B" => Some("/tmp/creds.json".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(d.get_str("credentials").unwrap(), "/tmp/creds.json");
        assert_eq!(d.get("access_token"), None);
    }

    #[test]
    fn test_apply_env_defaults_keeps_explicit_values() {
        let schema = provider_like();
        let mut d = data(&schema, json!({"access_token": "explicit"}));

        schema
            .apply_env_defaults(&mut d, |_| Some("from-env".to_string()))
            .unwrap();

        assert_eq!(d.get_str("access_token").unwrap(), "explicit");
    }
}
