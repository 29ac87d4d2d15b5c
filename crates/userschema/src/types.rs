//! Core types for user schema properties.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Type id the directory service uses for the default user type.
pub const DEFAULT_USER_TYPE: &str = "default";

/// Which schema document a property lives in.
///
/// Two scopes are distinct documents even when they share property indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SchemaScope {
    /// The default user type.
    Default,
    /// A custom user type, identified by its type id.
    Custom(String),
}

impl SchemaScope {
    /// Create a scope for a custom user type.
    ///
    /// `"default"` and the empty string map to [`SchemaScope::Default`].
    pub fn custom(type_id: impl Into<String>) -> Self {
        Self::from(type_id.into())
    }

    /// Build a scope from an optional user type, as written in configuration.
    pub fn from_user_type(user_type: Option<&str>) -> Self {
        user_type.map_or(Self::Default, Self::custom)
    }

    /// Type id used in remote URLs.
    pub fn type_id(&self) -> &str {
        match self {
            Self::Default => DEFAULT_USER_TYPE,
            Self::Custom(id) => id,
        }
    }

    /// Whether this is the default user type.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<String> for SchemaScope {
    fn from(type_id: String) -> Self {
        let trimmed = type_id.trim();
        if trimmed.is_empty() || trimmed == DEFAULT_USER_TYPE {
            Self::Default
        } else {
            Self::Custom(trimmed.to_string())
        }
    }
}

impl From<SchemaScope> for String {
    fn from(scope: SchemaScope) -> Self {
        scope.type_id().to_string()
    }
}

impl fmt::Display for SchemaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "user type '{DEFAULT_USER_TYPE}'"),
            Self::Custom(id) => write!(f, "user type '{id}'"),
        }
    }
}

/// Who may set a property from the user's own profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Visible but not editable by the user.
    ReadOnly,
    /// Visible and editable by the user.
    ReadWrite,
    /// Hidden from the user.
    Hide,
}

impl Permission {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "READ_ONLY",
            Self::ReadWrite => "READ_WRITE",
            Self::Hide => "HIDE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "READ_ONLY" => Ok(Self::ReadOnly),
            "READ_WRITE" => Ok(Self::ReadWrite),
            "HIDE" => Ok(Self::Hide),
            other => Err(format!("unknown permission: {other}")),
        }
    }
}

/// Primitive type tag of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    String,
    Boolean,
    Number,
    Integer,
    Array,
    Object,
}

impl PropertyType {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            other => Err(format!("unknown property type: {other}")),
        }
    }
}

/// One managed property of a user schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Stable key, unique within a scope.
    pub index: String,
    /// Human-readable label.
    pub title: String,
    /// Primitive type tag.
    #[serde(rename = "type")]
    pub kind: PropertyType,
    /// Whether a value is mandatory.
    #[serde(default)]
    pub required: bool,
    /// Self-service access level.
    pub permissions: Permission,
    /// Validation regex. `None` means no constraint, `Some("")` an explicitly
    /// cleared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Attribute fields this crate does not model (`minLength`, `enum`, `master`, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl SchemaProperty {
    /// Create a string property that is not required and has no pattern.
    pub fn new(index: impl Into<String>, title: impl Into<String>, permissions: Permission) -> Self {
        Self {
            index: index.into(),
            title: title.into(),
            kind: PropertyType::String,
            required: false,
            permissions,
            pattern: None,
            extra: Map::new(),
        }
    }

    /// Set whether the property is required.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the validation pattern (`""` clears it explicitly).
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set the permission level.
    pub fn with_permissions(mut self, permissions: Permission) -> Self {
        self.permissions = permissions;
        self
    }

    /// Check the fields the core relies on.
    pub fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            return Err(Error::invalid("", "index must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(Error::invalid(&self.index, "title must not be empty"));
        }
        if let Some(pattern) = self.pattern.as_deref().filter(|p| !p.is_empty()) {
            regex::Regex::new(pattern).map_err(|e| {
                Error::invalid(&self.index, format!("pattern is not a valid regex: {e}"))
            })?;
        }
        Ok(())
    }

    /// Whether `observed` already reflects every managed field of `self`.
    ///
    /// A desired `Some("")` pattern is also satisfied by an absent pattern:
    /// the service may drop an emptied constraint instead of storing `""`.
    pub fn is_satisfied_by(&self, observed: &SchemaProperty) -> bool {
        let pattern_matches = match (self.pattern.as_deref(), observed.pattern.as_deref()) {
            (Some(""), None) => true,
            (desired, actual) => desired == actual,
        };

        self.index == observed.index
            && self.title == observed.title
            && self.kind == observed.kind
            && self.required == observed.required
            && self.permissions == observed.permissions
            && pattern_matches
    }

    /// One-line summary of the managed fields.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} \"{}\" {} {}",
            self.kind,
            self.title,
            self.permissions,
            if self.required { "required" } else { "optional" }
        );
        match self.pattern.as_deref() {
            Some("") => out.push_str(" pattern=\"\""),
            Some(p) => out.push_str(&format!(" pattern={p}")),
            None => {}
        }
        out
    }
}

/// Desired state as authored by a caller, before validation.
///
/// Optional fields receive their defaults in [`PropertySpec::into_property`],
/// except `permissions`, which has no default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySpec {
    /// Stable key of the property.
    pub index: String,
    /// Human-readable label.
    #[serde(default)]
    pub title: Option<String>,
    /// Primitive type tag (defaults to `string`).
    #[serde(default, rename = "type")]
    pub kind: Option<PropertyType>,
    /// Defaults to `false`.
    #[serde(default)]
    pub required: Option<bool>,
    /// Mandatory.
    #[serde(default)]
    pub permissions: Option<Permission>,
    /// Validation regex; `""` clears an existing one.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Custom user type id; absent means the default user type.
    #[serde(default)]
    pub user_type: Option<String>,
}

impl PropertySpec {
    /// Scope the property belongs to.
    pub fn scope(&self) -> SchemaScope {
        SchemaScope::from_user_type(self.user_type.as_deref())
    }

    /// Validate and fill in defaults.
    pub fn into_property(self) -> Result<SchemaProperty> {
        let permissions = self
            .permissions
            .ok_or_else(|| Error::invalid(&self.index, "permissions must be set"))?;

        let property = SchemaProperty {
            title: self.title.unwrap_or_default(),
            kind: self.kind.unwrap_or_default(),
            required: self.required.unwrap_or(false),
            permissions,
            pattern: self.pattern,
            extra: Map::new(),
            index: self.index,
        };
        property.validate()?;
        Ok(property)
    }
}

/// Configuration for retry and polling loops.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (at least one is always made)
    pub max_attempts: u32,
    /// Base delay between attempts
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(5),
        }
    }

    /// Default settings for convergence polling: more attempts, gentler growth.
    pub fn polling() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            backoff_factor: 1.5,
            max_delay: Duration::from_secs(5),
        }
    }

    /// Fixed-interval attempts without any delay growth.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: interval,
            backoff_factor: 1.0,
            max_delay: interval,
        }
    }

    /// Number of attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Knobs for a reconciliation or lookup call.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Retry policy for fetching the current document.
    pub fetch_retry: RetryConfig,
    /// Polling policy for confirming convergence after a replace.
    pub poll: RetryConfig,
    /// Overall deadline for one call, including time spent waiting for the lock.
    pub timeout: Option<Duration>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            fetch_retry: RetryConfig::default(),
            poll: RetryConfig::polling(),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl ReconcileOptions {
    /// Absolute deadline for a call starting now.
    ///
    /// A timeout too large to represent means no deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.timeout.and_then(|t| Instant::now().checked_add(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_user_type() {
        assert_eq!(SchemaScope::from_user_type(None), SchemaScope::Default);
        assert_eq!(
            SchemaScope::from_user_type(Some("default")),
            SchemaScope::Default
        );
        assert_eq!(
            SchemaScope::from_user_type(Some("oty1abc")),
            SchemaScope::Custom("oty1abc".into())
        );
        assert_eq!(SchemaScope::custom("oty1abc").type_id(), "oty1abc");
        assert_eq!(SchemaScope::Default.type_id(), "default");
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("READ_ONLY".parse::<Permission>(), Ok(Permission::ReadOnly));
        assert_eq!("read_write".parse::<Permission>(), Ok(Permission::ReadWrite));
        assert_eq!("HIDE".parse::<Permission>(), Ok(Permission::Hide));
        assert!("WRITE_ONLY".parse::<Permission>().is_err());
    }

    #[test]
    fn test_spec_defaults_required_to_false() {
        let spec = PropertySpec {
            index: "firstName".into(),
            title: Some("First name".into()),
            permissions: Some(Permission::ReadOnly),
            ..Default::default()
        };
        let property = spec.into_property().unwrap();
        assert!(!property.required);
        assert_eq!(property.kind, PropertyType::String);
        assert_eq!(property.pattern, None);
    }

    #[test]
    fn test_spec_without_permissions_is_invalid() {
        let spec = PropertySpec {
            index: "firstName".into(),
            title: Some("First name".into()),
            ..Default::default()
        };
        let err = spec.into_property().unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Invalid);
        assert!(err.to_string().contains("permissions"));
    }

    #[test]
    fn test_spec_rejects_bad_pattern() {
        let spec = PropertySpec {
            index: "login".into(),
            title: Some("Username".into()),
            permissions: Some(Permission::ReadOnly),
            pattern: Some("[a-z".into()),
            ..Default::default()
        };
        assert!(spec.into_property().is_err());
    }

    #[test]
    fn test_spec_keeps_empty_pattern_distinct() {
        let spec = PropertySpec {
            index: "login".into(),
            title: Some("Username".into()),
            permissions: Some(Permission::ReadOnly),
            pattern: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(spec.into_property().unwrap().pattern, Some(String::new()));
    }

    #[test]
    fn test_is_satisfied_by_ignores_unmanaged_fields() {
        let desired = SchemaProperty::new("email", "Primary email", Permission::ReadOnly)
            .with_required(true);
        let mut observed = desired.clone();
        observed
            .extra
            .insert("maxLength".into(), Value::from(100));
        assert!(desired.is_satisfied_by(&observed));

        observed.permissions = Permission::ReadWrite;
        assert!(!desired.is_satisfied_by(&observed));
    }

    #[test]
    fn test_cleared_pattern_satisfied_by_absent_pattern() {
        let desired = SchemaProperty::new("login", "Username", Permission::ReadOnly).with_pattern("");
        let mut observed = desired.clone();
        observed.pattern = None;
        assert!(desired.is_satisfied_by(&observed));

        observed.pattern = Some("[a-z]+".into());
        assert!(!desired.is_satisfied_by(&observed));

        let unset = SchemaProperty::new("login", "Username", Permission::ReadOnly);
        assert!(!unset.is_satisfied_by(&observed));
    }

    #[test]
    fn test_retry_config_delay() {
        let config = RetryConfig::new(5, Duration::from_secs(1), 2.0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_config_always_attempts_once() {
        let config = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn test_deadline() {
        let options = ReconcileOptions {
            timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        let deadline = options.deadline().unwrap();
        assert!(deadline > Instant::now() + Duration::from_secs(59));

        let unlimited = ReconcileOptions {
            timeout: None,
            ..Default::default()
        };
        assert!(unlimited.deadline().is_none());
    }

    #[test]
    fn test_huge_timeout_means_no_deadline() {
        let options = ReconcileOptions {
            timeout: Some(Duration::from_secs(i64::MAX as u64)),
            ..Default::default()
        };
        assert!(options.deadline().is_none());
    }
}
