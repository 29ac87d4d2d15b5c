use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use userschema::{SchemaProperty, SchemaScope};

// ============================================================================
// State Structures
// ============================================================================

/// Everything schemactl remembers between runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchemaState {
    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Tracked properties keyed by `<typeId>/<index>`
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyRecord>,
}

impl Default for SchemaState {
    fn default() -> Self {
        Self {
            last_updated: Utc::now(),
            properties: BTreeMap::new(),
        }
    }
}

/// Last observed state of one managed property
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PropertyRecord {
    /// When schemactl last applied or imported it
    pub last_applied: DateTime<Utc>,

    /// Managed fields as the service reported them
    pub property: SchemaProperty,
}

// ============================================================================
// StateStore
// ============================================================================

/// State file plus its in-memory contents
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: SchemaState,
}

impl StateStore {
    /// Key under which a property is tracked
    pub fn key(scope: &SchemaScope, index: &str) -> String {
        format!("{}/{}", scope.type_id(), index)
    }

    /// Load state from the default state file
    pub fn load_default() -> Result<Self> {
        Self::load(&crate::paths::state_file()?)
    }

    /// Load state from disk, or start empty if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self {
                path: path.to_path_buf(),
                state: SchemaState::default(),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: SchemaState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    /// Save state to disk
    pub fn save(&mut self) -> Result<()> {
        self.state.last_updated = Utc::now();

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            toml::to_string_pretty(&self.state).context("Failed to serialize state to TOML")?;

        fs::write(&self.path, &content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remember the observed state of a property
    ///
    /// Unmanaged attribute fields are not stored.
    pub fn record(&mut self, scope: &SchemaScope, property: &SchemaProperty) {
        let property = SchemaProperty {
            extra: Map::new(),
            ..property.clone()
        };
        self.state.properties.insert(
            Self::key(scope, &property.index),
            PropertyRecord {
                last_applied: Utc::now(),
                property,
            },
        );
    }

    /// Stop tracking a property, returning whether it was tracked
    pub fn forget(&mut self, scope: &SchemaScope, index: &str) -> bool {
        self.state
            .properties
            .remove(&Self::key(scope, index))
            .is_some()
    }

    /// Tracked record for a property
    pub fn get(&self, scope: &SchemaScope, index: &str) -> Option<&PropertyRecord> {
        self.state.properties.get(&Self::key(scope, index))
    }

    /// Number of tracked properties
    pub fn len(&self) -> usize {
        self.state.properties.len()
    }
}
