//! In-process schema service.
//!
//! Behaves like the remote API where it matters to the core: whole-document
//! replace with last-writer-wins, optional read-after-write lag, and
//! injectable failures. Cloning shares the same underlying store.

use super::{RemoteResult, RemoteSchemaClient};
use crate::error::RemoteError;
use crate::types::SchemaScope;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// In-memory [`RemoteSchemaClient`].
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    documents: HashMap<SchemaScope, Value>,
    /// Previous snapshot still served to readers after a replace.
    stale: HashMap<SchemaScope, (Value, u32)>,
    fetch_failures: VecDeque<RemoteError>,
    replace_failures: VecDeque<RemoteError>,
    visibility_lag: u32,
    latency: Duration,
    fetches: usize,
    replaces: usize,
}

impl MemoryBackend {
    /// Create an empty service with no user types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service with the default user type and its standard base schema.
    pub fn with_default_schema() -> Self {
        let backend = Self::new();
        backend.seed(&SchemaScope::Default);
        backend
    }

    /// Create a user type with the standard base schema.
    pub fn seed(&self, scope: &SchemaScope) {
        self.insert_document(scope, default_schema_document(scope));
    }

    /// Store a document verbatim.
    pub fn insert_document(&self, scope: &SchemaScope, document: Value) {
        let mut state = self.state.lock();
        state.stale.remove(scope);
        state.documents.insert(scope.clone(), document);
    }

    /// Current authoritative document, bypassing any visibility lag.
    pub fn document(&self, scope: &SchemaScope) -> Option<Value> {
        self.state.lock().documents.get(scope).cloned()
    }

    /// Serve the previous snapshot for this many reads after each replace.
    pub fn set_visibility_lag(&self, reads: u32) {
        self.state.lock().visibility_lag = reads;
    }

    /// Delay every call by this much, outside the store lock.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Fail the next fetch with `error`. Failures queue up in order.
    pub fn fail_next_fetch(&self, error: RemoteError) {
        self.state.lock().fetch_failures.push_back(error);
    }

    /// Fail the next replace with `error`. Failures queue up in order.
    pub fn fail_next_replace(&self, error: RemoteError) {
        self.state.lock().replace_failures.push_back(error);
    }

    /// Number of fetch calls served (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetches
    }

    /// Number of replace calls received (including failed ones).
    pub fn replace_count(&self) -> usize {
        self.state.lock().replaces
    }

    fn pause(&self) {
        let latency = self.state.lock().latency;
        if !latency.is_zero() {
            thread::sleep(latency);
        }
    }
}

impl RemoteSchemaClient for MemoryBackend {
    fn fetch_document(&self, scope: &SchemaScope) -> RemoteResult<Value> {
        self.pause();
        let mut state = self.state.lock();
        state.fetches += 1;

        if let Some(error) = state.fetch_failures.pop_front() {
            return Err(error);
        }

        if let Some((snapshot, remaining)) = state.stale.get_mut(scope) {
            let snapshot = snapshot.clone();
            *remaining -= 1;
            if *remaining == 0 {
                state.stale.remove(scope);
            }
            return Ok(snapshot);
        }

        state
            .documents
            .get(scope)
            .cloned()
            .ok_or_else(|| RemoteError::from_status(404, format!("{scope} not found")))
    }

    fn replace_document(&self, scope: &SchemaScope, document: &Value) -> RemoteResult<()> {
        self.pause();
        let mut state = self.state.lock();
        state.replaces += 1;

        if let Some(error) = state.replace_failures.pop_front() {
            return Err(error);
        }
        if !document.is_object() {
            return Err(RemoteError::from_status(400, "schema must be an object"));
        }

        if !state.documents.contains_key(scope) {
            return Err(RemoteError::from_status(404, format!("{scope} not found")));
        }

        let lag = state.visibility_lag;
        let previous = state
            .documents
            .insert(scope.clone(), document.clone())
            .unwrap_or_default();
        if lag > 0 {
            state.stale.insert(scope.clone(), (previous, lag));
        }
        Ok(())
    }
}

/// A user schema with the standard base properties, as a fresh org has it.
pub fn default_schema_document(scope: &SchemaScope) -> Value {
    let attribute = |title: &str, required: bool, extra: Value| {
        let mut attr = json!({
            "title": title,
            "type": "string",
            "required": required,
            "mutability": "READ_WRITE",
            "scope": "NONE",
            "master": { "type": "PROFILE_MASTER" },
            "permissions": [{ "principal": "SELF", "action": "READ_WRITE" }]
        });
        if let (Some(attr), Value::Object(extra)) = (attr.as_object_mut(), extra) {
            attr.extend(extra);
        }
        attr
    };

    json!({
        "id": format!("https://example.okta.com/meta/schemas/user/{}", scope.type_id()),
        "$schema": "http://json-schema.org/draft-04/schema#",
        "name": "user",
        "title": "User",
        "type": "object",
        "definitions": {
            "base": {
                "id": "#base",
                "type": "object",
                "properties": {
                    "login": attribute("Username", true, json!({ "minLength": 5, "maxLength": 100, "pattern": ".+" })),
                    "firstName": attribute("First name", true, json!({ "minLength": 1, "maxLength": 50 })),
                    "lastName": attribute("Last name", true, json!({ "minLength": 1, "maxLength": 50 })),
                    "middleName": attribute("Middle name", false, json!({})),
                    "email": attribute("Primary email", true, json!({ "format": "email" })),
                    "secondEmail": attribute("Secondary email", false, json!({ "format": "email" })),
                    "mobilePhone": attribute("Mobile phone", false, json!({ "maxLength": 100 })),
                    "title": attribute("Title", false, json!({}))
                },
                "required": ["login", "firstName", "lastName", "email"]
            },
            "custom": {
                "id": "#custom",
                "type": "object",
                "properties": {},
                "required": []
            }
        }
    })
}
