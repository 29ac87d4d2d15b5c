//! Resources managed by schemactl
//!
//! Each declared schema property becomes one [`declarative::Resource`]:
//! current state comes from the service, desired state from the config file,
//! and apply runs a locked read-merge-replace through [`userschema::Client`].

pub mod schema_property;

pub use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
pub use schema_property::SchemaPropertyResource;
