//! Execution planner - builds resource execution plans

use crate::resource::{BoxedResource, Resource};

/// An execution plan with resources grouped by whether they may run concurrently
pub struct ExecutionPlan {
    /// Resources that may be applied in parallel
    pub parallel: Vec<BoxedResource>,
    /// Resources that must be applied one at a time, after the parallel batch
    pub sequential: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            parallel: Vec::new(),
            sequential: Vec::new(),
        }
    }

    /// Add a resource to the plan, classifying by `can_parallelize`
    pub fn add_resource(&mut self, resource: BoxedResource) {
        if resource.can_parallelize() {
            self.parallel.push(resource);
        } else {
            self.sequential.push(resource);
        }
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            parallel: self
                .parallel
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
            sequential: self
                .sequential
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name", where name may itself
    /// contain dots.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// All resources in execution order
    pub fn resources(&self) -> impl Iterator<Item = &BoxedResource> {
        self.parallel.iter().chain(&self.sequential)
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.parallel.len() + self.sequential.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.parallel.is_empty() && self.sequential.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((resource_type, name)) if !resource_type.is_empty() => {
            (Some(resource_type.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "properties" | "schema" => resource.resource_type() == "schema_property",
            _ => resource.resource_type() == rt || resource.resource_type().starts_with(rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}
