// crates/github-mcp-server/src/catalogue.rs
// ============================================================================
// Module: Operation Catalogue
// Description: Gated view over the operation registry.
// Purpose: Decide which operations are visible and callable.
// Dependencies: github-mcp-contract, thiserror
// ============================================================================

//! ## Overview
//! A [`Catalogue`] maps canonical toolset names to registry entries plus an
//! enabled flag. The read-only flag is applied when listing and looking up,
//! never by removing entries, so the registry stays the single source of
//! truth and each server instance only filters its own view.
//!
//! [`SharedCatalogue`] holds the current view behind a lock. Runtime enables
//! replace the view atomically; callers holding an older snapshot keep seeing
//! it until their request finishes.
//!
//! ## Invariants
//! - Listing is deterministic: toolsets by name, operations in registration
//!   order.
//! - A name outside the active view is never dispatched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use github_mcp_config::ALL_TOOLSETS;
use github_mcp_contract::OperationDescriptor;
use github_mcp_contract::OperationSetSpec;
use github_mcp_contract::normalize_set_name;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalogue errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogueError {
    /// The name does not match any registered toolset.
    #[error("toolset {0} does not exist")]
    UnknownSet(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Registered toolset and its enabled flag.
#[derive(Debug, Clone)]
pub struct OperationSet {
    /// Registry entry.
    spec: Arc<OperationSetSpec>,
    /// Whether the set is part of the active view.
    enabled: bool,
}

/// Toolset summary for discovery listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolsetSummary {
    /// Canonical toolset name.
    pub name: &'static str,
    /// Toolset description.
    pub description: &'static str,
    /// Whether the set is part of the active view.
    pub enabled: bool,
}

/// Result of a runtime enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// The set was disabled and is now enabled.
    Enabled,
    /// The set was already enabled; the view is unchanged.
    AlreadyEnabled,
}

// ============================================================================
// SECTION: Catalogue
// ============================================================================

/// Immutable gated view over the registry.
#[derive(Debug, Clone)]
pub struct Catalogue {
    /// Toolsets keyed by canonical name.
    sets: BTreeMap<&'static str, OperationSet>,
    /// Hide and refuse mutating operations.
    read_only: bool,
}

impl Catalogue {
    /// Builds a catalogue from the registry, the configured set names, and the
    /// read-only flag.
    ///
    /// Names are normalized before matching; `all` enables every set. A set
    /// is enabled only when `enabled_set_names` names it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::UnknownSet`] for a name that matches no set.
    pub fn build(
        registry: Vec<OperationSetSpec>,
        enabled_set_names: &[String],
        read_only: bool,
    ) -> Result<Self, CatalogueError> {
        let mut sets: BTreeMap<&'static str, OperationSet> = registry
            .into_iter()
            .map(|spec| {
                (
                    spec.name,
                    OperationSet {
                        spec: Arc::new(spec),
                        enabled: false,
                    },
                )
            })
            .collect();
        for raw in enabled_set_names {
            let name = normalize_set_name(raw);
            if name == ALL_TOOLSETS {
                sets.values_mut().for_each(|set| set.enabled = true);
                continue;
            }
            let set = sets.get_mut(name.as_str()).ok_or(CatalogueError::UnknownSet(name.clone()))?;
            set.enabled = true;
        }
        Ok(Self {
            sets,
            read_only,
        })
    }

    /// Returns whether mutating operations are hidden.
    #[must_use]
    pub const fn read_only(&self) -> bool {
        self.read_only
    }

    /// Lists the active operations: enabled sets ordered by name, operations
    /// in registration order, mutating operations dropped in read-only mode.
    #[must_use]
    pub fn list_active(&self) -> Vec<&OperationDescriptor> {
        self.sets
            .values()
            .filter(|set| set.enabled)
            .flat_map(|set| self.visible(&set.spec))
            .collect()
    }

    /// Looks up an operation in the active view.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&OperationDescriptor> {
        self.sets
            .values()
            .filter(|set| set.enabled)
            .flat_map(|set| self.visible(&set.spec))
            .find(|op| op.name == name)
    }

    /// Returns a view with the named set enabled.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::UnknownSet`] when no set matches `name`; the
    /// receiver is left unchanged.
    pub fn enable_set(&self, name: &str) -> Result<Self, CatalogueError> {
        let key = self.resolve(name)?;
        let mut next = self.clone();
        if let Some(set) = next.sets.get_mut(key) {
            set.enabled = true;
        }
        Ok(next)
    }

    /// Returns whether the named set is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::UnknownSet`] when no set matches `name`.
    pub fn is_enabled(&self, name: &str) -> Result<bool, CatalogueError> {
        let key = self.resolve(name)?;
        Ok(self.sets.get(key).is_some_and(|set| set.enabled))
    }

    /// Summarizes every registered set, ordered by name.
    #[must_use]
    pub fn list_sets(&self) -> Vec<ToolsetSummary> {
        self.sets
            .values()
            .map(|set| ToolsetSummary {
                name: set.spec.name,
                description: set.spec.description,
                enabled: set.enabled,
            })
            .collect()
    }

    /// Lists the operations a set exposes under the read-only flag, whether or
    /// not the set is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::UnknownSet`] when no set matches `name`.
    pub fn set_operations(&self, name: &str) -> Result<Vec<&OperationDescriptor>, CatalogueError> {
        let key = self.resolve(name)?;
        Ok(self.sets.get(key).map(|set| self.visible(&set.spec).collect()).unwrap_or_default())
    }

    /// Resolves a configuration-supplied name to its canonical key.
    fn resolve(&self, name: &str) -> Result<&'static str, CatalogueError> {
        let normalized = normalize_set_name(name);
        self.sets
            .get_key_value(normalized.as_str())
            .map(|(key, _)| *key)
            .ok_or(CatalogueError::UnknownSet(normalized))
    }

    /// Operations of `spec` visible under the read-only flag.
    fn visible<'a>(
        &self,
        spec: &'a OperationSetSpec,
    ) -> impl Iterator<Item = &'a OperationDescriptor> + use<'a> {
        let read_only = self.read_only;
        spec.operations.iter().filter(move |op| !(read_only && op.mutating))
    }
}

// ============================================================================
// SECTION: Shared Catalogue
// ============================================================================

/// Catalogue view shared across requests.
pub struct SharedCatalogue {
    /// Current view.
    current: RwLock<Arc<Catalogue>>,
}

impl SharedCatalogue {
    /// Wraps an initial view.
    #[must_use]
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalogue)),
        }
    }

    /// Returns the current view.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Catalogue> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Enables a set in the shared view.
    ///
    /// Enables are serialized by the write lock, so concurrent enables of
    /// different sets are never lost.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::UnknownSet`] when no set matches `name`.
    pub fn enable_set(&self, name: &str) -> Result<EnableOutcome, CatalogueError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.is_enabled(name)? {
            return Ok(EnableOutcome::AlreadyEnabled);
        }
        let next = current.enable_set(name)?;
        *current = Arc::new(next);
        Ok(EnableOutcome::Enabled)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use github_mcp_contract::operation_registry;

    use super::*;

    fn names(catalogue: &Catalogue) -> Vec<&'static str> {
        catalogue.list_active().into_iter().map(|op| op.name).collect()
    }

    #[test]
    fn empty_configuration_enables_nothing() {
        let catalogue = Catalogue::build(operation_registry(), &[], false).unwrap();
        assert!(names(&catalogue).is_empty());
        assert!(catalogue.lookup("get_me").is_none());
        assert!(catalogue.list_sets().iter().all(|set| !set.enabled));
    }

    #[test]
    fn all_enables_every_set() {
        let catalogue =
            Catalogue::build(operation_registry(), &["all".to_string()], false).unwrap();
        assert!(catalogue.list_sets().iter().all(|set| set.enabled));
        assert!(catalogue.lookup("merge_pull_request").is_some());
    }

    #[test]
    fn names_are_normalized() {
        let catalogue =
            Catalogue::build(operation_registry(), &["Pull-Requests".to_string()], false)
                .unwrap();
        assert!(catalogue.lookup("get_pull_request").is_some());
        assert!(catalogue.is_enabled("pull_requests").unwrap());
    }

    #[test]
    fn unknown_configured_set_is_rejected() {
        let err = Catalogue::build(operation_registry(), &["bogus".to_string()], false)
            .expect_err("unknown set");
        assert_eq!(err, CatalogueError::UnknownSet("bogus".to_string()));
        assert_eq!(err.to_string(), "toolset bogus does not exist");
    }

    #[test]
    fn active_listing_is_sorted_by_set_then_registration() {
        let catalogue = Catalogue::build(
            operation_registry(),
            &["users".to_string(), "issues".to_string()],
            true,
        )
        .unwrap();
        assert_eq!(
            names(&catalogue),
            vec![
                "get_issue",
                "search_issues",
                "list_issues",
                "get_issue_comments",
                "search_users",
            ]
        );
    }

    #[test]
    fn set_operations_respects_read_only_even_when_disabled() {
        let catalogue = Catalogue::build(operation_registry(), &[], true).unwrap();
        let ops = catalogue.set_operations("notifications").unwrap();
        assert!(!ops.is_empty());
        assert!(ops.iter().all(|op| !op.mutating));
        assert!(catalogue.lookup("list_notifications").is_none());
    }

    #[test]
    fn shared_enable_reports_outcome() {
        let shared =
            SharedCatalogue::new(Catalogue::build(operation_registry(), &[], false).unwrap());
        let before = shared.snapshot();
        assert_eq!(shared.enable_set("repos").unwrap(), EnableOutcome::Enabled);
        assert_eq!(shared.enable_set("repos").unwrap(), EnableOutcome::AlreadyEnabled);
        assert!(before.lookup("get_file_contents").is_none());
        assert!(shared.snapshot().lookup("get_file_contents").is_some());
    }
}
