//! The trusted-resource registry.
//!
//! One registry is shared by every role's authentication chain within a
//! tenant. Resources are validated when added; removal is idempotent and
//! deliberately does **not** cascade into chains that reference the removed
//! id (see [`ResourceRegistry::missing_ids`] for the reporting side).

use std::collections::BTreeSet;

use campanile_types::ResourceId;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cidr::{Cidr, CidrParseError};
use crate::resource::{IpRangeMode, ResourceDetail, ResourceKind, TrustedResource};

/// Errors produced by registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A CIDR string could not be parsed.
    #[error(transparent)]
    InvalidCidr(#[from] CidrParseError),

    /// A time range with identical start and end is ambiguous (empty or
    /// full-day depending on reading) and is rejected.
    #[error("time range start and end are both {start}; pick distinct times")]
    InvalidTimeRange { start: NaiveTime },

    /// Resources need a display name.
    #[error("resource name must not be empty")]
    EmptyName,
}

type Result<T> = std::result::Result<T, RegistryError>;

// ============================================================================
// Resource Registry
// ============================================================================

/// Ordered collection of trusted resources, all kinds in one list.
///
/// Insertion order is preserved; admin surfaces list resources in the order
/// they were created, filtered by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRegistry {
    resources: Vec<TrustedResource>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trusted location. `city` may be empty (any city in the
    /// country); `ip_ranges` may be empty (no IP constraint).
    pub fn add_location(
        &mut self,
        name: &str,
        description: &str,
        country: &str,
        city: &str,
        ip_ranges: &[&str],
    ) -> Result<ResourceId> {
        let ip_ranges = ip_ranges
            .iter()
            .map(|s| Cidr::parse(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.push(
            name,
            description,
            ResourceDetail::Location {
                country: country.to_string(),
                city: city.to_string(),
                ip_ranges,
            },
        )
    }

    /// Adds a managed device profile. `os_version` may be empty (any
    /// version of the device type).
    pub fn add_device(
        &mut self,
        name: &str,
        description: &str,
        device_type: &str,
        os_version: &str,
    ) -> Result<ResourceId> {
        self.push(
            name,
            description,
            ResourceDetail::Device {
                device_type: device_type.to_string(),
                os_version: os_version.to_string(),
            },
        )
    }

    /// Adds a recurring time window. `end <= start` denotes an overnight
    /// window wrapping midnight; `end == start` is rejected as ambiguous.
    pub fn add_time_range(
        &mut self,
        name: &str,
        description: &str,
        start: NaiveTime,
        end: NaiveTime,
        days_of_week: Vec<Weekday>,
    ) -> Result<ResourceId> {
        if start == end {
            return Err(RegistryError::InvalidTimeRange { start });
        }
        self.push(
            name,
            description,
            ResourceDetail::TimeRange {
                start,
                end,
                days_of_week,
            },
        )
    }

    /// Adds an IP range.
    pub fn add_ip_range(
        &mut self,
        name: &str,
        description: &str,
        cidr: &str,
        mode: IpRangeMode,
    ) -> Result<ResourceId> {
        let cidr = Cidr::parse(cidr)?;
        self.push(name, description, ResourceDetail::IpRange { cidr, mode })
    }

    fn push(&mut self, name: &str, description: &str, detail: ResourceDetail) -> Result<ResourceId> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let id = ResourceId::generate();
        debug!(resource = %id, kind = %detail.kind(), name, "adding trusted resource");
        self.resources.push(TrustedResource {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            detail,
        });
        Ok(id)
    }

    /// Removes a resource by id. Returns whether anything was removed;
    /// removing an unknown id is a no-op.
    ///
    /// Conditions referencing the removed id are left dangling on purpose:
    /// the registry does not know its referrers. Callers surface danglers
    /// via [`ResourceRegistry::missing_ids`].
    pub fn remove(&mut self, id: &ResourceId) -> bool {
        let before = self.resources.len();
        self.resources.retain(|r| r.id != *id);
        let removed = self.resources.len() != before;
        if removed {
            debug!(resource = %id, "removed trusted resource");
        }
        removed
    }

    /// Looks up a resource by id.
    pub fn get(&self, id: &ResourceId) -> Option<&TrustedResource> {
        self.resources.iter().find(|r| r.id == *id)
    }

    /// Whether a resource with this id exists.
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.get(id).is_some()
    }

    /// The kind of the resource with this id, if present.
    pub fn kind_of(&self, id: &ResourceId) -> Option<ResourceKind> {
        self.get(id).map(TrustedResource::kind)
    }

    /// All resources, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TrustedResource> {
        self.resources.iter()
    }

    /// Resources of one kind, in insertion order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &TrustedResource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Of the given referenced ids, those not present in the registry.
    ///
    /// Deduplicated and sorted; the reporting half of the no-cascade removal
    /// policy.
    pub fn missing_ids<'a>(
        &self,
        referenced: impl IntoIterator<Item = &'a ResourceId>,
    ) -> Vec<ResourceId> {
        let missing: BTreeSet<ResourceId> = referenced
            .into_iter()
            .filter(|id| !self.contains(id))
            .cloned()
            .collect();
        missing.into_iter().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
