//! # campanile-registry: Trusted resources
//!
//! The registry of administrator-curated trusted resources that adaptive
//! authentication conditions reference by id:
//!
//! - **Locations** - country/city, optionally pinned to CIDR blocks
//! - **Devices** - managed device type + OS version prefix
//! - **Time ranges** - recurring weekday/time-of-day windows
//! - **IP ranges** - single CIDR blocks, whitelist or blacklist flavored
//!
//! One registry is shared across every role's authentication chain within a
//! tenant. Removal never cascades into referencing chains; the evaluation
//! layer treats dangling references as non-membership and
//! [`ResourceRegistry::missing_ids`] reports them.
//!
//! ## Example
//!
//! ```
//! use campanile_registry::{ClientContext, ResourceRegistry};
//! use chrono::Utc;
//!
//! let mut registry = ResourceRegistry::new();
//! let campus = registry
//!     .add_location("Main campus", "HQ network", "Germany", "Munich", &["10.0.0.0/8"])
//!     .unwrap();
//!
//! let ctx = ClientContext::at(Utc::now())
//!     .with_country("Germany")
//!     .with_city("Munich")
//!     .with_ip("10.1.2.3".parse().unwrap());
//!
//! let resource = registry.get(&campus).unwrap();
//! assert!(resource.matches(&ctx));
//! ```

pub mod cidr;
pub mod registry;
pub mod resource;

pub use cidr::{Cidr, CidrParseError};
pub use registry::{RegistryError, ResourceRegistry};
pub use resource::{ClientContext, IpRangeMode, ResourceDetail, ResourceKind, TrustedResource};
