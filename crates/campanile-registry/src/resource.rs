//! Trusted resource types and context matching.
//!
//! A trusted resource is an administrator-curated fact about the world -
//! a campus location, a managed device profile, a working-hours window, or
//! an IP range - that authentication conditions can reference by id.

use std::fmt::{self, Display};
use std::net::Ipv4Addr;

use campanile_types::ResourceId;
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::cidr::Cidr;

// ============================================================================
// Resource Kind
// ============================================================================

/// The category of a trusted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Location,
    Device,
    TimeRange,
    IpRange,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Location => "location",
            ResourceKind::Device => "device",
            ResourceKind::TimeRange => "time_range",
            ResourceKind::IpRange => "ip_range",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Resource Detail
// ============================================================================

/// How an IP range entry is intended to be used.
///
/// The mode is advisory metadata for admin surfaces; the condition operator
/// (`In` / `NotIn`) decides whether membership grants or demands a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpRangeMode {
    Whitelist,
    Blacklist,
}

/// The kind-specific payload of a trusted resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDetail {
    /// A physical or logical place, optionally pinned to known IP ranges.
    Location {
        /// ISO country name or code, as entered by the administrator.
        country: String,
        /// City name; empty matches any city in the country.
        city: String,
        /// Optional CIDR blocks that requests from this location use.
        ip_ranges: Vec<Cidr>,
    },
    /// A managed device profile.
    Device {
        /// Device family, e.g. "laptop", "mobile"; compared case-insensitively.
        device_type: String,
        /// Minimum OS version prefix, e.g. "14."; empty matches any version.
        os_version: String,
    },
    /// A recurring time-of-day window on selected weekdays.
    TimeRange {
        start: NaiveTime,
        end: NaiveTime,
        days_of_week: Vec<Weekday>,
    },
    /// A single CIDR block.
    IpRange { cidr: Cidr, mode: IpRangeMode },
}

impl ResourceDetail {
    /// The category this payload belongs to.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDetail::Location { .. } => ResourceKind::Location,
            ResourceDetail::Device { .. } => ResourceKind::Device,
            ResourceDetail::TimeRange { .. } => ResourceKind::TimeRange,
            ResourceDetail::IpRange { .. } => ResourceKind::IpRange,
        }
    }
}

// ============================================================================
// Trusted Resource
// ============================================================================

/// A named trusted resource with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedResource {
    /// Unique id referenced by authentication conditions.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description for admin surfaces.
    pub description: String,
    #[serde(flatten)]
    pub detail: ResourceDetail,
}

impl TrustedResource {
    /// The category of this resource.
    pub fn kind(&self) -> ResourceKind {
        self.detail.kind()
    }

    /// Whether the given client context belongs to this resource.
    ///
    /// Per kind:
    /// - **Location**: country (and city, when the resource names one) must
    ///   match case-insensitively. When the resource lists IP ranges and the
    ///   context carries an IP, the IP must also fall in one of them.
    /// - **Device**: device type matches case-insensitively; a non-empty
    ///   resource OS version must be a prefix of the context's.
    /// - **`TimeRange`**: the timestamp's weekday is listed and its
    ///   time-of-day falls in `[start, end)`, wrapping midnight when
    ///   `end <= start`.
    /// - **`IpRange`**: the context IP falls inside the block. The mode is
    ///   not consulted here; membership is raw containment.
    ///
    /// A context missing the facts a kind needs (no IP for an IP range, no
    /// country for a location) does not belong to the resource.
    pub fn matches(&self, ctx: &ClientContext) -> bool {
        match &self.detail {
            ResourceDetail::Location {
                country,
                city,
                ip_ranges,
            } => {
                let country_ok = ctx
                    .country
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(country));
                let city_ok = city.is_empty()
                    || ctx
                        .city
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(city));
                let ip_ok = ip_ranges.is_empty()
                    || match ctx.ip {
                        Some(ip) => ip_ranges.iter().any(|range| range.contains(ip)),
                        // No IP in the context: fall back to the name match.
                        None => true,
                    };
                country_ok && city_ok && ip_ok
            }
            ResourceDetail::Device {
                device_type,
                os_version,
            } => {
                let type_ok = ctx
                    .device_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(device_type));
                let version_ok = os_version.is_empty()
                    || ctx
                        .os_version
                        .as_deref()
                        .is_some_and(|v| v.starts_with(os_version.as_str()));
                type_ok && version_ok
            }
            ResourceDetail::TimeRange {
                start,
                end,
                days_of_week,
            } => {
                let day_ok = days_of_week.contains(&ctx.timestamp.weekday());
                let tod = ctx.timestamp.time();
                let time_ok = if start < end {
                    *start <= tod && tod < *end
                } else {
                    // Overnight window, e.g. 22:00-06:00.
                    tod >= *start || tod < *end
                };
                day_ok && time_ok
            }
            ResourceDetail::IpRange { cidr, .. } => {
                ctx.ip.is_some_and(|ip| cidr.contains(ip))
            }
        }
    }
}

// ============================================================================
// Client Context
// ============================================================================

/// Runtime facts about the client being authenticated, matched against
/// trusted resources by membership conditions.
///
/// Every field except the timestamp is optional: contexts are assembled from
/// whatever signals the login pipeline could gather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientContext {
    pub country: Option<String>,
    pub city: Option<String>,
    pub ip: Option<Ipv4Addr>,
    pub device_type: Option<String>,
    pub os_version: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ClientContext {
    /// Creates an empty context at the given timestamp.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            country: None,
            city: None,
            ip: None,
            device_type: None,
            os_version: None,
            timestamp,
        }
    }

    /// Sets the geolocated country.
    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    /// Sets the geolocated city.
    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    /// Sets the source IP.
    pub fn with_ip(mut self, ip: Ipv4Addr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Sets the device type and OS version.
    pub fn with_device(mut self, device_type: &str, os_version: &str) -> Self {
        self.device_type = Some(device_type.to_string());
        self.os_version = Some(os_version.to_string());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx_at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> ClientContext {
        let ts = Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap();
        ClientContext::at(ts)
    }

    fn resource(detail: ResourceDetail) -> TrustedResource {
        TrustedResource {
            id: ResourceId::generate(),
            name: "test".to_string(),
            description: String::new(),
            detail,
        }
    }

    #[test]
    fn test_location_matches_country_and_city() {
        let campus = resource(ResourceDetail::Location {
            country: "Germany".to_string(),
            city: "Munich".to_string(),
            ip_ranges: vec![],
        });

        let on_campus = ctx_at(2025, 3, 10, 9, 0)
            .with_country("germany")
            .with_city("MUNICH");
        assert!(campus.matches(&on_campus));

        let wrong_city = ctx_at(2025, 3, 10, 9, 0)
            .with_country("Germany")
            .with_city("Berlin");
        assert!(!campus.matches(&wrong_city));

        let no_facts = ctx_at(2025, 3, 10, 9, 0);
        assert!(!campus.matches(&no_facts));
    }

    #[test]
    fn test_location_ip_ranges_constrain_when_ip_known() {
        let campus = resource(ResourceDetail::Location {
            country: "Germany".to_string(),
            city: String::new(),
            ip_ranges: vec![Cidr::parse("10.20.0.0/16").unwrap()],
        });

        let inside = ctx_at(2025, 3, 10, 9, 0)
            .with_country("Germany")
            .with_ip("10.20.3.4".parse().unwrap());
        assert!(campus.matches(&inside));

        let outside = ctx_at(2025, 3, 10, 9, 0)
            .with_country("Germany")
            .with_ip("10.99.0.1".parse().unwrap());
        assert!(!campus.matches(&outside));

        // Without an IP the name match alone decides.
        let unknown_ip = ctx_at(2025, 3, 10, 9, 0).with_country("Germany");
        assert!(campus.matches(&unknown_ip));
    }

    #[test]
    fn test_device_type_and_version_prefix() {
        let managed = resource(ResourceDetail::Device {
            device_type: "laptop".to_string(),
            os_version: "14.".to_string(),
        });

        let ok = ctx_at(2025, 3, 10, 9, 0).with_device("Laptop", "14.3.1");
        assert!(managed.matches(&ok));

        let old = ctx_at(2025, 3, 10, 9, 0).with_device("laptop", "13.6");
        assert!(!managed.matches(&old));

        let phone = ctx_at(2025, 3, 10, 9, 0).with_device("mobile", "14.3.1");
        assert!(!managed.matches(&phone));
    }

    #[test]
    fn test_time_range_daytime_window() {
        let office_hours = resource(ResourceDetail::TimeRange {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            days_of_week: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed],
        });

        // Monday 2025-03-10.
        assert!(office_hours.matches(&ctx_at(2025, 3, 10, 9, 0)));
        assert!(office_hours.matches(&ctx_at(2025, 3, 10, 16, 59)));
        assert!(!office_hours.matches(&ctx_at(2025, 3, 10, 17, 0)));
        // Saturday 2025-03-15.
        assert!(!office_hours.matches(&ctx_at(2025, 3, 15, 10, 0)));
    }

    #[test]
    fn test_time_range_wraps_midnight() {
        let night_shift = resource(ResourceDetail::TimeRange {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            days_of_week: vec![Weekday::Mon],
        });

        assert!(night_shift.matches(&ctx_at(2025, 3, 10, 23, 0)));
        assert!(night_shift.matches(&ctx_at(2025, 3, 10, 2, 0)));
        assert!(!night_shift.matches(&ctx_at(2025, 3, 10, 12, 0)));
    }

    #[test]
    fn test_ip_range_needs_an_ip() {
        let vpn = resource(ResourceDetail::IpRange {
            cidr: Cidr::parse("172.16.0.0/12").unwrap(),
            mode: IpRangeMode::Whitelist,
        });

        let inside = ctx_at(2025, 3, 10, 9, 0).with_ip("172.20.1.1".parse().unwrap());
        assert!(vpn.matches(&inside));

        let no_ip = ctx_at(2025, 3, 10, 9, 0);
        assert!(!vpn.matches(&no_ip));
    }

    #[test]
    fn test_resource_serde_roundtrip() {
        let res = resource(ResourceDetail::IpRange {
            cidr: Cidr::parse("192.0.2.0/24").unwrap(),
            mode: IpRangeMode::Blacklist,
        });
        let json = serde_json::to_string(&res).unwrap();
        let back: TrustedResource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, res);
        assert_eq!(back.kind(), ResourceKind::IpRange);
    }
}
