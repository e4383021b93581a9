//! Evaluation context for a login attempt.

use std::net::Ipv4Addr;

use campanile_registry::ClientContext;
use campanile_types::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything known about a login attempt when the chain is evaluated:
/// the scored risk level plus the client facts matched against trusted
/// resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Risk level assigned by the upstream risk scorer.
    pub risk: RiskLevel,
    /// Client facts (geo, IP, device, timestamp).
    pub client: ClientContext,
}

impl AuthContext {
    /// Creates a context with the given risk at a timestamp, no client
    /// facts yet.
    pub fn new(risk: RiskLevel, timestamp: DateTime<Utc>) -> Self {
        Self {
            risk,
            client: ClientContext::at(timestamp),
        }
    }

    /// Sets the geolocated country.
    pub fn with_country(mut self, country: &str) -> Self {
        self.client = self.client.with_country(country);
        self
    }

    /// Sets the geolocated city.
    pub fn with_city(mut self, city: &str) -> Self {
        self.client = self.client.with_city(city);
        self
    }

    /// Sets the source IP.
    pub fn with_ip(mut self, ip: Ipv4Addr) -> Self {
        self.client = self.client.with_ip(ip);
        self
    }

    /// Sets the device type and OS version.
    pub fn with_device(mut self, device_type: &str, os_version: &str) -> Self {
        self.client = self.client.with_device(device_type, os_version);
        self
    }
}
