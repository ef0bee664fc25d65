//! Session settings advisor.
//!
//! Inspects the driver-level settings that surround the traffic-shaping
//! policies and reports the ones known to work poorly against the storage
//! service. Advisories are logged and returned; nothing here rejects a
//! configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// Per-connection request quota enforced by the service.
pub const SERVICE_MAX_REQUESTS_PER_CONNECTION: u32 = 3000;

/// Retry policy selected in the session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicyKind {
    /// The driver's stock policy.
    #[default]
    DriverDefault,
    /// Fixed number of immediate retries on the same host.
    FixedCount,
    /// Capped exponential backoff.
    Exponential,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown retry policy '{0}', expected driver-default, fixed-count or exponential")]
pub struct ParseRetryPolicyError(String);

impl FromStr for RetryPolicyKind {
    type Err = ParseRetryPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "driver-default" | "default" => Ok(RetryPolicyKind::DriverDefault),
            "fixed-count" | "fixed" => Ok(RetryPolicyKind::FixedCount),
            "exponential" => Ok(RetryPolicyKind::Exponential),
            _ => Err(ParseRetryPolicyError(s.to_string())),
        }
    }
}

/// Snapshot of the session settings relevant to the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub hostname_validation: bool,
    pub reconnect_on_init: bool,
    pub retry_policy: RetryPolicyKind,
    pub local_datacenter: Option<String>,
    pub supported_regions: Vec<String>,
    pub contact_points: Vec<String>,
    pub protocol_version: Option<String>,
    pub local_pool_size: u32,
    pub remote_pool_size: u32,
    pub max_requests_per_connection: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            hostname_validation: true,
            reconnect_on_init: false,
            retry_policy: RetryPolicyKind::DriverDefault,
            local_datacenter: None,
            supported_regions: vec!["us-east-1".to_string(), "us-east-2".to_string()],
            contact_points: Vec::new(),
            protocol_version: None,
            local_pool_size: 1,
            remote_pool_size: 1,
            max_requests_per_connection: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryCode {
    HostnameValidation,
    ReconnectOnInit,
    DefaultRetryPolicy,
    UnknownLocalDatacenter,
    ContactPoints,
    ProtocolVersion,
    RemotePoolSize,
    RequestsPerConnection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub code: AdvisoryCode,
    pub message: String,
}

impl Advisory {
    fn new(code: AdvisoryCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Checks `settings` and returns every advisory that applies.
///
/// Each advisory is also emitted as a `warn!` line. The throughput formula
/// for the configured local pool size is always logged at info level.
pub fn advise(settings: &SessionSettings) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    if settings.hostname_validation {
        advisories.push(Advisory::new(
            AdvisoryCode::HostnameValidation,
            "hostname validation should be disabled for the service endpoint",
        ));
    }
    if !settings.reconnect_on_init {
        advisories.push(Advisory::new(
            AdvisoryCode::ReconnectOnInit,
            "reconnect-on-init is recommended so sessions survive a failed first connection",
        ));
    }
    if settings.retry_policy == RetryPolicyKind::DriverDefault {
        advisories.push(Advisory::new(
            AdvisoryCode::DefaultRetryPolicy,
            "replace the driver's default retry policy with the fixed-count or exponential retry scheduler",
        ));
    }
    let dc_known = settings
        .local_datacenter
        .as_ref()
        .is_some_and(|dc| settings.supported_regions.iter().any(|r| r == dc));
    if !dc_known {
        advisories.push(Advisory::new(
            AdvisoryCode::UnknownLocalDatacenter,
            format!(
                "local datacenter {:?} not found in the list of supported regions",
                settings.local_datacenter
            ),
        ));
    }
    if settings.contact_points.len() != 1 {
        advisories.push(Advisory::new(
            AdvisoryCode::ContactPoints,
            format!(
                "exactly one contact point is required, {} configured",
                settings.contact_points.len()
            ),
        ));
    }
    if let Some(version) = &settings.protocol_version {
        if !version.eq_ignore_ascii_case("V4") {
            advisories.push(Advisory::new(
                AdvisoryCode::ProtocolVersion,
                format!("protocol version V4 is recommended, {} configured", version),
            ));
        }
    }
    if settings.remote_pool_size > 1 {
        advisories.push(Advisory::new(
            AdvisoryCode::RemotePoolSize,
            format!(
                "remote connections are not used by the service, remote pool size {} can be set to 1",
                settings.remote_pool_size
            ),
        ));
    }
    if settings.max_requests_per_connection > SERVICE_MAX_REQUESTS_PER_CONNECTION {
        advisories.push(Advisory::new(
            AdvisoryCode::RequestsPerConnection,
            format!(
                "max requests per connection {} exceeds the service quota of {}",
                settings.max_requests_per_connection, SERVICE_MAX_REQUESTS_PER_CONNECTION
            ),
        ));
    }

    for advisory in &advisories {
        warn!("Session advisor: {}", advisory.message);
    }

    info!(
        "Session advisor: available throughput per session is connections ({}) * {} * number of peers",
        settings.local_pool_size, SERVICE_MAX_REQUESTS_PER_CONNECTION
    );

    advisories
}

/// Outcome of counting the peers the service advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAssessment {
    NoPeers,
    SinglePeer,
    Peers(usize),
}

/// Classifies and logs the number of peers found in the peers table.
pub fn assess_peer_count(peers: usize) -> PeerAssessment {
    match peers {
        0 => {
            warn!("Session advisor: no peers found");
            PeerAssessment::NoPeers
        }
        1 => {
            warn!(
                "Session advisor: only one peer detected, expected one per availability zone \
                 for a private endpoint or 9 for the public endpoint"
            );
            PeerAssessment::SinglePeer
        }
        n => {
            info!("Session advisor: total number of peers {}", n);
            PeerAssessment::Peers(n)
        }
    }
}
