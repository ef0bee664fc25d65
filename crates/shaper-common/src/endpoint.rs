use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the client reaches the storage service.
///
/// The service advertises a fixed number of peer addresses depending on the
/// endpoint, which determines how many hosts the driver opens connections to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointType {
    /// Private endpoint: one host per availability zone.
    #[default]
    Vpc,
    /// Public endpoint.
    Public,
}

/// Peer addresses exposed through the public endpoint.
pub const PUBLIC_ENDPOINT_DEFAULT_HOSTS: u32 = 9;

/// Peer addresses exposed through a private (VPC) endpoint.
pub const VPC_ENDPOINT_DEFAULT_HOSTS: u32 = 2;

impl EndpointType {
    /// Number of hosts the driver sees by default for this endpoint.
    pub fn default_hosts(self) -> u32 {
        match self {
            EndpointType::Vpc => VPC_ENDPOINT_DEFAULT_HOSTS,
            EndpointType::Public => PUBLIC_ENDPOINT_DEFAULT_HOSTS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointType::Vpc => "VPC",
            EndpointType::Public => "PUBLIC",
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown endpoint type '{0}', expected VPC or PUBLIC")]
pub struct ParseEndpointTypeError(String);

impl FromStr for EndpointType {
    type Err = ParseEndpointTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VPC" => Ok(EndpointType::Vpc),
            "PUBLIC" => Ok(EndpointType::Public),
            _ => Err(ParseEndpointTypeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        assert_eq!(EndpointType::Vpc.to_string(), "VPC");
        assert_eq!(EndpointType::Public.to_string(), "PUBLIC");
    }

    #[test]
    fn test_endpoint_from_str() {
        assert_eq!("PUBLIC".parse::<EndpointType>(), Ok(EndpointType::Public));
        assert_eq!("vpc".parse::<EndpointType>(), Ok(EndpointType::Vpc));
        assert!("private".parse::<EndpointType>().is_err());
    }

    #[test]
    fn test_endpoint_default_hosts() {
        assert_eq!(EndpointType::Vpc.default_hosts(), 2);
        assert_eq!(EndpointType::Public.default_hosts(), 9);
        assert_eq!(EndpointType::default(), EndpointType::Vpc);
    }

    #[test]
    fn test_endpoint_serde_uses_uppercase_names() {
        let json = serde_json::to_string(&EndpointType::Public).unwrap();
        assert_eq!(json, "\"PUBLIC\"");
        let parsed: EndpointType = serde_json::from_str("\"VPC\"").unwrap();
        assert_eq!(parsed, EndpointType::Vpc);
    }
}
