//! Command-line arguments.
//!
//! Parsed with `argh`. Every subcommand is a read-only diagnostic: nothing
//! here opens a connection.

use argh::FromArgs;
use shaper_common::advisor::RetryPolicyKind;
use shaper_common::EndpointType;

/// shaper - inspect traffic-shaping settings for a server-balanced store
#[derive(FromArgs, Debug)]
pub struct Cli {
    #[argh(subcommand)]
    pub command: Commands,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
pub enum Commands {
    Recommend(RecommendArgs),
    Check(CheckArgs),
    Simulate(SimulateArgs),
    Backoff(BackoffArgs),
    Advise(AdviseArgs),
    Plan(PlanArgs),
}

impl Commands {
    /// Whether the command prints machine-readable output.
    pub fn wants_json(&self) -> bool {
        match self {
            Commands::Check(args) => args.json,
            Commands::Simulate(args) => args.json,
            _ => false,
        }
    }
}

/// Arguments for sizing the connection pool.
///
/// # Example
///
/// ```bash
/// shaper recommend --rate 40000 --hosts 9
/// ```
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "recommend")]
/// print the connections per host needed for a request rate
pub struct RecommendArgs {
    /// sustained requests per second
    #[argh(option, short = 'r')]
    pub rate: f64,

    /// number of hosts; defaults to the endpoint's advertised count
    #[argh(option, short = 'H')]
    pub hosts: Option<u32>,

    /// endpoint type, VPC or PUBLIC
    #[argh(option, default = "EndpointType::Vpc")]
    pub endpoint: EndpointType,

    /// requests per second one connection can carry
    #[argh(option, default = "2000")]
    pub ceiling: u32,
}

/// Arguments for validating a throttle configuration.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "check")]
/// validate a throttle configuration and print it
pub struct CheckArgs {
    /// sustained requests per second
    #[argh(option, short = 'r', default = "1000.0")]
    pub rate: f64,

    /// number of hosts; defaults to the endpoint's advertised count
    #[argh(option, short = 'H')]
    pub hosts: Option<u32>,

    /// endpoint type, VPC or PUBLIC
    #[argh(option, default = "EndpointType::Vpc")]
    pub endpoint: EndpointType,

    /// connections per host
    #[argh(option, short = 'c', default = "1")]
    pub connections: u32,

    /// longest wait for admission, in milliseconds
    #[argh(option, default = "2000")]
    pub register_timeout_ms: u64,

    /// driver request timeout, in milliseconds
    #[argh(option, default = "2000")]
    pub request_timeout_ms: u64,

    /// print the configuration as JSON
    #[argh(switch)]
    pub json: bool,
}

/// Arguments for replaying an arrival pattern against a throttle.
///
/// Runs on a virtual clock, so a minute of traffic replays instantly.
///
/// # Example
///
/// ```bash
/// # 500 requests arriving every millisecond against 100 requests/s
/// shaper simulate --rate 100 --requests 500 --interval-us 1000
/// ```
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "simulate")]
/// replay arrivals against a throttle on virtual time
pub struct SimulateArgs {
    /// sustained requests per second
    #[argh(option, short = 'r')]
    pub rate: f64,

    /// number of requests to replay
    #[argh(option, short = 'n', default = "1000")]
    pub requests: u32,

    /// gap between two arrivals, in microseconds
    #[argh(option, default = "0")]
    pub interval_us: u64,

    /// number of hosts; defaults to the endpoint's advertised count
    #[argh(option, short = 'H')]
    pub hosts: Option<u32>,

    /// endpoint type, VPC or PUBLIC
    #[argh(option, default = "EndpointType::Vpc")]
    pub endpoint: EndpointType,

    /// connections per host
    #[argh(option, short = 'c', default = "1")]
    pub connections: u32,

    /// longest wait for admission, in milliseconds
    #[argh(option, default = "2000")]
    pub register_timeout_ms: u64,

    /// driver request timeout, in milliseconds
    #[argh(option, default = "2000")]
    pub request_timeout_ms: u64,

    /// print the report as JSON
    #[argh(switch)]
    pub json: bool,
}

/// Arguments for printing a retry schedule.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "backoff")]
/// print the retry wait window for every attempt
pub struct BackoffArgs {
    /// highest attempt number that is still retried
    #[argh(option, default = "3")]
    pub max_attempts: u32,

    /// wait before the first retry, in milliseconds
    #[argh(option, default = "10")]
    pub min_wait_ms: u64,

    /// cap for any single wait, in milliseconds
    #[argh(option, default = "50")]
    pub max_wait_ms: u64,

    /// print fixed waits instead of jitter windows
    #[argh(switch)]
    pub no_jitter: bool,
}

/// Arguments for sampling query plans over a synthetic topology.
///
/// Hosts are named `node-0`, `node-1`, ... and the first `--down` of them
/// are marked down.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "plan")]
/// show how often each host is tried first
pub struct PlanArgs {
    /// number of hosts in the local datacenter
    #[argh(option, short = 'H', default = "9")]
    pub hosts: u32,

    /// number of hosts that are down
    #[argh(option, default = "0")]
    pub down: u32,

    /// number of query plans to sample
    #[argh(option, default = "9000")]
    pub rounds: u32,

    /// local datacenter name
    #[argh(option, default = "\"us-east-1\".into()")]
    pub datacenter: String,
}

/// Arguments describing the driver session to review.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "advise")]
/// review session settings against the service's expectations
pub struct AdviseArgs {
    /// hostname validation is enabled
    #[argh(switch)]
    pub hostname_validation: bool,

    /// the driver reconnects when the first connection attempt fails
    #[argh(switch)]
    pub reconnect_on_init: bool,

    /// retry policy: driver-default, fixed-count or exponential
    #[argh(option, default = "RetryPolicyKind::DriverDefault")]
    pub retry_policy: RetryPolicyKind,

    /// local datacenter (region) name
    #[argh(option)]
    pub local_dc: Option<String>,

    /// contact point; repeat for several
    #[argh(option)]
    pub contact_point: Vec<String>,

    /// native protocol version, e.g. V4
    #[argh(option)]
    pub protocol: Option<String>,

    /// connections per local host
    #[argh(option, default = "1")]
    pub local_pool_size: u32,

    /// connections per remote host
    #[argh(option, default = "1")]
    pub remote_pool_size: u32,

    /// in-flight requests allowed per connection
    #[argh(option, default = "1024")]
    pub max_requests_per_connection: u32,

    /// number of peers reported by the service
    #[argh(option)]
    pub peers: Option<usize>,
}
