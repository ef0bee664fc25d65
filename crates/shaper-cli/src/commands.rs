//! Subcommand implementations.
//!
//! Each command returns the text to print so it can be tested without
//! capturing stdout.

use crate::cli::{
    AdviseArgs, BackoffArgs, CheckArgs, Commands, PlanArgs, RecommendArgs, SimulateArgs,
};
use anyhow::{Context, Result};
use serde::Serialize;
use shaper_common::advisor::{self, PeerAssessment, SessionSettings};
use shaper_balancer::{RandomNodeOrderer, Topology};
use shaper_common::{Clock, EndpointType, ManualClock, Node};
use shaper_retry::{RetryConfig, RetryScheduler};
use shaper_throttle::{
    recommended_connections_with_ceiling, AdmissionThrottle, RejectReason, ThrottleConfig,
};
use std::fmt::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::info;

/// Runs one subcommand and returns its output.
pub async fn run(command: Commands) -> Result<String> {
    match command {
        Commands::Recommend(args) => Ok(recommend(&args)),
        Commands::Check(args) => check(&args),
        Commands::Simulate(args) => {
            let json = args.json;
            let report = simulate(&args).await?;
            if json {
                Ok(serde_json::to_string_pretty(&report)?)
            } else {
                Ok(report.to_string())
            }
        }
        Commands::Backoff(args) => backoff(&args),
        Commands::Advise(args) => Ok(advise(&args)),
        Commands::Plan(args) => plan(&args),
    }
}

fn hosts_for(hosts: Option<u32>, endpoint: EndpointType) -> u32 {
    hosts.unwrap_or_else(|| endpoint.default_hosts())
}

pub fn recommend(args: &RecommendArgs) -> String {
    let hosts = hosts_for(args.hosts, args.endpoint);
    let connections = recommended_connections_with_ceiling(args.rate, hosts, args.ceiling);
    format!(
        "{} connection(s) per host for {} requests/s over {} host(s)",
        connections, args.rate, hosts
    )
}

/// Effective throttle configuration as printed by `check`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub config: ThrottleConfig,
    pub derived_capacity: u64,
    pub recommended_connections: u64,
    pub request_timeout: Duration,
}

fn throttle_config(
    rate: f64,
    hosts: Option<u32>,
    endpoint: EndpointType,
    connections: u32,
    register_timeout_ms: u64,
) -> ThrottleConfig {
    ThrottleConfig::for_endpoint(endpoint)
        .with_max_requests_per_second(rate)
        .with_number_of_hosts(hosts_for(hosts, endpoint))
        .with_connections_per_host(connections)
        .with_register_timeout(Duration::from_millis(register_timeout_ms))
}

pub fn check(args: &CheckArgs) -> Result<String> {
    let config = throttle_config(
        args.rate,
        args.hosts,
        args.endpoint,
        args.connections,
        args.register_timeout_ms,
    );
    let request_timeout = Duration::from_millis(args.request_timeout_ms);
    let derived_capacity = config
        .validate(request_timeout)
        .context("Invalid throttle configuration")?;

    let report = CheckReport {
        recommended_connections: config.recommended_connections(),
        config,
        derived_capacity,
        request_timeout,
    };

    if args.json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = String::new();
    writeln!(out, "configuration ok")?;
    writeln!(out, "  max requests/s:       {}", report.config.max_requests_per_second)?;
    writeln!(out, "  hosts:                {}", report.config.number_of_hosts)?;
    writeln!(out, "  connections per host: {}", report.config.connections_per_host)?;
    writeln!(out, "  derived capacity:     {} requests/s", report.derived_capacity)?;
    writeln!(out, "  recommended conns:    {}", report.recommended_connections)?;
    write!(
        out,
        "  register timeout:     {}ms (request timeout {}ms)",
        report.config.register_timeout.as_millis(),
        request_timeout.as_millis()
    )?;
    Ok(out)
}

/// Outcome of a simulated arrival pattern.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub requests: u32,
    pub admitted: u32,
    pub rejected_capacity: u32,
    pub rejected_rate: u32,
    /// Longest time a single request waited for admission
    pub max_wait: Duration,
    /// Virtual time from the first arrival to the last decision
    pub elapsed: Duration,
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "requests:          {}", self.requests)?;
        writeln!(f, "admitted:          {}", self.admitted)?;
        writeln!(f, "rejected capacity: {}", self.rejected_capacity)?;
        writeln!(f, "rejected rate:     {}", self.rejected_rate)?;
        writeln!(f, "max wait:          {:?}", self.max_wait)?;
        write!(f, "virtual elapsed:   {:?}", self.elapsed)
    }
}

/// Replays `args.requests` arrivals against a fresh throttle.
///
/// Runs on a [`ManualClock`], so no real time passes. Requests are replayed
/// in arrival order, each starting at its own arrival time. A permit is
/// reserved before its wait is served, so every outcome depends only on
/// the reservations of earlier arrivals.
pub async fn simulate(args: &SimulateArgs) -> Result<SimulationReport> {
    let config = throttle_config(
        args.rate,
        args.hosts,
        args.endpoint,
        args.connections,
        args.register_timeout_ms,
    );
    let request_timeout = Duration::from_millis(args.request_timeout_ms);

    let clock = ManualClock::new();
    let throttle = AdmissionThrottle::with_clock(config, request_timeout, clock.clone())
        .context("Invalid throttle configuration")?;

    info!(
        "Simulating {} requests every {}us",
        args.requests, args.interval_us
    );

    let interval = Duration::from_micros(args.interval_us);
    let mut report = SimulationReport {
        requests: args.requests,
        ..SimulationReport::default()
    };

    for i in 0..args.requests {
        let arrival = interval.saturating_mul(i);
        clock.set(arrival);

        let admission = throttle.register().await;
        let decided = clock.now();

        report.max_wait = report.max_wait.max(decided.saturating_sub(arrival));
        report.elapsed = report.elapsed.max(decided);
        match admission.rejection().map(|r| r.reason) {
            None => report.admitted += 1,
            Some(RejectReason::Capacity) => report.rejected_capacity += 1,
            Some(RejectReason::Rate) => report.rejected_rate += 1,
        }
    }

    Ok(report)
}

pub fn backoff(args: &BackoffArgs) -> Result<String> {
    let config = RetryConfig::new(args.max_attempts)
        .with_min_wait(Duration::from_millis(args.min_wait_ms))
        .with_max_wait(Duration::from_millis(args.max_wait_ms))
        .with_jitter(!args.no_jitter);
    let scheduler = RetryScheduler::new(config).context("Invalid retry configuration")?;

    let mut out = String::new();
    for attempt in 0..=args.max_attempts {
        let low = scheduler.backoff(attempt);
        if args.no_jitter {
            writeln!(out, "attempt {}: retry after {:?}", attempt, low)?;
        } else {
            let high = scheduler.backoff(attempt.saturating_add(1));
            writeln!(
                out,
                "attempt {}: retry after {:?} to {:?}",
                attempt, low, high
            )?;
        }
    }
    write!(
        out,
        "attempt {}: rethrow",
        args.max_attempts.saturating_add(1)
    )?;
    Ok(out)
}

pub fn advise(args: &AdviseArgs) -> String {
    let settings = SessionSettings {
        hostname_validation: args.hostname_validation,
        reconnect_on_init: args.reconnect_on_init,
        retry_policy: args.retry_policy,
        local_datacenter: args.local_dc.clone(),
        contact_points: args.contact_point.clone(),
        protocol_version: args.protocol.clone(),
        local_pool_size: args.local_pool_size,
        remote_pool_size: args.remote_pool_size,
        max_requests_per_connection: args.max_requests_per_connection,
        ..SessionSettings::default()
    };

    let mut lines: Vec<String> = advisor::advise(&settings)
        .into_iter()
        .map(|a| format!("- {}", a.message))
        .collect();

    match args.peers.map(advisor::assess_peer_count) {
        Some(PeerAssessment::NoPeers) => lines.push("- no peers found".to_string()),
        Some(PeerAssessment::SinglePeer) => {
            lines.push("- only one peer detected, expected one per availability zone".to_string())
        }
        Some(PeerAssessment::Peers(_)) | None => {}
    }

    if lines.is_empty() {
        "no advisories".to_string()
    } else {
        lines.join("\n")
    }
}

/// Samples `args.rounds` query plans and reports the first choices.
pub fn plan(args: &PlanArgs) -> Result<String> {
    let nodes: Vec<Node> = (0..args.hosts)
        .map(|i| {
            let endpoint = SocketAddr::from((Ipv4Addr::from(0x0a00_0001 + i), 9142));
            let node = Node::new(format!("node-{}", i), endpoint, args.datacenter.clone());
            if i < args.down {
                node.down()
            } else {
                node
            }
        })
        .collect();
    let topology = Topology::new(nodes);
    let orderer = RandomNodeOrderer::new(args.datacenter.clone());
    orderer.init(&topology);

    let live = topology.live_in(&args.datacenter).len();
    let mut first_choices = vec![0u32; args.hosts as usize];
    for _ in 0..args.rounds {
        let mut plan = orderer.new_query_plan(&topology);
        anyhow::ensure!(plan.len() == live, "query plan skipped a live host");
        if let Some(first) = plan.next() {
            let index = topology
                .nodes()
                .iter()
                .position(|n| n.host_id == first.host_id)
                .context("query plan returned an unknown host")?;
            first_choices[index] += 1;
        }
    }

    let mut out = String::new();
    writeln!(out, "{} live host(s), {} plan(s)", live, args.rounds)?;
    for (node, count) in topology.nodes().iter().zip(&first_choices) {
        let share = if args.rounds == 0 {
            0.0
        } else {
            *count as f64 * 100.0 / args.rounds as f64
        };
        write!(out, "\n  {}: {} ({:.1}%)", node.host_id, count, share)?;
        if !node.is_up() {
            write!(out, " down")?;
        }
    }
    Ok(out)
}
