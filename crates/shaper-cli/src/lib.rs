// Copyright 2025 Shaper Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Shaper CLI
//!
//! Diagnostic front end for the shaper traffic-shaping policies.
//!
//! ## Key Commands
//!
//! - `shaper recommend`: connections per host needed for a request rate
//! - `shaper check`: validate a throttle configuration and print it
//! - `shaper simulate`: replay arrivals against a throttle on virtual time
//! - `shaper backoff`: print the retry wait window per attempt
//! - `shaper advise`: review driver session settings
//! - `shaper plan`: sample query plans over a synthetic topology

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::run;
