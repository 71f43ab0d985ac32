// Copyright 2023 The RocketMQ Rust Authors
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

use std::time::Duration;
use std::time::Instant;

use cheetah_string::CheetahString;

/// When the inbound call carries no deadline, behave as if it had this one.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(20);

pub const LANGUAGE_METADATA_KEY: &str = "x-mq-language";
pub const CLIENT_ID_METADATA_KEY: &str = "x-mq-client-id";

/// Per-call facts every activity needs: who is calling, from where, in what
/// language binding, and how long it is willing to wait.
#[derive(Debug, Clone)]
pub struct ProxyContext {
    pub remote_address: CheetahString,
    pub client_id: CheetahString,
    pub language: CheetahString,
    deadline: Instant,
}

impl ProxyContext {
    pub fn from_request<T>(request: &tonic::Request<T>) -> Self {
        let remote_address = request
            .remote_addr()
            .map(|addr| CheetahString::from_string(addr.to_string()))
            .unwrap_or_default();
        let metadata = request.metadata();
        let client_id = metadata
            .get(CLIENT_ID_METADATA_KEY)
            .and_then(|value| value.to_str().ok())
            .map(CheetahString::from_slice)
            .unwrap_or_default();
        let language = metadata
            .get(LANGUAGE_METADATA_KEY)
            .and_then(|value| value.to_str().ok())
            .map(CheetahString::from_slice)
            .unwrap_or_else(|| CheetahString::from_static_str("unknown"));
        let deadline = metadata
            .get("grpc-timeout")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
            .unwrap_or(DEFAULT_DEADLINE);
        ProxyContext {
            remote_address,
            client_id,
            language,
            deadline: Instant::now() + deadline,
        }
    }

    /// Milliseconds left before the caller stops listening.
    pub fn remaining_millis(&self) -> u64 {
        self.deadline
            .saturating_duration_since(Instant::now())
            .as_millis() as u64
    }
}

/// `grpc-timeout` wire format: an integer with a one-letter unit suffix.
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 {
        return None;
    }
    let (amount, unit) = value.split_at(value.len() - 1);
    let amount: u64 = amount.parse().ok()?;
    match unit {
        "H" => Some(Duration::from_secs(amount * 3600)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}
