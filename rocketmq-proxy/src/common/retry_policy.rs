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

use serde::Deserialize;
use serde::Serialize;

use crate::config::ProxyConfig;

pub trait RetryPolicy {
    /// next delay time = min(max, initial * multiplier^reconsume_times)
    fn next_delay_duration(&self, reconsume_times: i32) -> i64;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExponentialRetryPolicy {
    initial: u64,
    max: u64,
    multiplier: u64,
}

impl Default for ExponentialRetryPolicy {
    fn default() -> Self {
        ExponentialRetryPolicy {
            initial: Duration::from_secs(5).as_millis() as u64,
            max: Duration::from_secs(2 * 60 * 60).as_millis() as u64,
            multiplier: 2,
        }
    }
}

impl ExponentialRetryPolicy {
    pub fn new(initial: u64, max: u64, multiplier: u64) -> Self {
        ExponentialRetryPolicy {
            initial,
            max,
            multiplier,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        ExponentialRetryPolicy {
            initial: config.nack_retry_initial_millis,
            max: config.nack_retry_max_millis,
            multiplier: config.nack_retry_multiplier,
        }
    }

    pub fn initial(&self) -> u64 {
        self.initial
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }
}

impl RetryPolicy for ExponentialRetryPolicy {
    fn next_delay_duration(&self, reconsume_times: i32) -> i64 {
        let reconsume_times = reconsume_times.clamp(0, 32) as u32;
        let delay = self
            .initial
            .saturating_mul(self.multiplier.saturating_pow(reconsume_times));
        delay.min(self.max) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_expected_values() {
        let policy = ExponentialRetryPolicy::default();
        assert_eq!(policy.initial(), 5_000);
        assert_eq!(policy.max(), 7_200_000);
        assert_eq!(policy.multiplier(), 2);
    }

    #[test]
    fn delay_grows_exponentially_until_max() {
        let policy = ExponentialRetryPolicy::new(5_000, 7_200_000, 2);
        assert_eq!(policy.next_delay_duration(0), 5_000);
        assert_eq!(policy.next_delay_duration(1), 10_000);
        assert_eq!(policy.next_delay_duration(2), 20_000);
        assert_eq!(policy.next_delay_duration(10), 5_000 * 1024);
        assert_eq!(policy.next_delay_duration(11), 7_200_000);
        assert_eq!(policy.next_delay_duration(32), 7_200_000);
    }

    #[test]
    fn negative_reconsume_times_clamp_to_initial() {
        let policy = ExponentialRetryPolicy::default();
        assert_eq!(policy.next_delay_duration(-5), 5_000);
    }

    #[test]
    fn large_reconsume_times_do_not_overflow() {
        let policy = ExponentialRetryPolicy::new(1 << 40, i64::MAX as u64, 2);
        assert_eq!(policy.next_delay_duration(40), i64::MAX);
    }
}
