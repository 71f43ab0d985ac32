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

use tracing::warn;

const DEFAULT_DELAY_LEVEL: &str = "1s 5s 10s 30s 1m 2m 3m 4m 5m 6m 7m 8m 9m 10m 20m 30m 1h 2h";

/// The staircase of retry delays configured as `messageDelayLevel`, one entry
/// per delivery attempt. Attempts beyond the last level stay at the last
/// level.
#[derive(Debug, Clone)]
pub struct DelayPolicy {
    delay_levels_millis: Vec<u64>,
}

impl DelayPolicy {
    pub fn build(message_delay_level: &str) -> DelayPolicy {
        let mut delay_levels_millis = Vec::new();
        for level in message_delay_level.split_whitespace() {
            match Self::parse_level(level) {
                Some(millis) => delay_levels_millis.push(millis),
                None => {
                    warn!("ignore unparsable delay level: {}", level);
                }
            }
        }
        if delay_levels_millis.is_empty() {
            return Self::build(DEFAULT_DELAY_LEVEL);
        }
        DelayPolicy {
            delay_levels_millis,
        }
    }

    /// Delay for a 1-based delay level, clamped to the configured range.
    pub fn get_delay_interval_millis(&self, delay_level: i32) -> u64 {
        let index = delay_level.clamp(1, self.delay_levels_millis.len() as i32) as usize - 1;
        self.delay_levels_millis[index]
    }

    /// Invisibility to apply when a message is nacked on its n-th delivery
    /// attempt (1-based).
    pub fn next_delay_millis(&self, delivery_attempt: i32) -> u64 {
        self.get_delay_interval_millis(delivery_attempt)
    }

    pub fn level_count(&self) -> usize {
        self.delay_levels_millis.len()
    }

    fn parse_level(level: &str) -> Option<u64> {
        let (value, unit_millis) = match level.chars().last()? {
            's' => (&level[..level.len() - 1], 1000),
            'm' => (&level[..level.len() - 1], 60 * 1000),
            'h' => (&level[..level.len() - 1], 60 * 60 * 1000),
            'd' => (&level[..level.len() - 1], 24 * 60 * 60 * 1000),
            _ => return None,
        };
        value.parse::<u64>().ok().map(|v| v * unit_millis)
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::build(DEFAULT_DELAY_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_parses_units() {
        let policy = DelayPolicy::build("1s 5s 1m 1h 1d");
        assert_eq!(policy.level_count(), 5);
        assert_eq!(policy.get_delay_interval_millis(1), 1_000);
        assert_eq!(policy.get_delay_interval_millis(2), 5_000);
        assert_eq!(policy.get_delay_interval_millis(3), 60_000);
        assert_eq!(policy.get_delay_interval_millis(4), 3_600_000);
        assert_eq!(policy.get_delay_interval_millis(5), 86_400_000);
    }

    #[test]
    fn levels_are_clamped_at_both_ends() {
        let policy = DelayPolicy::build("1s 5s");
        assert_eq!(policy.get_delay_interval_millis(0), 1_000);
        assert_eq!(policy.get_delay_interval_millis(-3), 1_000);
        assert_eq!(policy.get_delay_interval_millis(99), 5_000);
    }

    #[test]
    fn unparsable_input_falls_back_to_default() {
        let policy = DelayPolicy::build("bogus");
        assert_eq!(policy.level_count(), 18);
    }

    #[test]
    fn mixed_input_keeps_valid_levels() {
        let policy = DelayPolicy::build("1s nope 5s");
        assert_eq!(policy.level_count(), 2);
    }
}
