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

use std::sync::Arc;

use cheetah_string::CheetahString;
use dashmap::DashMap;

use crate::config::ProxyConfig;
use crate::grpc::proto::v2::Settings;

/// Settings the v2 client advertises on heartbeat, cached per client id so
/// the receive/nack path can honor fifo and dead-letter policy without extra
/// round trips.
pub struct ClientSettingsManager {
    config: Arc<ProxyConfig>,
    client_settings: DashMap<CheetahString, Settings>,
}

impl ClientSettingsManager {
    pub fn new(config: Arc<ProxyConfig>) -> Self {
        ClientSettingsManager {
            config,
            client_settings: DashMap::new(),
        }
    }

    pub fn update_client_settings(&self, client_id: &CheetahString, settings: Settings) {
        self.client_settings.insert(client_id.clone(), settings);
    }

    pub fn remove_client_settings(&self, client_id: &CheetahString) {
        self.client_settings.remove(client_id);
    }

    pub fn is_fifo(&self, client_id: &CheetahString) -> bool {
        self.client_settings
            .get(client_id)
            .and_then(|settings| settings.subscription.as_ref().map(|sub| sub.fifo))
            .unwrap_or(false)
    }

    pub fn max_delivery_attempts(&self, client_id: &CheetahString) -> i32 {
        self.client_settings
            .get(client_id)
            .and_then(|settings| {
                settings
                    .subscription
                    .as_ref()
                    .and_then(|sub| sub.dead_letter_policy.as_ref())
                    .map(|policy| policy.max_delivery_attempts)
            })
            .filter(|attempts| *attempts > 0)
            .unwrap_or(self.config.max_delivery_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grpc::proto::v2::DeadLetterPolicy;
    use crate::grpc::proto::v2::Subscription;

    fn manager() -> ClientSettingsManager {
        ClientSettingsManager::new(Arc::new(ProxyConfig::default()))
    }

    #[test]
    fn unknown_client_uses_config_defaults() {
        let manager = manager();
        let client_id = CheetahString::from("client-1");
        assert!(!manager.is_fifo(&client_id));
        assert_eq!(manager.max_delivery_attempts(&client_id), 16);
    }

    #[test]
    fn advertised_settings_win() {
        let manager = manager();
        let client_id = CheetahString::from("client-1");
        manager.update_client_settings(
            &client_id,
            Settings {
                subscription: Some(Subscription {
                    fifo: true,
                    dead_letter_policy: Some(DeadLetterPolicy {
                        max_delivery_attempts: 3,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        assert!(manager.is_fifo(&client_id));
        assert_eq!(manager.max_delivery_attempts(&client_id), 3);

        manager.remove_client_settings(&client_id);
        assert_eq!(manager.max_delivery_attempts(&client_id), 16);
    }
}
