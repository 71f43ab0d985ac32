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

use std::env;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::error::ProxyError;
use crate::error::ProxyResult;

pub const RMQ_PROXY_HOME_ENV: &str = "RMQ_PROXY_HOME";

const CONFIG_FILE_NAME: &str = "rmq-proxy.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyMode {
    Local,
    Cluster,
}

impl ProxyMode {
    pub fn is_local(&self) -> bool {
        matches!(self, ProxyMode::Local)
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, ProxyMode::Cluster)
    }
}

impl FromStr for ProxyMode {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(ProxyMode::Local),
            "CLUSTER" => Ok(ProxyMode::Cluster),
            other => Err(ProxyError::ConfigError(format!(
                "unrecognized proxy mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyMode::Local => write!(f, "LOCAL"),
            ProxyMode::Cluster => write!(f, "CLUSTER"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    #[serde(alias = "proxyMode")]
    pub proxy_mode: ProxyMode,

    #[serde(alias = "grpcServerPort")]
    pub grpc_server_port: u16,

    /// Name server address list, `host:port[;host:port...]`.
    #[serde(alias = "namesrvAddr")]
    pub namesrv_addr: String,

    #[serde(alias = "routeCacheTtlMillis")]
    pub route_cache_ttl_millis: u64,

    /// A confirmed unknown topic is cached for this shorter period so bad
    /// input does not hammer the name server.
    #[serde(alias = "routeCacheNegativeTtlMillis")]
    pub route_cache_negative_ttl_millis: u64,

    #[serde(alias = "longPollingReserveTimeInMillis")]
    pub long_polling_reserve_time_in_millis: u64,

    #[serde(alias = "mqClientApiTimeoutMillis")]
    pub mq_client_api_timeout_millis: u64,

    #[serde(alias = "transactionHeartbeatPeriodSecond")]
    pub transaction_heartbeat_period_second: u64,

    #[serde(alias = "transactionHeartbeatBatchNum")]
    pub transaction_heartbeat_batch_num: usize,

    #[serde(alias = "transactionHeartbeatThreadPoolNums")]
    pub transaction_heartbeat_thread_pool_nums: usize,

    #[serde(alias = "transactionHeartbeatThreadPoolQueueCapacity")]
    pub transaction_heartbeat_thread_pool_queue_capacity: usize,

    #[serde(alias = "grpcProxyRelayRequestTimeoutInSeconds")]
    pub grpc_proxy_relay_request_timeout_in_seconds: u64,

    #[serde(alias = "grpcClientChannelExpireSeconds")]
    pub grpc_client_channel_expire_seconds: u64,

    /// Retry delay levels for nack on the v1 surface, e.g. `1s 5s 10s 30s 1m ...`.
    #[serde(alias = "messageDelayLevel")]
    pub message_delay_level: String,

    #[serde(alias = "maxDeliveryAttempts")]
    pub max_delivery_attempts: i32,

    /// Nack invisibility grows as `min(max, initial * multiplier^n)`.
    #[serde(alias = "nackRetryInitialMillis")]
    pub nack_retry_initial_millis: u64,

    #[serde(alias = "nackRetryMaxMillis")]
    pub nack_retry_max_millis: u64,

    #[serde(alias = "nackRetryMultiplier")]
    pub nack_retry_multiplier: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            proxy_mode: ProxyMode::Cluster,
            grpc_server_port: 8081,
            namesrv_addr: "127.0.0.1:9876".to_string(),
            route_cache_ttl_millis: 20 * 1000,
            route_cache_negative_ttl_millis: 2 * 1000,
            long_polling_reserve_time_in_millis: 100,
            mq_client_api_timeout_millis: 3 * 1000,
            transaction_heartbeat_period_second: 20,
            transaction_heartbeat_batch_num: 100,
            transaction_heartbeat_thread_pool_nums: 20,
            transaction_heartbeat_thread_pool_queue_capacity: 200,
            grpc_proxy_relay_request_timeout_in_seconds: 5,
            grpc_client_channel_expire_seconds: 120,
            message_delay_level: "1s 5s 10s 30s 1m 2m 3m 4m 5m 6m 7m 8m 9m 10m 20m 30m 1h 2h"
                .to_string(),
            max_delivery_attempts: 16,
            nack_retry_initial_millis: 5 * 1000,
            nack_retry_max_millis: 2 * 60 * 60 * 1000,
            nack_retry_multiplier: 2,
        }
    }
}

impl ProxyConfig {
    /// Load the config file from `$RMQ_PROXY_HOME/conf/rmq-proxy.json`.
    ///
    /// A missing file yields the defaults; a present but malformed file is a
    /// startup error.
    pub fn load() -> ProxyResult<ProxyConfig> {
        match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                warn!(
                    "proxy config file {} not found, using default config",
                    path.display()
                );
                Ok(ProxyConfig::default())
            }
            None => {
                warn!("{} not set, using default config", RMQ_PROXY_HOME_ENV);
                Ok(ProxyConfig::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> ProxyResult<ProxyConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: ProxyConfig = serde_json::from_str(&content)
            .map_err(|e| ProxyError::ConfigError(format!("{}: {e}", path.display())))?;
        info!("loaded proxy config from {}", path.display());
        Ok(config)
    }

    fn config_file_path() -> Option<PathBuf> {
        env::var(RMQ_PROXY_HOME_ENV)
            .ok()
            .map(|home| PathBuf::from(home).join("conf").join(CONFIG_FILE_NAME))
    }

    pub fn namesrv_addr_list(&self) -> Vec<String> {
        self.namesrv_addr
            .split(';')
            .filter(|addr| !addr.is_empty())
            .map(|addr| addr.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_documented_values() {
        let config = ProxyConfig::default();
        assert_eq!(config.proxy_mode, ProxyMode::Cluster);
        assert_eq!(config.grpc_server_port, 8081);
        assert_eq!(config.route_cache_ttl_millis, 20_000);
        assert_eq!(config.transaction_heartbeat_batch_num, 100);
        assert_eq!(config.max_delivery_attempts, 16);
        assert_eq!(config.nack_retry_initial_millis, 5_000);
        assert_eq!(config.nack_retry_max_millis, 7_200_000);
        assert_eq!(config.nack_retry_multiplier, 2);
    }

    #[test]
    fn parse_camel_case_aliases() {
        let json = r#"{
            "proxyMode": "LOCAL",
            "grpcServerPort": 18081,
            "namesrvAddr": "10.0.0.1:9876;10.0.0.2:9876",
            "transactionHeartbeatBatchNum": 2
        }"#;
        let config: ProxyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.proxy_mode, ProxyMode::Local);
        assert_eq!(config.grpc_server_port, 18081);
        assert_eq!(config.transaction_heartbeat_batch_num, 2);
        assert_eq!(
            config.namesrv_addr_list(),
            vec!["10.0.0.1:9876".to_string(), "10.0.0.2:9876".to_string()]
        );
    }

    #[test]
    fn proxy_mode_from_str_is_case_insensitive() {
        assert_eq!("local".parse::<ProxyMode>().unwrap(), ProxyMode::Local);
        assert_eq!("CLUSTER".parse::<ProxyMode>().unwrap(), ProxyMode::Cluster);
        assert!("standalone".parse::<ProxyMode>().is_err());
    }
}
