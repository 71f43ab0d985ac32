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

pub mod client_api;
pub mod factory;
pub mod forward_client;
pub mod local_broker_client;
pub mod results;
pub mod route;
pub mod transaction;

use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::connector::factory::ForwardClientFactory;
use crate::connector::factory::RemotingClientProvider;
use crate::connector::forward_client::DefaultForwardClient;
use crate::connector::forward_client::ForwardProducer;
use crate::connector::forward_client::ForwardReadConsumer;
use crate::connector::forward_client::ForwardWriteConsumer;
use crate::connector::route::TopicRouteCache;
use crate::connector::transaction::TransactionHeartbeatRegisterService;

/// Layered construction of the broker-facing side: client factory →
/// role clients → route cache → transaction heartbeat. No cycles, each
/// layer only sees the ones beneath it.
pub struct ConnectorManager {
    factory: Arc<ForwardClientFactory>,
    default_client: Arc<DefaultForwardClient>,
    forward_producer: Arc<ForwardProducer>,
    forward_read_consumer: Arc<ForwardReadConsumer>,
    forward_write_consumer: Arc<ForwardWriteConsumer>,
    topic_route_cache: Arc<TopicRouteCache>,
    transaction_heartbeat_register_service: Arc<TransactionHeartbeatRegisterService>,
}

impl ConnectorManager {
    pub fn new(config: Arc<ProxyConfig>, client_provider: RemotingClientProvider) -> Self {
        let name_server_addrs = config
            .namesrv_addr_list()
            .into_iter()
            .map(Into::into)
            .collect();
        let factory = Arc::new(ForwardClientFactory::new(name_server_addrs, client_provider));
        let default_client = Arc::new(DefaultForwardClient::new(factory.clone()));
        let forward_producer = Arc::new(ForwardProducer::new(factory.clone()));
        let forward_read_consumer = Arc::new(ForwardReadConsumer::new(factory.clone()));
        let forward_write_consumer = Arc::new(ForwardWriteConsumer::new(factory.clone()));
        let topic_route_cache = Arc::new(TopicRouteCache::new(default_client.clone(), &config));
        let transaction_heartbeat_register_service =
            Arc::new(TransactionHeartbeatRegisterService::new(
                config,
                forward_producer.clone(),
                topic_route_cache.clone(),
            ));

        ConnectorManager {
            factory,
            default_client,
            forward_producer,
            forward_read_consumer,
            forward_write_consumer,
            topic_route_cache,
            transaction_heartbeat_register_service,
        }
    }

    pub fn start(&self) {
        self.factory.start();
        self.transaction_heartbeat_register_service.start();
    }

    pub async fn shutdown(&self) {
        self.transaction_heartbeat_register_service.shutdown();
        self.factory.shutdown().await;
    }

    pub fn default_client(&self) -> &Arc<DefaultForwardClient> {
        &self.default_client
    }

    pub fn forward_producer(&self) -> &Arc<ForwardProducer> {
        &self.forward_producer
    }

    pub fn forward_read_consumer(&self) -> &Arc<ForwardReadConsumer> {
        &self.forward_read_consumer
    }

    pub fn forward_write_consumer(&self) -> &Arc<ForwardWriteConsumer> {
        &self.forward_write_consumer
    }

    pub fn topic_route_cache(&self) -> &Arc<TopicRouteCache> {
        &self.topic_route_cache
    }

    pub fn transaction_heartbeat_register_service(
        &self,
    ) -> &Arc<TransactionHeartbeatRegisterService> {
        &self.transaction_heartbeat_register_service
    }
}
