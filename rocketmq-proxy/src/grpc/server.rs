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

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::config::ProxyConfig;
use crate::config::ProxyMode;
use crate::connector::local_broker_client::InProcessBroker;
use crate::connector::local_broker_client::LocalBrokerClient;
use crate::connector::factory::RemotingClientProvider;
use crate::connector::route::DefaultAssignmentQueueSelector;
use crate::connector::route::DefaultReadQueueSelector;
use crate::connector::route::DefaultWriteQueueSelector;
use crate::connector::ConnectorManager;
use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::grpc::client_settings_manager::ClientSettingsManager;
use crate::grpc::proto::v1::messaging_service_server::MessagingServiceServer as MessagingServiceServerV1;
use crate::grpc::proto::v2::messaging_service_server::MessagingServiceServer as MessagingServiceServerV2;
use crate::grpc::v1::MessagingActivityV1;
use crate::grpc::v2::MessagingActivityV2;
use crate::processor::ConsumerProcessor;
use crate::processor::ProducerProcessor;
use crate::relay::channel_manager::ChannelManager;
use crate::relay::request_processor::ProxyRelayRequestProcessor;
use crate::remoting::client::RemotingClient;
use crate::remoting::client::RemotingRequestProcessor;
use crate::remoting::client::RemotingTokioClient;

/// Wires the whole proxy: relay channels → remoting clients → connector →
/// engines → the two gRPC surfaces, then serves them on one port.
pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    connector_manager: Arc<ConnectorManager>,
    channel_manager: Arc<ChannelManager>,
    activity_v1: MessagingActivityV1,
    activity_v2: MessagingActivityV2,
}

impl ProxyServer {
    /// CLUSTER mode: brokers are reached over the wire; broker-initiated
    /// back-requests are answered through the relay channel manager.
    pub fn cluster(config: Arc<ProxyConfig>) -> ProxyResult<Self> {
        if !config.proxy_mode.is_cluster() {
            return Err(ProxyError::ConfigError(
                "cluster constructor requires proxyMode=CLUSTER".to_string(),
            ));
        }
        let channel_manager = Arc::new(ChannelManager::new(config.clone()));
        let relay_processor: Arc<dyn RemotingRequestProcessor> =
            Arc::new(ProxyRelayRequestProcessor::new(channel_manager.clone()));
        let client_provider: RemotingClientProvider = Arc::new(move || {
            Arc::new(RemotingTokioClient::new(Some(relay_processor.clone())))
                as Arc<dyn RemotingClient>
        });
        Ok(Self::build(config, channel_manager, client_provider))
    }

    /// LOCAL mode: the pool is replaced by a thin adapter around the
    /// co-located broker, no endpoint conversion happens on query-route.
    pub fn local(config: Arc<ProxyConfig>, broker: Arc<dyn InProcessBroker>) -> ProxyResult<Self> {
        if !config.proxy_mode.is_local() {
            return Err(ProxyError::ConfigError(
                "local constructor requires proxyMode=LOCAL".to_string(),
            ));
        }
        let channel_manager = Arc::new(ChannelManager::new(config.clone()));
        let client_provider: RemotingClientProvider = Arc::new(move || {
            Arc::new(LocalBrokerClient::new(broker.clone())) as Arc<dyn RemotingClient>
        });
        Ok(Self::build(config, channel_manager, client_provider))
    }

    fn build(
        config: Arc<ProxyConfig>,
        channel_manager: Arc<ChannelManager>,
        client_provider: RemotingClientProvider,
    ) -> Self {
        let connector_manager =
            Arc::new(ConnectorManager::new(config.clone(), client_provider));

        let producer_processor = Arc::new(ProducerProcessor::new(
            config.clone(),
            connector_manager.forward_producer().clone(),
            connector_manager.topic_route_cache().clone(),
            Arc::new(DefaultWriteQueueSelector::new()),
            connector_manager
                .transaction_heartbeat_register_service()
                .clone(),
        ));
        let consumer_processor = Arc::new(ConsumerProcessor::new(
            config.clone(),
            connector_manager.default_client().clone(),
            connector_manager.forward_read_consumer().clone(),
            connector_manager.forward_write_consumer().clone(),
            connector_manager.forward_producer().clone(),
            connector_manager.topic_route_cache().clone(),
            Arc::new(DefaultReadQueueSelector::new()),
        ));
        let assignment_selector = Arc::new(DefaultAssignmentQueueSelector::new());
        let client_settings_manager = Arc::new(ClientSettingsManager::new(config.clone()));

        let activity_v1 = MessagingActivityV1::new(
            config.clone(),
            producer_processor.clone(),
            consumer_processor.clone(),
            connector_manager.topic_route_cache().clone(),
            assignment_selector.clone(),
            connector_manager
                .transaction_heartbeat_register_service()
                .clone(),
            channel_manager.clone(),
        );
        let activity_v2 = MessagingActivityV2::new(
            config.clone(),
            producer_processor,
            consumer_processor,
            connector_manager.topic_route_cache().clone(),
            assignment_selector,
            connector_manager
                .transaction_heartbeat_register_service()
                .clone(),
            channel_manager.clone(),
            client_settings_manager,
        );

        ProxyServer {
            config,
            connector_manager,
            channel_manager,
            activity_v1,
            activity_v2,
        }
    }

    pub fn mode(&self) -> ProxyMode {
        self.config.proxy_mode
    }

    /// Serve both protocol revisions until the shutdown future resolves,
    /// then drain background services.
    pub async fn run<F>(self, shutdown: F) -> ProxyResult<()>
    where
        F: Future<Output = ()>,
    {
        self.connector_manager.start();
        self.channel_manager.start();

        let listen_addr: SocketAddr = format!("0.0.0.0:{}", self.config.grpc_server_port)
            .parse()
            .map_err(|e| ProxyError::ConfigError(format!("bad gRPC listen address: {e}")))?;
        info!(
            "rocketmq proxy listening on {} in {} mode",
            listen_addr, self.config.proxy_mode
        );

        tonic::transport::Server::builder()
            .add_service(MessagingServiceServerV1::new(self.activity_v1))
            .add_service(MessagingServiceServerV2::new(self.activity_v2))
            .serve_with_shutdown(listen_addr, shutdown)
            .await
            .map_err(|e| ProxyError::Internal(format!("gRPC server failed: {e}")))?;

        info!("gRPC server stopped, draining background services");
        self.channel_manager.shutdown();
        self.connector_manager.shutdown().await;
        Ok(())
    }
}
