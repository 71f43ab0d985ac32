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

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use tracing::info;

use crate::connector::client_api::MQClientAPI;
use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::remoting::client::RemotingClient;

/// Builds one transport per pooled client so each role keeps its own broker
/// connections and policies.
pub type RemotingClientProvider =
    Arc<dyn Fn() -> Arc<dyn RemotingClient> + Send + Sync + 'static>;

/// Keyed pool of broker clients. A key is created at most once, concurrent
/// callers for the same key observe the identical instance.
pub struct ForwardClientFactory {
    name_server_addrs: Vec<CheetahString>,
    client_provider: RemotingClientProvider,
    clients: DashMap<CheetahString, Arc<MQClientAPI>>,
    // held only across client construction
    create_lock: parking_lot::Mutex<Vec<CheetahString>>,
    closed: AtomicBool,
}

impl ForwardClientFactory {
    pub fn new(
        name_server_addrs: Vec<CheetahString>,
        client_provider: RemotingClientProvider,
    ) -> Self {
        ForwardClientFactory {
            name_server_addrs,
            client_provider,
            clients: DashMap::new(),
            create_lock: parking_lot::Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn get_mq_client(&self, instance_name: &CheetahString) -> ProxyResult<Arc<MQClientAPI>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProxyError::Shutdown("forward client factory"));
        }
        if let Some(client) = self.clients.get(instance_name) {
            return Ok(client.clone());
        }
        let mut creation_order = self.create_lock.lock();
        if let Some(client) = self.clients.get(instance_name) {
            return Ok(client.clone());
        }
        let client = Arc::new(MQClientAPI::new(
            (self.client_provider)(),
            self.name_server_addrs.clone(),
        ));
        self.clients.insert(instance_name.clone(), client.clone());
        creation_order.push(instance_name.clone());
        info!("created forward client for instance {}", instance_name);
        Ok(client)
    }

    pub fn start(&self) {
        // clients connect lazily, nothing to warm up
    }

    /// Idempotent; drains clients in reverse creation order.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let creation_order: Vec<CheetahString> = {
            let mut guard = self.create_lock.lock();
            guard.drain(..).collect()
        };
        for instance_name in creation_order.iter().rev() {
            if let Some((_, client)) = self.clients.remove(instance_name) {
                client.remoting_client().shutdown().await;
                info!("shut down forward client for instance {}", instance_name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remoting::RemotingCommand;

    struct NoopClient;

    #[tonic::async_trait]
    impl RemotingClient for NoopClient {
        async fn invoke(
            &self,
            addr: &CheetahString,
            _request: RemotingCommand,
            _timeout_millis: u64,
        ) -> ProxyResult<RemotingCommand> {
            Err(ProxyError::BrokerUnavailable(addr.to_string()))
        }

        async fn invoke_oneway(
            &self,
            _addr: &CheetahString,
            _request: RemotingCommand,
            _timeout_millis: u64,
        ) -> ProxyResult<()> {
            Ok(())
        }

        async fn shutdown(&self) {}
    }

    fn factory() -> ForwardClientFactory {
        ForwardClientFactory::new(
            vec![CheetahString::from("127.0.0.1:9876")],
            Arc::new(|| Arc::new(NoopClient) as Arc<dyn RemotingClient>),
        )
    }

    #[test]
    fn same_key_returns_identical_instance() {
        let factory = factory();
        let key = CheetahString::from("rmq-proxy-producer");
        let first = factory.get_mq_client(&key).unwrap();
        let second = factory.get_mq_client(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_keys_get_distinct_instances() {
        let factory = factory();
        let first = factory
            .get_mq_client(&CheetahString::from("rmq-proxy-producer"))
            .unwrap();
        let second = factory
            .get_mq_client(&CheetahString::from("rmq-proxy-read-consumer"))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn get_after_shutdown_fails() {
        let factory = factory();
        factory
            .get_mq_client(&CheetahString::from("rmq-proxy-default"))
            .unwrap();
        factory.shutdown().await;
        let result = factory.get_mq_client(&CheetahString::from("rmq-proxy-default"));
        assert!(matches!(result, Err(ProxyError::Shutdown(_))));
        // second shutdown is a no-op
        factory.shutdown().await;
    }
}
