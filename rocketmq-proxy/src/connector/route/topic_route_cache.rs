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
use std::time::Duration;
use std::time::Instant;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;

use crate::config::ProxyConfig;
use crate::connector::forward_client::DefaultForwardClient;
use crate::connector::route::message_queue_wrapper::MessageQueueWrapper;
use crate::error::ProxyError;
use crate::error::ProxyResult;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<MessageQueueWrapper>, Arc<ProxyError>>>>;

enum RouteEntry {
    Ready {
        wrapper: Arc<MessageQueueWrapper>,
        expire_at: Instant,
    },
    /// A confirmed unknown topic, cached for a shorter period.
    NotFound {
        remark: String,
        expire_at: Instant,
    },
    Fetching(SharedFetch),
}

/// Refresh-on-miss, expire-on-idle topic→route cache. N concurrent lookups
/// for the same cold topic produce exactly one name-server round trip: the
/// first caller installs a shared fetch future, the rest attach to it.
pub struct TopicRouteCache {
    client: Arc<DefaultForwardClient>,
    table: Arc<DashMap<CheetahString, RouteEntry>>,
    ttl: Duration,
    negative_ttl: Duration,
    fetch_timeout_millis: u64,
}

impl TopicRouteCache {
    pub fn new(client: Arc<DefaultForwardClient>, config: &ProxyConfig) -> Self {
        TopicRouteCache {
            client,
            table: Arc::new(DashMap::new()),
            ttl: Duration::from_millis(config.route_cache_ttl_millis),
            negative_ttl: Duration::from_millis(config.route_cache_negative_ttl_millis),
            fetch_timeout_millis: config.mq_client_api_timeout_millis,
        }
    }

    pub async fn get_message_queue(
        &self,
        topic: &CheetahString,
    ) -> ProxyResult<Arc<MessageQueueWrapper>> {
        let fetch = {
            match self.table.entry(topic.clone()) {
                dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                    match occupied.get() {
                        RouteEntry::Ready { wrapper, expire_at } if *expire_at > Instant::now() => {
                            return Ok(wrapper.clone());
                        }
                        RouteEntry::NotFound { remark, expire_at }
                            if *expire_at > Instant::now() =>
                        {
                            return Err(ProxyError::TopicNotFound(remark.clone()));
                        }
                        RouteEntry::Fetching(fetch) => fetch.clone(),
                        _ => {
                            // expired, this caller becomes the refresher
                            let fetch = self.install_fetch(topic.clone());
                            occupied.insert(RouteEntry::Fetching(fetch.clone()));
                            fetch
                        }
                    }
                }
                dashmap::mapref::entry::Entry::Vacant(vacant) => {
                    let fetch = self.install_fetch(topic.clone());
                    vacant.insert(RouteEntry::Fetching(fetch.clone()));
                    fetch
                }
            }
        };
        match fetch.await {
            Ok(wrapper) => Ok(wrapper),
            Err(error) => Err(clone_proxy_error(&error)),
        }
    }

    /// Broker and cluster names register as system topics, so an address
    /// lookup is a route lookup.
    pub async fn get_broker_addr(&self, broker_name: &CheetahString) -> ProxyResult<CheetahString> {
        let wrapper = self.get_message_queue(broker_name).await?;
        wrapper.broker_addr(broker_name.as_str()).ok_or_else(|| {
            ProxyError::Internal(format!("no address for broker {broker_name}"))
        })
    }

    pub fn invalidate(&self, topic: &CheetahString) {
        self.table.remove(topic);
    }

    fn install_fetch(&self, topic: CheetahString) -> SharedFetch {
        let client = self.client.clone();
        let ttl = self.ttl;
        let negative_ttl = self.negative_ttl;
        let fetch_timeout_millis = self.fetch_timeout_millis;
        let table = self.table.clone();
        async move {
            let result = client
                .get_topic_route_info(&topic, fetch_timeout_millis)
                .await;
            match result {
                Ok(topic_route_data) => {
                    let wrapper =
                        Arc::new(MessageQueueWrapper::build(topic.clone(), topic_route_data));
                    table.insert(
                        topic,
                        RouteEntry::Ready {
                            wrapper: wrapper.clone(),
                            expire_at: Instant::now() + ttl,
                        },
                    );
                    Ok(wrapper)
                }
                Err(ProxyError::TopicNotFound(remark)) => {
                    table.insert(
                        topic,
                        RouteEntry::NotFound {
                            remark: remark.clone(),
                            expire_at: Instant::now() + negative_ttl,
                        },
                    );
                    Err(Arc::new(ProxyError::TopicNotFound(remark)))
                }
                Err(error) => {
                    // drop the pending entry so a later caller retries
                    table.remove(&topic);
                    Err(Arc::new(error))
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn clone_proxy_error(error: &ProxyError) -> ProxyError {
    match error {
        ProxyError::TopicNotFound(remark) => ProxyError::TopicNotFound(remark.clone()),
        ProxyError::BrokerUnavailable(addr) => ProxyError::BrokerUnavailable(addr.clone()),
        ProxyError::BrokerTimeout(addr, timeout) => {
            ProxyError::BrokerTimeout(addr.clone(), *timeout)
        }
        other => ProxyError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::connector::factory::ForwardClientFactory;
    use crate::remoting::client::RemotingClient;
    use crate::remoting::code::ResponseCode;
    use crate::remoting::route::BrokerData;
    use crate::remoting::route::QueueData;
    use crate::remoting::route::TopicRouteData;
    use crate::remoting::RemotingCommand;

    struct CountingNameServer {
        calls: Arc<AtomicUsize>,
        topic_exists: bool,
    }

    #[tonic::async_trait]
    impl RemotingClient for CountingNameServer {
        async fn invoke(
            &self,
            _addr: &CheetahString,
            _request: RemotingCommand,
            _timeout_millis: u64,
        ) -> ProxyResult<RemotingCommand> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // simulate a name-server round trip so concurrent callers overlap
            tokio::time::sleep(Duration::from_millis(20)).await;
            if !self.topic_exists {
                return Ok(RemotingCommand::create_response_command_with_code(
                    ResponseCode::TopicNotExist,
                )
                .set_remark("No topic route info in name server for the topic: notExistTopic"));
            }
            let route = TopicRouteData {
                order_topic_conf: None,
                queue_datas: vec![QueueData {
                    broker_name: CheetahString::from("broker-a"),
                    read_queue_nums: 4,
                    write_queue_nums: 4,
                    perm: 6,
                    topic_sys_flag: 0,
                }],
                broker_datas: vec![BrokerData::new(
                    "DefaultCluster",
                    "broker-a",
                    HashMap::from([(0, CheetahString::from("127.0.0.1:10911"))]),
                )],
            };
            Ok(
                RemotingCommand::create_response_command_with_code(ResponseCode::Success)
                    .set_body(serde_json::to_vec(&route).unwrap()),
            )
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

    fn cache_with(
        calls: Arc<AtomicUsize>,
        topic_exists: bool,
        config: &ProxyConfig,
    ) -> TopicRouteCache {
        let factory = Arc::new(ForwardClientFactory::new(
            vec![CheetahString::from("127.0.0.1:9876")],
            Arc::new(move || {
                Arc::new(CountingNameServer {
                    calls: calls.clone(),
                    topic_exists,
                }) as Arc<dyn RemotingClient>
            }),
        ));
        TopicRouteCache::new(Arc::new(DefaultForwardClient::new(factory)), config)
    }

    #[tokio::test]
    async fn concurrent_cold_lookups_make_one_upstream_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(cache_with(calls.clone(), true, &ProxyConfig::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_message_queue(&CheetahString::from("topic"))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn warm_cache_serves_without_upstream_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls.clone(), true, &ProxyConfig::default());
        let topic = CheetahString::from("topic");
        cache.get_message_queue(&topic).await.unwrap();
        cache.get_message_queue(&topic).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_topic_is_cached_negatively() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls.clone(), false, &ProxyConfig::default());
        let topic = CheetahString::from("notExistTopic");

        let first = cache.get_message_queue(&topic).await;
        assert!(matches!(first, Err(ProxyError::TopicNotFound(_))));
        let second = cache.get_message_queue(&topic).await;
        assert!(matches!(second, Err(ProxyError::TopicNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_refreshed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = ProxyConfig {
            route_cache_ttl_millis: 1,
            ..Default::default()
        };
        let cache = cache_with(calls.clone(), true, &config);
        let topic = CheetahString::from("topic");
        cache.get_message_queue(&topic).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.get_message_queue(&topic).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls.clone(), true, &ProxyConfig::default());
        let topic = CheetahString::from("topic");
        cache.get_message_queue(&topic).await.unwrap();
        cache.invalidate(&topic);
        cache.get_message_queue(&topic).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broker_addr_resolves_through_route() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = cache_with(calls, true, &ProxyConfig::default());
        let addr = cache
            .get_broker_addr(&CheetahString::from("broker-a"))
            .await
            .unwrap();
        assert_eq!(addr.as_str(), "127.0.0.1:10911");
    }
}
