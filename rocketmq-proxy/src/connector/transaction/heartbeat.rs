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

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::warn;

use crate::config::ProxyConfig;
use crate::connector::forward_client::ForwardProducer;
use crate::connector::route::TopicRouteCache;
use crate::remoting::heartbeat::HeartbeatData;
use crate::remoting::heartbeat::ProducerData;

pub const TRANS_HEARTBEAT_CLIENT_ID: &str = "rmq-proxy-producer-client";

/// Keeps every broker hosting a prepared transactional message aware of the
/// producer group that sent it, so the broker knows whom to ask for
/// resolution on timeout.
pub struct TransactionHeartbeatRegisterService {
    config: Arc<ProxyConfig>,
    forward_producer: Arc<ForwardProducer>,
    topic_route_cache: Arc<TopicRouteCache>,
    group_cluster_data: DashMap<CheetahString, HashSet<CheetahString>>,
    /// Admission bound for per-broker heartbeat sends; submissions over the
    /// bound are dropped, the next tick retries.
    send_permits: Arc<Semaphore>,
    shutdown_token: CancellationToken,
}

impl TransactionHeartbeatRegisterService {
    pub fn new(
        config: Arc<ProxyConfig>,
        forward_producer: Arc<ForwardProducer>,
        topic_route_cache: Arc<TopicRouteCache>,
    ) -> Self {
        let permits = config.transaction_heartbeat_thread_pool_nums
            + config.transaction_heartbeat_thread_pool_queue_capacity;
        TransactionHeartbeatRegisterService {
            config,
            forward_producer,
            topic_route_cache,
            group_cluster_data: DashMap::new(),
            send_permits: Arc::new(Semaphore::new(permits)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Record the clusters that now hold half messages of this group.
    pub async fn add_producer_group(&self, group: &CheetahString, topic: &CheetahString) {
        match self.topic_route_cache.get_message_queue(topic).await {
            Ok(wrapper) => {
                for broker_data in &wrapper.topic_route_data().broker_datas {
                    self.group_cluster_data
                        .entry(group.clone())
                        .or_default()
                        .insert(broker_data.cluster.clone());
                }
            }
            Err(e) => {
                error!(
                    "add producer group err in txHeartBeat. groupId: {}, err: {}",
                    group, e
                );
            }
        }
    }

    pub fn on_producer_group_offline(&self, group: &CheetahString) {
        self.group_cluster_data.remove(group);
    }

    pub fn start(self: &Arc<Self>) {
        let service = self.clone();
        let period = Duration::from_secs(service.config.transaction_heartbeat_period_second);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // the immediate first tick
            loop {
                tokio::select! {
                    _ = ticker.tick() => service.scan_producer_heartbeat().await,
                    _ = service.shutdown_token.cancelled() => break,
                }
            }
        });
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// One pass over the group→cluster map: batch producer groups into
    /// heartbeat payloads per cluster, then fan each payload out to every
    /// broker of that cluster.
    pub async fn scan_producer_heartbeat(&self) {
        let batch_num = self.config.transaction_heartbeat_batch_num.max(1);
        let mut cluster_heartbeat_data: HashMap<CheetahString, Vec<HeartbeatData>> = HashMap::new();

        for entry in self.group_cluster_data.iter() {
            let group = entry.key();
            for cluster in entry.value() {
                let heartbeat_list = cluster_heartbeat_data.entry(cluster.clone()).or_default();
                let needs_new = heartbeat_list
                    .last()
                    .map_or(true, |heartbeat| heartbeat.producer_data_set.len() >= batch_num);
                if needs_new {
                    heartbeat_list.push(HeartbeatData {
                        client_id: CheetahString::from_static_str(TRANS_HEARTBEAT_CLIENT_ID),
                        ..Default::default()
                    });
                }
                heartbeat_list
                    .last_mut()
                    .expect("just pushed")
                    .producer_data_set
                    .insert(ProducerData {
                        group_name: group.clone(),
                    });
            }
        }

        for (cluster, heartbeat_list) in cluster_heartbeat_data {
            self.send_heartbeat_to_cluster(&cluster, heartbeat_list).await;
        }
    }

    async fn send_heartbeat_to_cluster(
        &self,
        cluster: &CheetahString,
        heartbeat_list: Vec<HeartbeatData>,
    ) {
        // cluster names register as system topics, the route yields every
        // broker in the cluster
        let wrapper = match self.topic_route_cache.get_message_queue(cluster).await {
            Ok(wrapper) => wrapper,
            Err(e) => {
                error!(
                    "get broker addr in cluster failed in tx. clusterName: {}, err: {}",
                    cluster, e
                );
                return;
            }
        };

        let mut join_handles = Vec::new();
        for heartbeat_data in heartbeat_list {
            for broker_data in &wrapper.topic_route_data().broker_datas {
                let Some(broker_addr) = broker_data.select_broker_addr() else {
                    continue;
                };
                let Ok(permit) = self.send_permits.clone().try_acquire_owned() else {
                    warn!(
                        "transaction heartbeat to {} dropped, send queue is full",
                        broker_addr
                    );
                    continue;
                };
                let forward_producer = self.forward_producer.clone();
                let heartbeat_data = heartbeat_data.clone();
                let timeout_millis = self.config.mq_client_api_timeout_millis;
                join_handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = forward_producer
                        .heart_beat(&broker_addr, &heartbeat_data, timeout_millis)
                        .await
                    {
                        error!(
                            "Send transactionHeartbeat to broker err. brokerAddr: {}, err: {}",
                            broker_addr, e
                        );
                    }
                }));
            }
        }
        for join_handle in join_handles {
            let _ = join_handle.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn group_count(&self) -> usize {
        self.group_cluster_data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::connector::factory::ForwardClientFactory;
    use crate::connector::forward_client::DefaultForwardClient;
    use crate::error::ProxyResult;
    use crate::remoting::client::RemotingClient;
    use crate::remoting::code::RequestCode;
    use crate::remoting::code::ResponseCode;
    use crate::remoting::route::BrokerData;
    use crate::remoting::route::QueueData;
    use crate::remoting::route::TopicRouteData;
    use crate::remoting::RemotingCommand;

    /// Answers route queries from a static table and records heartbeats.
    struct ClusterBroker {
        heartbeats: Arc<Mutex<Vec<(CheetahString, HeartbeatData)>>>,
    }

    fn route_for(cluster: &str) -> TopicRouteData {
        TopicRouteData {
            order_topic_conf: None,
            queue_datas: vec![QueueData {
                broker_name: CheetahString::from("broker-a"),
                read_queue_nums: 4,
                write_queue_nums: 4,
                perm: 6,
                topic_sys_flag: 0,
            }],
            broker_datas: vec![BrokerData::new(
                cluster,
                "broker-a",
                std::collections::HashMap::from([(0, CheetahString::from("127.0.0.1:10911"))]),
            )],
        }
    }

    #[tonic::async_trait]
    impl RemotingClient for ClusterBroker {
        async fn invoke(
            &self,
            addr: &CheetahString,
            request: RemotingCommand,
            _timeout_millis: u64,
        ) -> ProxyResult<RemotingCommand> {
            match RequestCode::from(request.code()) {
                RequestCode::GetRouteInfoByTopic => {
                    Ok(
                        RemotingCommand::create_response_command_with_code(ResponseCode::Success)
                            .set_body(serde_json::to_vec(&route_for("c1")).unwrap()),
                    )
                }
                RequestCode::HeartBeat => {
                    let heartbeat: HeartbeatData =
                        serde_json::from_slice(request.body().unwrap()).unwrap();
                    self.heartbeats.lock().unwrap().push((addr.clone(), heartbeat));
                    Ok(RemotingCommand::create_response_command_with_code(
                        ResponseCode::Success,
                    ))
                }
                _ => panic!("unexpected request code {}", request.code()),
            }
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

    fn service_with(
        heartbeats: Arc<Mutex<Vec<(CheetahString, HeartbeatData)>>>,
        batch_num: usize,
    ) -> TransactionHeartbeatRegisterService {
        let config = Arc::new(ProxyConfig {
            transaction_heartbeat_batch_num: batch_num,
            ..Default::default()
        });
        let factory = Arc::new(ForwardClientFactory::new(
            vec![CheetahString::from("127.0.0.1:9876")],
            Arc::new(move || {
                Arc::new(ClusterBroker {
                    heartbeats: heartbeats.clone(),
                }) as Arc<dyn RemotingClient>
            }),
        ));
        TransactionHeartbeatRegisterService::new(
            config.clone(),
            Arc::new(ForwardProducer::new(factory.clone())),
            Arc::new(TopicRouteCache::new(
                Arc::new(DefaultForwardClient::new(factory)),
                &config,
            )),
        )
    }

    #[tokio::test]
    async fn heartbeats_are_batched_per_cluster() {
        let heartbeats = Arc::new(Mutex::new(Vec::new()));
        let service = service_with(heartbeats.clone(), 2);

        for group in ["g1", "g2", "g3"] {
            service
                .add_producer_group(&CheetahString::from(group), &CheetahString::from("topic"))
                .await;
        }
        service.scan_producer_heartbeat().await;

        let sent = heartbeats.lock().unwrap();
        assert_eq!(sent.len(), 2, "batch num 2 splits 3 groups into 2 payloads");
        let mut sizes: Vec<usize> = sent
            .iter()
            .map(|(_, heartbeat)| heartbeat.producer_data_set.len())
            .collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);

        let union: HashSet<String> = sent
            .iter()
            .flat_map(|(_, heartbeat)| {
                heartbeat
                    .producer_data_set
                    .iter()
                    .map(|producer| producer.group_name.to_string())
            })
            .collect();
        assert_eq!(
            union,
            HashSet::from(["g1".to_string(), "g2".to_string(), "g3".to_string()])
        );
        for (_, heartbeat) in sent.iter() {
            assert_eq!(heartbeat.client_id.as_str(), TRANS_HEARTBEAT_CLIENT_ID);
        }
    }

    #[tokio::test]
    async fn offline_group_is_removed_from_scan() {
        let heartbeats = Arc::new(Mutex::new(Vec::new()));
        let service = service_with(heartbeats.clone(), 100);

        service
            .add_producer_group(&CheetahString::from("g1"), &CheetahString::from("topic"))
            .await;
        assert_eq!(service.group_count(), 1);
        service.on_producer_group_offline(&CheetahString::from("g1"));
        assert_eq!(service.group_count(), 0);

        service.scan_producer_heartbeat().await;
        assert!(heartbeats.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_map_sends_nothing() {
        let heartbeats = Arc::new(Mutex::new(Vec::new()));
        let service = service_with(heartbeats.clone(), 2);
        service.scan_producer_heartbeat().await;
        assert!(heartbeats.lock().unwrap().is_empty());
    }
}
