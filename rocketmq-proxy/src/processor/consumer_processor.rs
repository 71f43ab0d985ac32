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
use tracing::error;

use crate::common::filter_utils::FilterUtils;
use crate::common::message::message_ext::MessageExt;
use crate::common::receipt_handle::ReceiptHandle;
use crate::common::time_utils;
use crate::config::ProxyConfig;
use crate::connector::forward_client::DefaultForwardClient;
use crate::connector::forward_client::ForwardProducer;
use crate::connector::forward_client::ForwardReadConsumer;
use crate::connector::forward_client::ForwardWriteConsumer;
use crate::connector::results::AckResult;
use crate::connector::results::PopResult;
use crate::connector::results::PopStatus;
use crate::connector::results::PullResult;
use crate::connector::route::ReadQueueSelector;
use crate::connector::route::TopicRouteCache;
use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::remoting::code::ResponseCode;
use crate::remoting::header::ack_message_request_header::AckMessageRequestHeader;
use crate::remoting::header::change_invisible_time_request_header::ChangeInvisibleTimeRequestHeader;
use crate::remoting::header::consumer_send_msg_back_request_header::ConsumerSendMsgBackRequestHeader;
use crate::remoting::header::pop_message_request_header::PopMessageRequestHeader;
use crate::remoting::header::pull_message_request_header::PullMessageRequestHeader;
use crate::remoting::header::update_consumer_offset_request_header::UpdateConsumerOffsetRequestHeader;
use crate::remoting::heartbeat::SubscriptionData;

/// Where a client wants its offset resolved for a pull session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOffsetPolicy {
    Beginning,
    End,
    TimePoint(i64),
}

/// Outcome of a nack: either the invisibility was extended for another
/// attempt, or the message went to the dead-letter queue.
#[derive(Debug, Clone)]
pub enum NackResult {
    ChangedInvisible(AckResult),
    ForwardedToDeadLetter { code: i32, remark: String },
}

/// The pop/ack/nack pipeline, the stateless heart of the proxy: all the
/// state a terminal operation needs travels inside the receipt handle.
pub struct ConsumerProcessor {
    config: Arc<ProxyConfig>,
    default_client: Arc<DefaultForwardClient>,
    forward_read_consumer: Arc<ForwardReadConsumer>,
    forward_write_consumer: Arc<ForwardWriteConsumer>,
    forward_producer: Arc<ForwardProducer>,
    topic_route_cache: Arc<TopicRouteCache>,
    read_queue_selector: Arc<dyn ReadQueueSelector>,
}

impl ConsumerProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<ProxyConfig>,
        default_client: Arc<DefaultForwardClient>,
        forward_read_consumer: Arc<ForwardReadConsumer>,
        forward_write_consumer: Arc<ForwardWriteConsumer>,
        forward_producer: Arc<ForwardProducer>,
        topic_route_cache: Arc<TopicRouteCache>,
        read_queue_selector: Arc<dyn ReadQueueSelector>,
    ) -> Self {
        ConsumerProcessor {
            config,
            default_client,
            forward_read_consumer,
            forward_write_consumer,
            forward_producer,
            topic_route_cache,
            read_queue_selector,
        }
    }

    /// Pop from the next readable broker, stamp receipt handles, drop (and
    /// silently ack) messages whose tag does not match the subscription.
    /// `deadline_millis` is the time left on the inbound call; the broker
    /// poll is shortened so the reply still reaches the client in time.
    #[allow(clippy::too_many_arguments)]
    pub async fn pop_message(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        max_msg_nums: u32,
        invisible_millis: u64,
        poll_millis: u64,
        init_mode: i32,
        subscription: &SubscriptionData,
        fifo: bool,
        deadline_millis: u64,
    ) -> ProxyResult<PopResult> {
        let wrapper = self.topic_route_cache.get_message_queue(topic).await?;
        let queue = self
            .read_queue_selector
            .select_read_queue(consumer_group, &wrapper)
            .ok_or_else(|| ProxyError::NoReadableQueue(topic.to_string()))?;

        let reserve = self.config.long_polling_reserve_time_in_millis;
        let poll_time = poll_millis.min(deadline_millis.saturating_sub(reserve));
        let request_header = PopMessageRequestHeader {
            consumer_group: consumer_group.clone(),
            topic: topic.clone(),
            queue_id: queue.queue_id,
            max_msg_nums,
            invisible_time: invisible_millis,
            poll_time,
            born_time: time_utils::get_current_millis(),
            init_mode,
            exp_type: Some(subscription.expression_type.clone()),
            exp: Some(subscription.sub_string.clone()),
            order: Some(fifo),
        };
        let network_timeout = poll_time + self.config.mq_client_api_timeout_millis;
        let mut pop_result = self
            .forward_read_consumer
            .pop_message(&queue.broker_addr, &queue.broker_name, request_header, network_timeout)
            .await?;

        if pop_result.pop_status == PopStatus::Found && subscription.is_tag_type() {
            let (matched, dropped): (Vec<MessageExt>, Vec<MessageExt>) = pop_result
                .msg_found_list
                .into_iter()
                .partition(|message| {
                    FilterUtils::is_tag_matched(&subscription.tags_set, message.get_tags())
                });
            pop_result.msg_found_list = matched;
            for message in dropped {
                self.ack_no_matched_message(consumer_group, topic, message);
            }
        }
        Ok(pop_result)
    }

    /// Filtered-out messages are acked so the broker frees their check
    /// points; best-effort and never awaited by the pop reply.
    fn ack_no_matched_message(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        message: MessageExt,
    ) {
        let consumer_group = consumer_group.clone();
        let topic = topic.clone();
        let forward_write_consumer = self.forward_write_consumer.clone();
        let topic_route_cache = self.topic_route_cache.clone();
        let timeout_millis = self.config.mq_client_api_timeout_millis;
        tokio::spawn(async move {
            let result = async {
                let handle = ReceiptHandle::from_message_ext(&message)?;
                let broker_addr = topic_route_cache.get_broker_addr(handle.broker_name()).await?;
                let request_header = AckMessageRequestHeader {
                    consumer_group: consumer_group.clone(),
                    topic: CheetahString::from_string(
                        handle.real_topic(topic.as_str(), consumer_group.as_str()),
                    ),
                    queue_id: handle.queue_id(),
                    extra_info: handle.raw().clone(),
                    offset: handle.offset(),
                };
                forward_write_consumer
                    .ack_message(&broker_addr, request_header, timeout_millis)
                    .await
            }
            .await;
            if let Err(e) = result {
                error!("ack no matched message failed: {}", e);
            }
        });
    }

    pub async fn ack_message(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        receipt_handle: &str,
        timeout_millis: u64,
    ) -> ProxyResult<AckResult> {
        let handle = ReceiptHandle::decode(receipt_handle)?;
        let broker_addr = self
            .topic_route_cache
            .get_broker_addr(handle.broker_name())
            .await?;
        let request_header = AckMessageRequestHeader {
            consumer_group: consumer_group.clone(),
            topic: CheetahString::from_string(
                handle.real_topic(topic.as_str(), consumer_group.as_str()),
            ),
            queue_id: handle.queue_id(),
            extra_info: handle.raw().clone(),
            offset: handle.offset(),
        };
        self.forward_write_consumer
            .ack_message(&broker_addr, request_header, timeout_millis)
            .await
    }

    /// The reply carries a renewed receipt handle; the one passed in is
    /// invalid the moment the broker accepts the change.
    pub async fn change_invisible_time(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        receipt_handle: &str,
        invisible_millis: u64,
        timeout_millis: u64,
    ) -> ProxyResult<AckResult> {
        let handle = ReceiptHandle::decode(receipt_handle)?;
        let broker_addr = self
            .topic_route_cache
            .get_broker_addr(handle.broker_name())
            .await?;
        let request_header = ChangeInvisibleTimeRequestHeader {
            consumer_group: consumer_group.clone(),
            topic: CheetahString::from_string(
                handle.real_topic(topic.as_str(), consumer_group.as_str()),
            ),
            queue_id: handle.queue_id(),
            extra_info: handle.raw().clone(),
            offset: handle.offset(),
            invisible_time: invisible_millis,
        };
        self.forward_write_consumer
            .change_invisible_time(&broker_addr, handle.broker_name(), request_header, timeout_millis)
            .await
    }

    /// Below the attempt ceiling the message gets another invisibility
    /// window; at the ceiling it is forwarded to the group DLQ and, only on
    /// success, the original handle is acked to free broker resources.
    #[allow(clippy::too_many_arguments)]
    pub async fn nack_message(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        receipt_handle: &str,
        message_id: &CheetahString,
        delivery_attempt: i32,
        max_delivery_attempts: i32,
        next_invisible_millis: u64,
        timeout_millis: u64,
    ) -> ProxyResult<NackResult> {
        if delivery_attempt >= max_delivery_attempts {
            return self
                .forward_to_dead_letter_queue(
                    consumer_group,
                    topic,
                    receipt_handle,
                    message_id,
                    max_delivery_attempts,
                    timeout_millis,
                )
                .await;
        }
        let ack_result = self
            .change_invisible_time(
                consumer_group,
                topic,
                receipt_handle,
                next_invisible_millis,
                timeout_millis,
            )
            .await?;
        Ok(NackResult::ChangedInvisible(ack_result))
    }

    pub async fn forward_to_dead_letter_queue(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        receipt_handle: &str,
        message_id: &CheetahString,
        max_delivery_attempts: i32,
        timeout_millis: u64,
    ) -> ProxyResult<NackResult> {
        let handle = ReceiptHandle::decode(receipt_handle)?;
        let broker_addr = self
            .topic_route_cache
            .get_broker_addr(handle.broker_name())
            .await?;
        let request_header = ConsumerSendMsgBackRequestHeader {
            group: consumer_group.clone(),
            origin_topic: CheetahString::from_string(
                handle.real_topic(topic.as_str(), consumer_group.as_str()),
            ),
            offset: handle.offset(),
            // negative delay level bypasses retry and lands in the DLQ
            delay_level: -1,
            origin_msg_id: message_id.clone(),
            unit_mode: false,
            max_reconsume_times: Some(max_delivery_attempts),
        };
        let response = self
            .forward_producer
            .send_message_back(&broker_addr, request_header, timeout_millis)
            .await?;

        if ResponseCode::from(response.code()).is_success() {
            let ack_header = AckMessageRequestHeader {
                consumer_group: consumer_group.clone(),
                topic: CheetahString::from_string(
                    handle.real_topic(topic.as_str(), consumer_group.as_str()),
                ),
                queue_id: handle.queue_id(),
                extra_info: handle.raw().clone(),
                offset: handle.offset(),
            };
            if let Err(e) = self
                .forward_write_consumer
                .ack_message(&broker_addr, ack_header, timeout_millis)
                .await
            {
                error!("ack after DLQ forward failed: {}", e);
            }
        }
        Ok(NackResult::ForwardedToDeadLetter {
            code: response.code(),
            remark: response.remark_or_default(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn pull_message(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        broker_name: &CheetahString,
        queue_id: i32,
        queue_offset: i64,
        max_msg_nums: i32,
        poll_millis: u64,
        subscription: &SubscriptionData,
        timeout_millis: u64,
    ) -> ProxyResult<PullResult> {
        let wrapper = self.topic_route_cache.get_message_queue(topic).await?;
        let broker_addr = wrapper.broker_addr(broker_name.as_str()).ok_or_else(|| {
            ProxyError::Internal(format!("no address for broker {broker_name}"))
        })?;
        let request_header = PullMessageRequestHeader {
            consumer_group: consumer_group.clone(),
            topic: topic.clone(),
            queue_id,
            queue_offset,
            max_msg_nums,
            sys_flag: 0,
            commit_offset: 0,
            suspend_timeout_millis: poll_millis,
            subscription: Some(subscription.sub_string.clone()),
            sub_version: subscription.sub_version,
            expression_type: Some(subscription.expression_type.clone()),
        };
        self.forward_read_consumer
            .pull_message(&broker_addr, request_header, timeout_millis)
            .await
    }

    pub async fn query_offset(
        &self,
        topic: &CheetahString,
        broker_name: &CheetahString,
        queue_id: i32,
        policy: QueryOffsetPolicy,
        timeout_millis: u64,
    ) -> ProxyResult<i64> {
        match policy {
            QueryOffsetPolicy::Beginning => Ok(0),
            QueryOffsetPolicy::End => {
                let broker_addr = self.topic_route_cache.get_broker_addr(broker_name).await?;
                self.default_client
                    .get_max_offset(&broker_addr, topic, queue_id, timeout_millis)
                    .await
            }
            QueryOffsetPolicy::TimePoint(timestamp) => {
                let broker_addr = self.topic_route_cache.get_broker_addr(broker_name).await?;
                self.default_client
                    .search_offset(&broker_addr, topic, queue_id, timestamp, timeout_millis)
                    .await
            }
        }
    }

    pub async fn update_consumer_offset(
        &self,
        consumer_group: &CheetahString,
        topic: &CheetahString,
        broker_name: &CheetahString,
        queue_id: i32,
        commit_offset: i64,
        timeout_millis: u64,
    ) -> ProxyResult<()> {
        let broker_addr = self.topic_route_cache.get_broker_addr(broker_name).await?;
        let request_header = UpdateConsumerOffsetRequestHeader {
            consumer_group: consumer_group.clone(),
            topic: topic.clone(),
            queue_id,
            commit_offset,
        };
        self.forward_write_consumer
            .update_consumer_offset_oneway(&broker_addr, request_header, timeout_millis)
            .await
    }

    pub fn default_timeout(&self) -> u64 {
        self.config.mq_client_api_timeout_millis
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::connector::factory::ForwardClientFactory;
    use crate::connector::factory::RemotingClientProvider;
    use crate::remoting::client::RemotingClient;
    use crate::remoting::code::RequestCode;
    use crate::remoting::code::ResponseCode;
    use crate::remoting::command_custom_header::CommandCustomHeader;
    use crate::remoting::header::get_max_offset_response_header::GetMaxOffsetResponseHeader;
    use crate::remoting::header::search_offset_response_header::SearchOffsetResponseHeader;
    use crate::remoting::route::BrokerData;
    use crate::remoting::route::QueueData;
    use crate::remoting::route::TopicRouteData;
    use crate::remoting::RemotingCommand;

    struct OffsetBroker {
        calls: Arc<Mutex<Vec<(RequestCode, HashMap<CheetahString, CheetahString>)>>>,
    }

    fn route() -> TopicRouteData {
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
                "c1",
                "broker-a",
                HashMap::from([(0, CheetahString::from("127.0.0.1:10911"))]),
            )],
        }
    }

    #[tonic::async_trait]
    impl RemotingClient for OffsetBroker {
        async fn invoke(
            &self,
            _addr: &CheetahString,
            request: RemotingCommand,
            _timeout_millis: u64,
        ) -> ProxyResult<RemotingCommand> {
            let code = RequestCode::from(request.code());
            self.calls
                .lock()
                .unwrap()
                .push((code, request.ext_fields().cloned().unwrap_or_default()));
            let response = match code {
                RequestCode::GetRouteInfoByTopic => {
                    RemotingCommand::create_response_command_with_code(ResponseCode::Success)
                        .set_body(serde_json::to_vec(&route()).unwrap())
                }
                RequestCode::GetMaxOffset => {
                    RemotingCommand::create_response_command_with_code(ResponseCode::Success)
                        .set_ext_fields(GetMaxOffsetResponseHeader { offset: 1024 }.to_map())
                }
                RequestCode::SearchOffsetByTimestamp => {
                    RemotingCommand::create_response_command_with_code(ResponseCode::Success)
                        .set_ext_fields(SearchOffsetResponseHeader { offset: 512 }.to_map())
                }
                _ => RemotingCommand::create_response_command_with_code(ResponseCode::Success),
            };
            Ok(response)
        }

        async fn invoke_oneway(
            &self,
            _addr: &CheetahString,
            request: RemotingCommand,
            _timeout_millis: u64,
        ) -> ProxyResult<()> {
            self.calls.lock().unwrap().push((
                RequestCode::from(request.code()),
                request.ext_fields().cloned().unwrap_or_default(),
            ));
            Ok(())
        }

        async fn shutdown(&self) {}
    }

    fn processor_with(
        calls: Arc<Mutex<Vec<(RequestCode, HashMap<CheetahString, CheetahString>)>>>,
    ) -> ConsumerProcessor {
        let config = Arc::new(ProxyConfig::default());
        let client_provider: RemotingClientProvider = Arc::new(move || {
            Arc::new(OffsetBroker {
                calls: calls.clone(),
            }) as Arc<dyn RemotingClient>
        });
        let factory = Arc::new(ForwardClientFactory::new(
            vec![CheetahString::from("127.0.0.1:9876")],
            client_provider,
        ));
        let default_client = Arc::new(DefaultForwardClient::new(factory.clone()));
        ConsumerProcessor::new(
            config.clone(),
            default_client.clone(),
            Arc::new(ForwardReadConsumer::new(factory.clone())),
            Arc::new(ForwardWriteConsumer::new(factory.clone())),
            Arc::new(ForwardProducer::new(factory.clone())),
            Arc::new(TopicRouteCache::new(default_client, &config)),
            Arc::new(crate::connector::route::DefaultReadQueueSelector::new()),
        )
    }

    #[tokio::test]
    async fn query_offset_policies() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let processor = processor_with(calls.clone());
        let topic = CheetahString::from("t");
        let broker_name = CheetahString::from("broker-a");

        let beginning = processor
            .query_offset(&topic, &broker_name, 0, QueryOffsetPolicy::Beginning, 1000)
            .await
            .unwrap();
        assert_eq!(beginning, 0);
        assert!(calls.lock().unwrap().is_empty(), "BEGINNING needs no broker");

        let end = processor
            .query_offset(&topic, &broker_name, 0, QueryOffsetPolicy::End, 1000)
            .await
            .unwrap();
        assert_eq!(end, 1024);

        let at_time = processor
            .query_offset(
                &topic,
                &broker_name,
                0,
                QueryOffsetPolicy::TimePoint(1700000000000),
                1000,
            )
            .await
            .unwrap();
        assert_eq!(at_time, 512);
        let recorded = calls.lock().unwrap();
        assert!(recorded
            .iter()
            .any(|(code, _)| *code == RequestCode::SearchOffsetByTimestamp));
    }

    #[tokio::test]
    async fn update_consumer_offset_is_oneway() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let processor = processor_with(calls.clone());
        processor
            .update_consumer_offset(
                &CheetahString::from("g"),
                &CheetahString::from("t"),
                &CheetahString::from("broker-a"),
                2,
                77,
                1000,
            )
            .await
            .unwrap();
        let recorded = calls.lock().unwrap();
        let (_, fields) = recorded
            .iter()
            .find(|(code, _)| *code == RequestCode::UpdateConsumerOffset)
            .expect("offset update sent");
        assert_eq!(fields.get("commitOffset").unwrap().as_str(), "77");
        assert_eq!(fields.get("queueId").unwrap().as_str(), "2");
    }

    #[tokio::test]
    async fn consumer_list_lookup_goes_through_write_consumer() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let processor = processor_with(calls.clone());
        let list = processor
            .forward_write_consumer
            .get_consumer_list_by_group(
                &CheetahString::from("127.0.0.1:10911"),
                &CheetahString::from("g"),
                1000,
            )
            .await
            .unwrap();
        assert!(list.is_empty());
        assert!(calls
            .lock()
            .unwrap()
            .iter()
            .any(|(code, _)| *code == RequestCode::GetConsumerListByGroup));
    }
}
