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

use crate::common::message::message_properties_to_string;
use crate::common::message::message_sys_flag;
use crate::common::message::Message;
use crate::common::time_utils;
use crate::config::ProxyConfig;
use crate::connector::forward_client::ForwardProducer;
use crate::connector::results::SendResult;
use crate::connector::route::TopicRouteCache;
use crate::connector::route::WriteQueueSelector;
use crate::connector::transaction::TransactionHeartbeatRegisterService;
use crate::connector::transaction::TransactionId;
use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::remoting::header::end_transaction_request_header::EndTransactionRequestHeader;
use crate::remoting::header::send_message_request_header::SendMessageRequestHeader;
use crate::remoting::header::send_message_request_header::DEFAULT_TOPIC;
use crate::remoting::header::send_message_request_header::DEFAULT_TOPIC_QUEUE_NUMS;

/// What a transaction resolves to when the client (or a server check)
/// finishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionResolution {
    Commit,
    Rollback,
}

/// Send, send-back and transaction completion, version-agnostic.
pub struct ProducerProcessor {
    config: Arc<ProxyConfig>,
    forward_producer: Arc<ForwardProducer>,
    topic_route_cache: Arc<TopicRouteCache>,
    write_queue_selector: Arc<dyn WriteQueueSelector>,
    transaction_heartbeat: Arc<TransactionHeartbeatRegisterService>,
}

impl ProducerProcessor {
    pub fn new(
        config: Arc<ProxyConfig>,
        forward_producer: Arc<ForwardProducer>,
        topic_route_cache: Arc<TopicRouteCache>,
        write_queue_selector: Arc<dyn WriteQueueSelector>,
        transaction_heartbeat: Arc<TransactionHeartbeatRegisterService>,
    ) -> Self {
        ProducerProcessor {
            config,
            forward_producer,
            topic_route_cache,
            write_queue_selector,
            transaction_heartbeat,
        }
    }

    /// Single or batched publish. The selector picks the writable queue, a
    /// transactional prepare additionally registers the producer group for
    /// the heartbeat loop and rewrites the result's transaction id into the
    /// proxy-scoped form.
    pub async fn send_message(
        &self,
        producer_group: &CheetahString,
        topic: &CheetahString,
        mut messages: Vec<Message>,
        timeout_millis: u64,
    ) -> ProxyResult<SendResult> {
        if messages.is_empty() {
            return Err(ProxyError::ClientInput("empty message list".to_string()));
        }
        let wrapper = self.topic_route_cache.get_message_queue(topic).await?;
        let queue = self
            .write_queue_selector
            .select_write_queue(producer_group, &wrapper)
            .ok_or_else(|| ProxyError::NoWriteableQueue(topic.to_string()))?;

        let is_transactional = messages.len() == 1 && is_transaction_prepared(&messages[0]);
        let sys_flag = if is_transactional {
            message_sys_flag::TRANSACTION_PREPARED_TYPE
        } else {
            0
        };
        let request_header = SendMessageRequestHeader {
            producer_group: producer_group.clone(),
            topic: topic.clone(),
            default_topic: CheetahString::from_static_str(DEFAULT_TOPIC),
            default_topic_queue_nums: DEFAULT_TOPIC_QUEUE_NUMS,
            queue_id: queue.queue_id,
            sys_flag,
            born_timestamp: time_utils::get_current_millis() as i64,
            flag: messages[0].flag,
            properties: Some(CheetahString::from_string(message_properties_to_string(
                &messages[0].properties,
            ))),
            reconsume_times: None,
            unit_mode: None,
            batch: None,
            max_reconsume_times: None,
        };

        let mut result = if messages.len() == 1 {
            let message = messages.pop().expect("checked non-empty");
            if is_transactional {
                self.forward_producer
                    .send_transactional_message(
                        &queue.broker_addr,
                        &queue.broker_name,
                        &message,
                        request_header,
                        timeout_millis,
                    )
                    .await?
            } else {
                self.forward_producer
                    .send_message(
                        &queue.broker_addr,
                        &queue.broker_name,
                        &message,
                        request_header,
                        timeout_millis,
                    )
                    .await?
            }
        } else {
            self.forward_producer
                .send_batch_message(
                    &queue.broker_addr,
                    &queue.broker_name,
                    messages,
                    request_header,
                    timeout_millis,
                )
                .await?
        };

        if is_transactional {
            self.transaction_heartbeat
                .add_producer_group(producer_group, topic)
                .await;
            let broker_transaction_id = result
                .transaction_id
                .clone()
                .unwrap_or_else(|| result.msg_id.clone());
            let transaction_id = TransactionId::gen(
                queue.broker_name.clone(),
                broker_transaction_id,
                result.queue_offset,
                result.commit_log_offset,
            );
            result.transaction_id = Some(CheetahString::from_string(
                transaction_id.proxy_transaction_id(),
            ));
        }
        Ok(result)
    }

    /// One-way commit/rollback toward the broker that stored the half
    /// message, resolved from the proxy transaction id.
    pub async fn end_transaction(
        &self,
        producer_group: &CheetahString,
        proxy_transaction_id: &str,
        message_id: &CheetahString,
        resolution: TransactionResolution,
        from_transaction_check: bool,
        timeout_millis: u64,
    ) -> ProxyResult<()> {
        let transaction_id = TransactionId::decode(proxy_transaction_id)?;
        let broker_addr = self
            .topic_route_cache
            .get_broker_addr(transaction_id.broker_name())
            .await?;
        let commit_or_rollback = match resolution {
            TransactionResolution::Commit => message_sys_flag::TRANSACTION_COMMIT_TYPE,
            TransactionResolution::Rollback => message_sys_flag::TRANSACTION_ROLLBACK_TYPE,
        };
        let request_header = EndTransactionRequestHeader {
            producer_group: producer_group.clone(),
            tran_state_table_offset: transaction_id.tran_state_table_offset(),
            commit_log_offset: transaction_id.commit_log_offset(),
            commit_or_rollback,
            from_transaction_check,
            msg_id: if message_id.is_empty() {
                transaction_id.broker_transaction_id().clone()
            } else {
                message_id.clone()
            },
            transaction_id: transaction_id.broker_transaction_id().clone(),
        };
        self.forward_producer
            .end_transaction(&broker_addr, request_header, "end transaction", timeout_millis)
            .await
    }

    pub fn default_timeout(&self) -> u64 {
        self.config.mq_client_api_timeout_millis
    }
}

fn is_transaction_prepared(message: &Message) -> bool {
    message
        .get_property(crate::common::message::MessageConst::PROPERTY_TRANSACTION_PREPARED)
        .map(|value| value.as_str().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
