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

use crate::common::message::Message;
use crate::connector::client_api::MQClientAPI;
use crate::connector::factory::ForwardClientFactory;
use crate::connector::results::AckResult;
use crate::connector::results::PopResult;
use crate::connector::results::PullResult;
use crate::connector::results::SendResult;
use crate::error::ProxyResult;
use crate::remoting::header::ack_message_request_header::AckMessageRequestHeader;
use crate::remoting::header::change_invisible_time_request_header::ChangeInvisibleTimeRequestHeader;
use crate::remoting::header::consumer_send_msg_back_request_header::ConsumerSendMsgBackRequestHeader;
use crate::remoting::header::end_transaction_request_header::EndTransactionRequestHeader;
use crate::remoting::header::pop_message_request_header::PopMessageRequestHeader;
use crate::remoting::header::pull_message_request_header::PullMessageRequestHeader;
use crate::remoting::header::send_message_request_header::SendMessageRequestHeader;
use crate::remoting::header::update_consumer_offset_request_header::UpdateConsumerOffsetRequestHeader;
use crate::remoting::heartbeat::HeartbeatData;
use crate::remoting::route::TopicRouteData;
use crate::remoting::RemotingCommand;

pub const DEFAULT_INSTANCE_NAME: &str = "rmq-proxy-default";
pub const PRODUCER_INSTANCE_NAME: &str = "rmq-proxy-producer";
pub const READ_CONSUMER_INSTANCE_NAME: &str = "rmq-proxy-read-consumer";
pub const WRITE_CONSUMER_INSTANCE_NAME: &str = "rmq-proxy-write-consumer";
pub const TRANSACTION_PRODUCER_INSTANCE_NAME: &str = "rmq-proxy-transaction-producer";

/// Route and offset queries, the non-message plumbing.
pub struct DefaultForwardClient {
    factory: Arc<ForwardClientFactory>,
}

impl DefaultForwardClient {
    pub fn new(factory: Arc<ForwardClientFactory>) -> Self {
        DefaultForwardClient { factory }
    }

    fn client(&self) -> ProxyResult<Arc<MQClientAPI>> {
        self.factory
            .get_mq_client(&CheetahString::from_static_str(DEFAULT_INSTANCE_NAME))
    }

    pub async fn get_topic_route_info(
        &self,
        topic: &CheetahString,
        timeout_millis: u64,
    ) -> ProxyResult<TopicRouteData> {
        self.client()?
            .get_topic_route_info_from_name_server(topic, timeout_millis)
            .await
    }

    pub async fn get_max_offset(
        &self,
        broker_addr: &CheetahString,
        topic: &CheetahString,
        queue_id: i32,
        timeout_millis: u64,
    ) -> ProxyResult<i64> {
        self.client()?
            .get_max_offset(broker_addr, topic, queue_id, timeout_millis)
            .await
    }

    pub async fn search_offset(
        &self,
        broker_addr: &CheetahString,
        topic: &CheetahString,
        queue_id: i32,
        timestamp: i64,
        timeout_millis: u64,
    ) -> ProxyResult<i64> {
        self.client()?
            .search_offset(broker_addr, topic, queue_id, timestamp, timeout_millis)
            .await
    }
}

pub struct ForwardProducer {
    factory: Arc<ForwardClientFactory>,
}

impl ForwardProducer {
    pub fn new(factory: Arc<ForwardClientFactory>) -> Self {
        ForwardProducer { factory }
    }

    fn client(&self) -> ProxyResult<Arc<MQClientAPI>> {
        self.factory
            .get_mq_client(&CheetahString::from_static_str(PRODUCER_INSTANCE_NAME))
    }

    /// Transactional prepare messages go through a dedicated pool so tx
    /// policies do not disturb plain publishing.
    fn transaction_client(&self) -> ProxyResult<Arc<MQClientAPI>> {
        self.factory.get_mq_client(&CheetahString::from_static_str(
            TRANSACTION_PRODUCER_INSTANCE_NAME,
        ))
    }

    pub async fn send_message(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        message: &Message,
        request_header: SendMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<SendResult> {
        self.client()?
            .send_message(broker_addr, broker_name, message, request_header, timeout_millis)
            .await
    }

    pub async fn send_transactional_message(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        message: &Message,
        request_header: SendMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<SendResult> {
        self.transaction_client()?
            .send_message(broker_addr, broker_name, message, request_header, timeout_millis)
            .await
    }

    pub async fn send_batch_message(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        messages: Vec<Message>,
        request_header: SendMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<SendResult> {
        self.client()?
            .send_batch_message(broker_addr, broker_name, messages, request_header, timeout_millis)
            .await
    }

    pub async fn send_message_back(
        &self,
        broker_addr: &CheetahString,
        request_header: ConsumerSendMsgBackRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<RemotingCommand> {
        self.client()?
            .send_message_back(broker_addr, request_header, timeout_millis)
            .await
    }

    pub async fn heart_beat(
        &self,
        broker_addr: &CheetahString,
        heartbeat_data: &HeartbeatData,
        timeout_millis: u64,
    ) -> ProxyResult<i32> {
        self.client()?
            .send_heartbeat(broker_addr, heartbeat_data, timeout_millis)
            .await
    }

    pub async fn end_transaction(
        &self,
        broker_addr: &CheetahString,
        request_header: EndTransactionRequestHeader,
        remark: impl Into<CheetahString>,
        timeout_millis: u64,
    ) -> ProxyResult<()> {
        self.transaction_client()?
            .end_transaction_oneway(broker_addr, request_header, remark, timeout_millis)
            .await
    }
}

/// Long-polling pop/pull path, kept apart from the short-latency write path.
pub struct ForwardReadConsumer {
    factory: Arc<ForwardClientFactory>,
}

impl ForwardReadConsumer {
    pub fn new(factory: Arc<ForwardClientFactory>) -> Self {
        ForwardReadConsumer { factory }
    }

    fn client(&self) -> ProxyResult<Arc<MQClientAPI>> {
        self.factory
            .get_mq_client(&CheetahString::from_static_str(READ_CONSUMER_INSTANCE_NAME))
    }

    pub async fn pop_message(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        request_header: PopMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<PopResult> {
        self.client()?
            .pop_message(broker_addr, broker_name, request_header, timeout_millis)
            .await
    }

    pub async fn pull_message(
        &self,
        broker_addr: &CheetahString,
        request_header: PullMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<PullResult> {
        self.client()?
            .pull_message(broker_addr, request_header, timeout_millis)
            .await
    }
}

pub struct ForwardWriteConsumer {
    factory: Arc<ForwardClientFactory>,
}

impl ForwardWriteConsumer {
    pub fn new(factory: Arc<ForwardClientFactory>) -> Self {
        ForwardWriteConsumer { factory }
    }

    fn client(&self) -> ProxyResult<Arc<MQClientAPI>> {
        self.factory
            .get_mq_client(&CheetahString::from_static_str(WRITE_CONSUMER_INSTANCE_NAME))
    }

    pub async fn ack_message(
        &self,
        broker_addr: &CheetahString,
        request_header: AckMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<AckResult> {
        self.client()?
            .ack_message(broker_addr, request_header, timeout_millis)
            .await
    }

    pub async fn change_invisible_time(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        request_header: ChangeInvisibleTimeRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<AckResult> {
        self.client()?
            .change_invisible_time(broker_addr, broker_name, request_header, timeout_millis)
            .await
    }

    pub async fn update_consumer_offset_oneway(
        &self,
        broker_addr: &CheetahString,
        request_header: UpdateConsumerOffsetRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<()> {
        self.client()?
            .update_consumer_offset_oneway(broker_addr, request_header, timeout_millis)
            .await
    }

    pub async fn get_consumer_list_by_group(
        &self,
        broker_addr: &CheetahString,
        consumer_group: &CheetahString,
        timeout_millis: u64,
    ) -> ProxyResult<Vec<CheetahString>> {
        self.client()?
            .get_consumer_list_by_group(broker_addr, consumer_group, timeout_millis)
            .await
    }
}
