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
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use cheetah_string::CheetahString;
use tracing::warn;

use crate::common::extra_info_util::ExtraInfoUtil;
use crate::common::message::message_client_id_setter::MessageClientIDSetter;
use crate::common::message::message_decoder::MessageDecoder;
use crate::common::message::Message;
use crate::common::message::MessageConst;
use crate::connector::results::AckResult;
use crate::connector::results::AckStatus;
use crate::connector::results::PopResult;
use crate::connector::results::PopStatus;
use crate::connector::results::PullResult;
use crate::connector::results::PullStatus;
use crate::connector::results::SendResult;
use crate::connector::results::SendStatus;
use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::remoting::body::GetConsumerListByGroupResponseBody;
use crate::remoting::client::RemotingClient;
use crate::remoting::code::RequestCode;
use crate::remoting::code::ResponseCode;
use crate::remoting::header::ack_message_request_header::AckMessageRequestHeader;
use crate::remoting::header::change_invisible_time_request_header::ChangeInvisibleTimeRequestHeader;
use crate::remoting::header::change_invisible_time_response_header::ChangeInvisibleTimeResponseHeader;
use crate::remoting::header::consumer_send_msg_back_request_header::ConsumerSendMsgBackRequestHeader;
use crate::remoting::header::end_transaction_request_header::EndTransactionRequestHeader;
use crate::remoting::header::get_consumer_list_by_group_request_header::GetConsumerListByGroupRequestHeader;
use crate::remoting::header::get_max_offset_request_header::GetMaxOffsetRequestHeader;
use crate::remoting::header::get_max_offset_response_header::GetMaxOffsetResponseHeader;
use crate::remoting::header::get_route_info_request_header::GetRouteInfoRequestHeader;
use crate::remoting::header::pop_message_request_header::PopMessageRequestHeader;
use crate::remoting::header::pop_message_response_header::PopMessageResponseHeader;
use crate::remoting::header::pull_message_request_header::PullMessageRequestHeader;
use crate::remoting::header::pull_message_response_header::PullMessageResponseHeader;
use crate::remoting::header::search_offset_request_header::SearchOffsetRequestHeader;
use crate::remoting::header::search_offset_response_header::SearchOffsetResponseHeader;
use crate::remoting::header::send_message_request_header::SendMessageRequestHeader;
use crate::remoting::header::send_message_response_header::SendMessageResponseHeader;
use crate::remoting::header::update_consumer_offset_request_header::UpdateConsumerOffsetRequestHeader;
use crate::remoting::heartbeat::HeartbeatData;
use crate::remoting::route::TopicRouteData;
use crate::remoting::RemotingCommand;

/// Typed async calls over one [`RemotingClient`]. Every method performs one
/// round trip and resolves to success or failure exactly once.
pub struct MQClientAPI {
    remoting_client: Arc<dyn RemotingClient>,
    name_server_addrs: Vec<CheetahString>,
    name_server_index: AtomicUsize,
}

impl MQClientAPI {
    pub fn new(
        remoting_client: Arc<dyn RemotingClient>,
        name_server_addrs: Vec<CheetahString>,
    ) -> Self {
        MQClientAPI {
            remoting_client,
            name_server_addrs,
            name_server_index: AtomicUsize::new(0),
        }
    }

    pub fn remoting_client(&self) -> &Arc<dyn RemotingClient> {
        &self.remoting_client
    }

    fn select_name_server(&self) -> ProxyResult<&CheetahString> {
        if self.name_server_addrs.is_empty() {
            return Err(ProxyError::Internal(
                "name server address list is empty".to_string(),
            ));
        }
        let index = self.name_server_index.fetch_add(1, Ordering::Relaxed);
        Ok(&self.name_server_addrs[index % self.name_server_addrs.len()])
    }

    pub async fn get_topic_route_info_from_name_server(
        &self,
        topic: &CheetahString,
        timeout_millis: u64,
    ) -> ProxyResult<TopicRouteData> {
        let name_server_addr = self.select_name_server()?.clone();
        let request_header = GetRouteInfoRequestHeader {
            topic: topic.clone(),
        };
        let request =
            RemotingCommand::create_request_command(RequestCode::GetRouteInfoByTopic, request_header);
        let response = self
            .remoting_client
            .invoke(&name_server_addr, request, timeout_millis)
            .await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => {
                let body = response.body().ok_or_else(|| {
                    ProxyError::Internal("empty topic route response body".to_string())
                })?;
                Ok(serde_json::from_slice::<TopicRouteData>(body)?)
            }
            ResponseCode::TopicNotExist => Err(ProxyError::TopicNotFound(
                response
                    .remark()
                    .map(|remark| remark.to_string())
                    .unwrap_or_else(|| topic.to_string()),
            )),
            _ => Err(ProxyError::Internal(format!(
                "query topic route failed, code: {}, remark: {}",
                response.code(),
                response.remark_or_default()
            ))),
        }
    }

    pub async fn send_message(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        message: &Message,
        request_header: SendMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<SendResult> {
        let request = RemotingCommand::create_request_command(RequestCode::SendMessage, request_header)
            .set_body(message.body.clone());
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        self.process_send_response(broker_name, &response)
    }

    /// Batch variant. The list is serialized into one body and stamped with a
    /// synthesized unique client id before transmission.
    pub async fn send_batch_message(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        messages: Vec<Message>,
        mut request_header: SendMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<SendResult> {
        request_header.batch = Some(true);
        let mut batch = Message {
            topic: request_header.topic.clone(),
            flag: 0,
            properties: HashMap::new(),
            body: MessageDecoder::encode_messages(&messages),
            transaction_id: None,
        };
        MessageClientIDSetter::set_uniq_id(&mut batch);

        let request =
            RemotingCommand::create_request_command(RequestCode::SendBatchMessage, request_header)
                .set_body(batch.body.clone());
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        self.process_send_response(broker_name, &response)
    }

    fn process_send_response(
        &self,
        broker_name: &CheetahString,
        response: &RemotingCommand,
    ) -> ProxyResult<SendResult> {
        let send_status = match ResponseCode::from(response.code()) {
            ResponseCode::Success => SendStatus::SendOk,
            ResponseCode::FlushDiskTimeout => SendStatus::FlushDiskTimeout,
            ResponseCode::FlushSlaveTimeout => SendStatus::FlushSlaveTimeout,
            ResponseCode::SlaveNotAvailable => SendStatus::SlaveNotAvailable,
            _ => {
                return Err(ProxyError::BrokerTransient {
                    code: response.code(),
                    remark: response.remark_or_default(),
                })
            }
        };
        let response_header = response.decode_command_custom_header::<SendMessageResponseHeader>()?;
        let commit_log_offset =
            match MessageDecoder::decode_message_id(response_header.msg_id.as_str()) {
                Ok(message_id) => message_id.offset,
                Err(_) => {
                    warn!(
                        "cannot decode commit log offset from msgId {}",
                        response_header.msg_id
                    );
                    0
                }
            };
        Ok(SendResult {
            send_status,
            msg_id: response_header.msg_id,
            queue_id: response_header.queue_id,
            queue_offset: response_header.queue_offset,
            commit_log_offset,
            broker_name: broker_name.clone(),
            transaction_id: response_header.transaction_id,
        })
    }

    pub async fn send_message_back(
        &self,
        broker_addr: &CheetahString,
        request_header: ConsumerSendMsgBackRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<RemotingCommand> {
        let request =
            RemotingCommand::create_request_command(RequestCode::ConsumerSendMsgBack, request_header);
        self.remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await
    }

    pub async fn pop_message(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        request_header: PopMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<PopResult> {
        let topic = request_header.topic.clone();
        let is_order = request_header.order.unwrap_or_default();
        let request = RemotingCommand::create_request_command(RequestCode::PopMessage, request_header);
        let mut response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        Self::process_pop_response(broker_name, &mut response, &topic, is_order)
    }

    /// Turn a pop reply into messages annotated with their receipt handles
    /// (carried in the POP_CK property). Messages come back in pop order.
    fn process_pop_response(
        broker_name: &CheetahString,
        response: &mut RemotingCommand,
        topic: &CheetahString,
        is_order: bool,
    ) -> ProxyResult<PopResult> {
        let (pop_status, mut msg_found_list) = match ResponseCode::from(response.code()) {
            ResponseCode::Success => {
                let body = response.take_body().ok_or_else(|| {
                    ProxyError::Internal("pop FOUND response carries no body".to_string())
                })?;
                (PopStatus::Found, MessageDecoder::decodes_batch(&body)?)
            }
            ResponseCode::PollingFull => (PopStatus::PollingFull, vec![]),
            ResponseCode::PollingTimeout => (PopStatus::PollingNotFound, vec![]),
            ResponseCode::PullNotFound => (PopStatus::PollingNotFound, vec![]),
            _ => {
                return Err(ProxyError::BrokerTransient {
                    code: response.code(),
                    remark: response.remark_or_default(),
                })
            }
        };

        let response_header = response.decode_command_custom_header::<PopMessageResponseHeader>()?;
        let mut pop_result = PopResult {
            pop_status,
            msg_found_list: vec![],
            pop_time: response_header.pop_time,
            invisible_time: response_header.invisible_time,
            rest_num: response_header.rest_num,
        };
        if pop_result.pop_status != PopStatus::Found {
            return Ok(pop_result);
        }

        let start_offset_map = ExtraInfoUtil::parse_start_offset_info(
            response_header
                .start_offset_info
                .as_ref()
                .map_or("", |info| info.as_str()),
        )?;
        let msg_offset_map = ExtraInfoUtil::parse_msg_offset_info(
            response_header
                .msg_offset_info
                .as_ref()
                .map_or("", |info| info.as_str()),
        )?;
        let order_count_map = ExtraInfoUtil::parse_order_count_info(
            response_header
                .order_count_info
                .as_ref()
                .map_or("", |info| info.as_str()),
        )?;

        // arrival cursor per (topic, queueId), drives the msgOffsetInfo lookup
        let mut arrival_index: HashMap<String, usize> = HashMap::new();
        let mut shared_extra_info: HashMap<String, String> = HashMap::new();

        for message in msg_found_list.iter_mut() {
            if start_offset_map.is_empty() {
                // old brokers do not emit offset infos, one check point per queue
                let key = format!("{}{}", message.topic(), message.queue_id);
                let extra_info = shared_extra_info.entry(key).or_insert_with(|| {
                    ExtraInfoUtil::build_extra_info(
                        message.queue_offset,
                        response_header.pop_time as i64,
                        response_header.invisible_time as i64,
                        response_header.revive_qid,
                        message.topic().as_str(),
                        broker_name.as_str(),
                        message.queue_id,
                    )
                });
                let pop_ck = format!(
                    "{}{}{}",
                    extra_info,
                    MessageConst::KEY_SEPARATOR,
                    message.queue_offset
                );
                message.put_property(MessageConst::PROPERTY_POP_CK, pop_ck);
            } else if message.get_property(MessageConst::PROPERTY_POP_CK).is_none() {
                let queue_id_key = ExtraInfoUtil::get_start_offset_info_map_key(
                    message.topic().as_str(),
                    message.queue_id as i64,
                );
                let start_offset = *start_offset_map.get(&queue_id_key).ok_or_else(|| {
                    ProxyError::Internal(format!(
                        "pop response misses start offset for {queue_id_key}"
                    ))
                })?;
                let index_entry = arrival_index.entry(queue_id_key.clone()).or_insert(0);
                let msg_queue_offset = msg_offset_map
                    .get(&queue_id_key)
                    .and_then(|offsets| offsets.get(*index_entry))
                    .copied()
                    .unwrap_or(message.queue_offset);
                *index_entry += 1;
                if msg_queue_offset != message.queue_offset {
                    warn!(
                        "queue offset [{}] of msg is strange, not equal to the stored in msg, {}",
                        msg_queue_offset, message.msg_id
                    );
                }
                let pop_ck = ExtraInfoUtil::build_extra_info_with_msg_queue_offset(
                    start_offset,
                    response_header.pop_time as i64,
                    response_header.invisible_time as i64,
                    response_header.revive_qid,
                    message.topic().as_str(),
                    broker_name.as_str(),
                    message.queue_id,
                    msg_queue_offset,
                );
                message.put_property(MessageConst::PROPERTY_POP_CK, pop_ck);

                if is_order && !order_count_map.is_empty() {
                    let queue_offset_key = ExtraInfoUtil::get_queue_offset_map_key(
                        message.topic().as_str(),
                        message.queue_id as i64,
                        msg_queue_offset,
                    );
                    let count = order_count_map
                        .get(&queue_offset_key)
                        .or_else(|| order_count_map.get(&queue_id_key));
                    if let Some(count) = count {
                        if *count > 0 {
                            message.reconsume_times = *count;
                        }
                    }
                }
            }
            message.put_property(
                MessageConst::PROPERTY_FIRST_POP_TIME,
                response_header.pop_time.to_string(),
            );
            message.broker_name = broker_name.clone();
        }

        pop_result.msg_found_list = msg_found_list;
        Ok(pop_result)
    }

    pub async fn ack_message(
        &self,
        broker_addr: &CheetahString,
        request_header: AckMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<AckResult> {
        let request = RemotingCommand::create_request_command(RequestCode::AckMessage, request_header);
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => Ok(AckResult {
                status: AckStatus::Ok,
                ..Default::default()
            }),
            _ => Err(ProxyError::BrokerTransient {
                code: response.code(),
                remark: response.remark_or_default(),
            }),
        }
    }

    /// The broker re-reserves the message; the returned result carries the
    /// renewed receipt handle, the old one is invalid from here on.
    pub async fn change_invisible_time(
        &self,
        broker_addr: &CheetahString,
        broker_name: &CheetahString,
        request_header: ChangeInvisibleTimeRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<AckResult> {
        let topic = request_header.topic.clone();
        let queue_id = request_header.queue_id;
        let offset = request_header.offset;
        let request = RemotingCommand::create_request_command(
            RequestCode::ChangeMessageInvisibleTime,
            request_header,
        );
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => {
                let response_header =
                    response.decode_command_custom_header::<ChangeInvisibleTimeResponseHeader>()?;
                let extra_info = ExtraInfoUtil::build_extra_info_with_msg_queue_offset(
                    offset,
                    response_header.pop_time as i64,
                    response_header.invisible_time as i64,
                    response_header.revive_qid,
                    topic.as_str(),
                    broker_name.as_str(),
                    queue_id,
                    offset,
                );
                Ok(AckResult {
                    status: AckStatus::Ok,
                    extra_info: CheetahString::from_string(extra_info),
                    pop_time: response_header.pop_time as i64,
                })
            }
            _ => Err(ProxyError::BrokerTransient {
                code: response.code(),
                remark: response.remark_or_default(),
            }),
        }
    }

    pub async fn pull_message(
        &self,
        broker_addr: &CheetahString,
        request_header: PullMessageRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<PullResult> {
        let request = RemotingCommand::create_request_command(RequestCode::PullMessage, request_header);
        let mut response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        let pull_status = match ResponseCode::from(response.code()) {
            ResponseCode::Success => PullStatus::Found,
            ResponseCode::PullNotFound => PullStatus::NoNewMsg,
            ResponseCode::PullRetryImmediately => PullStatus::NoMatchedMsg,
            ResponseCode::PullOffsetMoved => PullStatus::OffsetIllegal,
            _ => {
                return Err(ProxyError::BrokerTransient {
                    code: response.code(),
                    remark: response.remark_or_default(),
                })
            }
        };
        let response_header = response.decode_command_custom_header::<PullMessageResponseHeader>()?;
        let msg_found_list = if pull_status == PullStatus::Found {
            match response.take_body() {
                Some(body) => MessageDecoder::decodes_batch(&body)?,
                None => vec![],
            }
        } else {
            vec![]
        };
        Ok(PullResult {
            pull_status,
            next_begin_offset: response_header.next_begin_offset,
            min_offset: response_header.min_offset,
            max_offset: response_header.max_offset,
            msg_found_list,
        })
    }

    pub async fn send_heartbeat(
        &self,
        broker_addr: &CheetahString,
        heartbeat_data: &HeartbeatData,
        timeout_millis: u64,
    ) -> ProxyResult<i32> {
        let request = RemotingCommand::create_remoting_command(RequestCode::HeartBeat)
            .set_body(heartbeat_data.encode());
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => Ok(response.version()),
            _ => Err(ProxyError::BrokerTransient {
                code: response.code(),
                remark: response.remark_or_default(),
            }),
        }
    }

    pub async fn end_transaction_oneway(
        &self,
        broker_addr: &CheetahString,
        request_header: EndTransactionRequestHeader,
        remark: impl Into<CheetahString>,
        timeout_millis: u64,
    ) -> ProxyResult<()> {
        let request =
            RemotingCommand::create_request_command(RequestCode::EndTransaction, request_header)
                .set_remark(remark);
        self.remoting_client
            .invoke_oneway(broker_addr, request, timeout_millis)
            .await
    }

    pub async fn get_consumer_list_by_group(
        &self,
        broker_addr: &CheetahString,
        consumer_group: &CheetahString,
        timeout_millis: u64,
    ) -> ProxyResult<Vec<CheetahString>> {
        let request_header = GetConsumerListByGroupRequestHeader {
            consumer_group: consumer_group.clone(),
        };
        let request = RemotingCommand::create_request_command(
            RequestCode::GetConsumerListByGroup,
            request_header,
        );
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => match response.body() {
                Some(body) => {
                    let body: GetConsumerListByGroupResponseBody = serde_json::from_slice(body)?;
                    Ok(body.consumer_id_list)
                }
                None => Ok(vec![]),
            },
            // the broker answers SYSTEM_ERROR when the group has no consumer
            ResponseCode::SystemError => Ok(vec![]),
            _ => Err(ProxyError::BrokerTransient {
                code: response.code(),
                remark: response.remark_or_default(),
            }),
        }
    }

    pub async fn get_max_offset(
        &self,
        broker_addr: &CheetahString,
        topic: &CheetahString,
        queue_id: i32,
        timeout_millis: u64,
    ) -> ProxyResult<i64> {
        let request_header = GetMaxOffsetRequestHeader {
            topic: topic.clone(),
            queue_id,
        };
        let request =
            RemotingCommand::create_request_command(RequestCode::GetMaxOffset, request_header);
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => {
                let response_header =
                    response.decode_command_custom_header::<GetMaxOffsetResponseHeader>()?;
                Ok(response_header.offset)
            }
            _ => Err(ProxyError::BrokerTransient {
                code: response.code(),
                remark: response.remark_or_default(),
            }),
        }
    }

    pub async fn search_offset(
        &self,
        broker_addr: &CheetahString,
        topic: &CheetahString,
        queue_id: i32,
        timestamp: i64,
        timeout_millis: u64,
    ) -> ProxyResult<i64> {
        let request_header = SearchOffsetRequestHeader {
            topic: topic.clone(),
            queue_id,
            timestamp,
        };
        let request = RemotingCommand::create_request_command(
            RequestCode::SearchOffsetByTimestamp,
            request_header,
        );
        let response = self
            .remoting_client
            .invoke(broker_addr, request, timeout_millis)
            .await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => {
                let response_header =
                    response.decode_command_custom_header::<SearchOffsetResponseHeader>()?;
                Ok(response_header.offset)
            }
            _ => Err(ProxyError::BrokerTransient {
                code: response.code(),
                remark: response.remark_or_default(),
            }),
        }
    }

    pub async fn update_consumer_offset_oneway(
        &self,
        broker_addr: &CheetahString,
        request_header: UpdateConsumerOffsetRequestHeader,
        timeout_millis: u64,
    ) -> ProxyResult<()> {
        let request = RemotingCommand::create_request_command(
            RequestCode::UpdateConsumerOffset,
            request_header,
        );
        self.remoting_client
            .invoke_oneway(broker_addr, request, timeout_millis)
            .await
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::common::message::message_ext::MessageExt;
    use crate::common::receipt_handle::ReceiptHandle;
    use crate::remoting::command_custom_header::CommandCustomHeader;

    struct StaticClient {
        response: parking_lot::Mutex<Option<RemotingCommand>>,
    }

    #[tonic::async_trait]
    impl RemotingClient for StaticClient {
        async fn invoke(
            &self,
            _addr: &CheetahString,
            _request: RemotingCommand,
            _timeout_millis: u64,
        ) -> ProxyResult<RemotingCommand> {
            Ok(self.response.lock().take().expect("response consumed"))
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

    fn api_with_response(response: RemotingCommand) -> MQClientAPI {
        MQClientAPI::new(
            Arc::new(StaticClient {
                response: parking_lot::Mutex::new(Some(response)),
            }),
            vec![CheetahString::from("127.0.0.1:9876")],
        )
    }

    fn pop_found_response(message: MessageExt, pop_time: u64) -> RemotingCommand {
        let start_offset_header = PopMessageResponseHeader {
            pop_time,
            invisible_time: 60_000,
            revive_qid: 0,
            rest_num: 0,
            start_offset_info: Some(CheetahString::from_string(format!(
                "0 {} {}",
                message.queue_id, message.queue_offset
            ))),
            msg_offset_info: Some(CheetahString::from_string(format!(
                "0 {} {}",
                message.queue_id, message.queue_offset
            ))),
            order_count_info: None,
        };
        RemotingCommand::create_response_command_with_code(ResponseCode::Success)
            .set_ext_fields(start_offset_header.to_map())
            .set_body(MessageDecoder::encode(&message))
    }

    fn sample_message() -> MessageExt {
        MessageExt {
            message: Message::new("t", Bytes::from_static(b"x")),
            queue_id: 3,
            queue_offset: 42,
            store_host: CheetahString::from("127.0.0.1:10911"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn pop_found_synthesizes_receipt_handle() {
        let api = api_with_response(pop_found_response(sample_message(), 1700000000000));
        let header = PopMessageRequestHeader {
            consumer_group: CheetahString::from("g"),
            topic: CheetahString::from("t"),
            ..Default::default()
        };
        let result = api
            .pop_message(
                &CheetahString::from("127.0.0.1:10911"),
                &CheetahString::from("b"),
                header,
                1000,
            )
            .await
            .unwrap();

        assert_eq!(result.pop_status, PopStatus::Found);
        assert_eq!(result.msg_found_list.len(), 1);
        let message = &result.msg_found_list[0];
        let handle = ReceiptHandle::from_message_ext(message).unwrap();
        assert_eq!(handle.broker_name().as_str(), "b");
        assert_eq!(handle.queue_id(), 3);
        assert_eq!(handle.offset(), 42);
        assert_eq!(handle.retrieve_time(), 1700000000000);
        assert_eq!(message.broker_name.as_str(), "b");
    }

    #[tokio::test]
    async fn pop_polling_full_maps_to_status() {
        let response_header = PopMessageResponseHeader {
            pop_time: 1,
            invisible_time: 1,
            revive_qid: 0,
            ..Default::default()
        };
        let response = RemotingCommand::create_response_command_with_code(ResponseCode::PollingFull)
            .set_ext_fields(response_header.to_map());
        let api = api_with_response(response);
        let result = api
            .pop_message(
                &CheetahString::from("127.0.0.1:10911"),
                &CheetahString::from("b"),
                PopMessageRequestHeader::default(),
                1000,
            )
            .await
            .unwrap();
        assert_eq!(result.pop_status, PopStatus::PollingFull);
        assert!(result.msg_found_list.is_empty());
    }

    #[tokio::test]
    async fn send_transient_code_is_reported_in_status() {
        let response_header = SendMessageResponseHeader {
            msg_id: CheetahString::from("id"),
            queue_id: 1,
            queue_offset: 9,
            transaction_id: None,
        };
        let response =
            RemotingCommand::create_response_command_with_code(ResponseCode::FlushDiskTimeout)
                .set_ext_fields(response_header.to_map());
        let api = api_with_response(response);
        let result = api
            .send_message(
                &CheetahString::from("127.0.0.1:10911"),
                &CheetahString::from("b"),
                &Message::new("t", Bytes::new()),
                SendMessageRequestHeader::default(),
                1000,
            )
            .await
            .unwrap();
        assert_eq!(result.send_status, SendStatus::FlushDiskTimeout);
        assert_eq!(result.queue_offset, 9);
        // an undecodable message id cannot yield a commit log offset
        assert_eq!(result.commit_log_offset, 0);
    }

    #[tokio::test]
    async fn send_ok_recovers_commit_log_offset_from_msg_id() {
        let msg_id =
            MessageDecoder::create_message_id(&CheetahString::from("127.0.0.1:10911"), 2048);
        let response_header = SendMessageResponseHeader {
            msg_id: msg_id.clone(),
            queue_id: 1,
            queue_offset: 9,
            transaction_id: None,
        };
        let response = RemotingCommand::create_response_command_with_code(ResponseCode::Success)
            .set_ext_fields(response_header.to_map());
        let api = api_with_response(response);
        let result = api
            .send_message(
                &CheetahString::from("127.0.0.1:10911"),
                &CheetahString::from("b"),
                &Message::new("t", Bytes::new()),
                SendMessageRequestHeader::default(),
                1000,
            )
            .await
            .unwrap();
        assert_eq!(result.send_status, SendStatus::SendOk);
        assert_eq!(result.msg_id, msg_id);
        assert_eq!(result.commit_log_offset, 2048);
    }

    #[tokio::test]
    async fn consumer_list_system_error_means_empty() {
        let response = RemotingCommand::create_response_command_with_code(ResponseCode::SystemError);
        let api = api_with_response(response);
        let list = api
            .get_consumer_list_by_group(
                &CheetahString::from("127.0.0.1:10911"),
                &CheetahString::from("g"),
                1000,
            )
            .await
            .unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn topic_not_exist_becomes_topic_not_found() {
        let response = RemotingCommand::create_response_command_with_code(ResponseCode::TopicNotExist)
            .set_remark("No topic route info in name server for the topic: notExistTopic");
        let api = api_with_response(response);
        let result = api
            .get_topic_route_info_from_name_server(&CheetahString::from("notExistTopic"), 1000)
            .await;
        match result {
            Err(ProxyError::TopicNotFound(remark)) => {
                assert!(remark.contains("notExistTopic"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
