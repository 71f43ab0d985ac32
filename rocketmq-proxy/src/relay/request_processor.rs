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
use tracing::warn;

use crate::common::message::message_decoder::MessageDecoder;
use crate::common::message::MessageConst;
use crate::relay::channel_manager::ChannelManager;
use crate::relay::ProxyRelayResult;
use crate::relay::RelayCommand;
use crate::relay::RelayReply;
use crate::remoting::client::RemotingRequestProcessor;
use crate::remoting::code::RequestCode;
use crate::remoting::code::ResponseCode;
use crate::remoting::header::check_transaction_state_request_header::CheckTransactionStateRequestHeader;
use crate::remoting::header::consume_message_directly_result_request_header::ConsumeMessageDirectlyResultRequestHeader;
use crate::remoting::header::get_consumer_running_info_request_header::GetConsumerRunningInfoRequestHeader;
use crate::remoting::RemotingCommand;

/// Translates broker back-requests arriving on forward connections into
/// relay-channel traffic, and relay replies back into remoting responses.
pub struct ProxyRelayRequestProcessor {
    channel_manager: Arc<ChannelManager>,
}

impl ProxyRelayRequestProcessor {
    pub fn new(channel_manager: Arc<ChannelManager>) -> Self {
        ProxyRelayRequestProcessor { channel_manager }
    }

    fn process_check_transaction_state(
        &self,
        request: &RemotingCommand,
    ) -> Option<RemotingCommand> {
        let header =
            match request.decode_command_custom_header::<CheckTransactionStateRequestHeader>() {
                Ok(header) => header,
                Err(e) => {
                    error!("decode check transaction state header failed: {}", e);
                    return None;
                }
            };
        let Some(body) = request.body() else {
            warn!("check transaction state request carries no half message");
            return None;
        };
        let mut body = body.clone();
        let message = match MessageDecoder::decode(&mut body) {
            Ok(message) => message,
            Err(e) => {
                error!("decode half message failed: {}", e);
                return None;
            }
        };
        let Some(group) = message
            .get_property(MessageConst::PROPERTY_PRODUCER_GROUP)
            .cloned()
        else {
            warn!("half message {} has no producer group", message.msg_id);
            return None;
        };
        let broker_transaction_id = header
            .transaction_id
            .clone()
            .or(header.msg_id.clone())
            .unwrap_or_else(|| message.msg_id.clone());
        let transaction_id = crate::connector::transaction::TransactionId::gen(
            header.broker_name.clone().unwrap_or_default(),
            broker_transaction_id,
            header.tran_state_table_offset,
            header.commit_log_offset,
        );
        if let Err(e) = self.channel_manager.relay_transaction_check(
            &group,
            message,
            CheetahString::from_string(transaction_id.proxy_transaction_id()),
        ) {
            error!("relay transaction check for group {} failed: {}", group, e);
        }
        // the broker expects no reply; resolution returns via EndTransaction
        None
    }

    async fn process_get_consumer_running_info(
        &self,
        request: &RemotingCommand,
    ) -> Option<RemotingCommand> {
        let header =
            match request.decode_command_custom_header::<GetConsumerRunningInfoRequestHeader>() {
                Ok(header) => header,
                Err(e) => {
                    error!("decode get consumer running info header failed: {}", e);
                    return Some(error_response(request, "malformed header"));
                }
            };
        let receiver = match self.channel_manager.relay_with_reply(
            &header.consumer_group,
            &header.client_id,
            |nonce| RelayCommand::PrintThreadStackTrace { nonce },
        ) {
            Ok(receiver) => receiver,
            Err(e) => return Some(error_response(request, &e.to_string())),
        };
        match receiver.await {
            Ok(result) => Some(running_info_response(request, result)),
            Err(_) => Some(error_response(request, "relay reply dropped")),
        }
    }

    async fn process_consume_message_directly(
        &self,
        request: &RemotingCommand,
    ) -> Option<RemotingCommand> {
        let header = match request
            .decode_command_custom_header::<ConsumeMessageDirectlyResultRequestHeader>()
        {
            Ok(header) => header,
            Err(e) => {
                error!("decode consume message directly header failed: {}", e);
                return Some(error_response(request, "malformed header"));
            }
        };
        let message = match request.body() {
            Some(body) => {
                let mut body = body.clone();
                match MessageDecoder::decode(&mut body) {
                    Ok(message) => message,
                    Err(e) => return Some(error_response(request, &e.to_string())),
                }
            }
            None => return Some(error_response(request, "missing message body")),
        };
        let receiver = match self.channel_manager.relay_with_reply(
            &header.consumer_group,
            &header.client_id,
            |nonce| RelayCommand::VerifyMessageConsumption { nonce, message },
        ) {
            Ok(receiver) => receiver,
            Err(e) => return Some(error_response(request, &e.to_string())),
        };
        match receiver.await {
            Ok(result) => Some(consume_directly_response(request, result)),
            Err(_) => Some(error_response(request, "relay reply dropped")),
        }
    }
}

fn error_response(request: &RemotingCommand, remark: &str) -> RemotingCommand {
    RemotingCommand::create_response_command_with_code(ResponseCode::SystemError)
        .set_opaque(request.opaque())
        .set_remark(remark.to_string())
}

fn running_info_response(request: &RemotingCommand, result: ProxyRelayResult) -> RemotingCommand {
    let mut response = RemotingCommand::create_response_command_with_code(result.code)
        .set_opaque(request.opaque());
    if !result.remark.is_empty() {
        response = response.set_remark(result.remark);
    }
    if let Some(RelayReply::ConsumerRunningInfo(info)) = result.result {
        response = response.set_body(info.encode());
    }
    response
}

fn consume_directly_response(
    request: &RemotingCommand,
    result: ProxyRelayResult,
) -> RemotingCommand {
    let mut response = RemotingCommand::create_response_command_with_code(result.code)
        .set_opaque(request.opaque());
    if !result.remark.is_empty() {
        response = response.set_remark(result.remark);
    }
    if let Some(RelayReply::ConsumeMessageDirectlyResult(consume_result)) = result.result {
        response = response.set_body(consume_result.encode());
    }
    response
}

#[tonic::async_trait]
impl RemotingRequestProcessor for ProxyRelayRequestProcessor {
    async fn process_request(
        &self,
        _broker_addr: &CheetahString,
        request: RemotingCommand,
    ) -> Option<RemotingCommand> {
        match RequestCode::from(request.code()) {
            RequestCode::CheckTransactionState => self.process_check_transaction_state(&request),
            RequestCode::GetConsumerRunningInfo => {
                self.process_get_consumer_running_info(&request).await
            }
            RequestCode::ConsumeMessageDirectly => {
                self.process_consume_message_directly(&request).await
            }
            _ => {
                warn!("unexpected broker-initiated request code {}", request.code());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::common::message::message_ext::MessageExt;
    use crate::common::message::Message;
    use crate::config::ProxyConfig;
    use crate::remoting::body::ConsumerRunningInfo;

    fn half_message(producer_group: &str) -> MessageExt {
        let mut message = Message::new("t", Bytes::from_static(b"x"));
        message.put_property(MessageConst::PROPERTY_PRODUCER_GROUP, producer_group);
        MessageExt {
            message,
            queue_offset: 7,
            commit_log_offset: 1024,
            store_host: CheetahString::from("127.0.0.1:10911"),
            ..Default::default()
        }
    }

    fn manager() -> Arc<ChannelManager> {
        Arc::new(ChannelManager::new(Arc::new(ProxyConfig::default())))
    }

    #[tokio::test]
    async fn check_transaction_state_is_relayed_to_producer_client() {
        let channel_manager = manager();
        let group = CheetahString::from("pg");
        let mut mailbox =
            channel_manager.create_channel(&group, &CheetahString::from("client-1"));
        let processor = ProxyRelayRequestProcessor::new(channel_manager);

        let header = CheckTransactionStateRequestHeader {
            tran_state_table_offset: 7,
            commit_log_offset: 1024,
            transaction_id: Some(CheetahString::from("tx-1")),
            broker_name: Some(CheetahString::from("broker-a")),
            ..Default::default()
        };
        let request = RemotingCommand::create_request_command(
            RequestCode::CheckTransactionState,
            header,
        )
        .set_body(MessageDecoder::encode(&half_message("pg")));

        let response = processor
            .process_request(&CheetahString::from("127.0.0.1:10911"), request)
            .await;
        assert!(response.is_none(), "transaction check expects no reply");

        match mailbox.recv().await.unwrap() {
            RelayCommand::RecoverOrphanedTransaction {
                transaction_id, ..
            } => {
                let decoded =
                    crate::connector::transaction::TransactionId::decode(transaction_id.as_str())
                        .unwrap();
                assert_eq!(decoded.broker_name().as_str(), "broker-a");
                assert_eq!(decoded.commit_log_offset(), 1024);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn consumer_running_info_round_trips_through_nonce() {
        let channel_manager = manager();
        let group = CheetahString::from("cg");
        let client_id = CheetahString::from("client-1");
        let mut mailbox = channel_manager.create_channel(&group, &client_id);
        let processor = ProxyRelayRequestProcessor::new(channel_manager.clone());

        let header = GetConsumerRunningInfoRequestHeader {
            consumer_group: group.clone(),
            client_id: client_id.clone(),
            jstack_enable: true,
        };
        let request = RemotingCommand::create_request_command(
            RequestCode::GetConsumerRunningInfo,
            header,
        );
        let opaque = request.opaque();

        let broker_addr = CheetahString::from("127.0.0.1:10911");
        let respond = tokio::spawn(async move {
            let nonce = match mailbox.recv().await.unwrap() {
                RelayCommand::PrintThreadStackTrace { nonce } => nonce,
                other => panic!("unexpected command {other:?}"),
            };
            channel_manager.complete_response(
                &nonce,
                ProxyRelayResult::ok(RelayReply::ConsumerRunningInfo(
                    ConsumerRunningInfo::with_jstack("main: RUNNABLE"),
                )),
            );
        });

        let response = processor
            .process_request(&broker_addr, request)
            .await
            .expect("response expected");
        respond.await.unwrap();

        assert_eq!(response.code(), ResponseCode::Success.to_i32());
        assert_eq!(response.opaque(), opaque);
        assert!(response.is_response_type());
        let info: ConsumerRunningInfo =
            serde_json::from_slice(response.body().unwrap()).unwrap();
        assert_eq!(info.jstack.as_str(), "main: RUNNABLE");
    }

    #[tokio::test]
    async fn unknown_client_yields_error_response() {
        let processor = ProxyRelayRequestProcessor::new(manager());
        let header = GetConsumerRunningInfoRequestHeader {
            consumer_group: CheetahString::from("cg"),
            client_id: CheetahString::from("nobody"),
            jstack_enable: false,
        };
        let request = RemotingCommand::create_request_command(
            RequestCode::GetConsumerRunningInfo,
            header,
        );
        let response = processor
            .process_request(&CheetahString::from("127.0.0.1:10911"), request)
            .await
            .expect("error response expected");
        assert_eq!(response.code(), ResponseCode::SystemError.to_i32());
    }
}
