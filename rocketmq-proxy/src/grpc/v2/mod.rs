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

pub mod converter;

use std::pin::Pin;
use std::sync::Arc;

use cheetah_string::CheetahString;
use futures::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tonic::Request;
use tonic::Response;
use tonic::Status;
use tracing::info;
use tracing::warn;

use crate::common::retry_policy::ExponentialRetryPolicy;
use crate::common::retry_policy::RetryPolicy;
use crate::config::ProxyConfig;
use crate::config::ProxyMode;
use crate::connector::results::AckStatus;
use crate::connector::results::PopStatus;
use crate::connector::results::PullStatus;
use crate::connector::results::SendStatus;
use crate::connector::route::AssignmentQueueSelector;
use crate::connector::route::TopicRouteCache;
use crate::connector::transaction::TransactionHeartbeatRegisterService;
use crate::error::ProxyError;
use crate::grpc::client_settings_manager::ClientSettingsManager;
use crate::grpc::common::duration_to_millis;
use crate::grpc::common::timestamp_to_millis;
use crate::grpc::common::EndpointConverter;
use crate::grpc::common::IdentityEndpointConverter;
use crate::grpc::common::ResponseHook;
use crate::grpc::common::StatusCode;
use crate::grpc::context::ProxyContext;
use crate::grpc::proto::v2 as pb;
use crate::grpc::proto::v2::messaging_service_server::MessagingService;
use crate::grpc::v2::converter::broker_code_status;
use crate::grpc::v2::converter::build_broker_map;
use crate::grpc::v2::converter::build_message;
use crate::grpc::v2::converter::build_send_message;
use crate::grpc::v2::converter::build_status;
use crate::grpc::v2::converter::error_status;
use crate::grpc::v2::converter::gen_message_queues_from_queue_data;
use crate::grpc::v2::converter::ok_status;
use crate::grpc::v2::converter::resource_name;
use crate::processor::ConsumerProcessor;
use crate::processor::NackResult;
use crate::processor::ProducerProcessor;
use crate::processor::QueryOffsetPolicy;
use crate::processor::TransactionResolution;
use crate::relay::channel_manager::ChannelManager;
use crate::relay::ProxyRelayResult;
use crate::relay::RelayCommand;
use crate::relay::RelayReply;
use crate::remoting::body::ConsumeMessageDirectlyResult;
use crate::remoting::body::ConsumerRunningInfo;
use crate::remoting::header::pop_message_request_header::INIT_MODE_MAX;
use crate::remoting::heartbeat::SubscriptionData;

type ReceiveMessageHook = dyn ResponseHook<pb::ReceiveMessageRequest, pb::ReceiveMessageResponse>;
type SendMessageHook = dyn ResponseHook<pb::SendMessageRequest, pb::SendMessageResponse>;

/// The v2 revision: batched ack, explicit change-invisible-duration and
/// DLQ-forward instead of nack, settings advertised on heartbeat.
pub struct MessagingActivityV2 {
    config: Arc<ProxyConfig>,
    mode: ProxyMode,
    producer_processor: Arc<ProducerProcessor>,
    consumer_processor: Arc<ConsumerProcessor>,
    topic_route_cache: Arc<TopicRouteCache>,
    assignment_selector: Arc<dyn AssignmentQueueSelector>,
    transaction_heartbeat: Arc<TransactionHeartbeatRegisterService>,
    channel_manager: Arc<ChannelManager>,
    client_settings_manager: Arc<ClientSettingsManager>,
    retry_policy: ExponentialRetryPolicy,
    endpoint_converter: Arc<dyn EndpointConverter<pb::Endpoints>>,
    receive_message_hook: Option<Arc<ReceiveMessageHook>>,
    send_message_hook: Option<Arc<SendMessageHook>>,
}

impl MessagingActivityV2 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<ProxyConfig>,
        producer_processor: Arc<ProducerProcessor>,
        consumer_processor: Arc<ConsumerProcessor>,
        topic_route_cache: Arc<TopicRouteCache>,
        assignment_selector: Arc<dyn AssignmentQueueSelector>,
        transaction_heartbeat: Arc<TransactionHeartbeatRegisterService>,
        channel_manager: Arc<ChannelManager>,
        client_settings_manager: Arc<ClientSettingsManager>,
    ) -> Self {
        let retry_policy = ExponentialRetryPolicy::from_config(&config);
        MessagingActivityV2 {
            mode: config.proxy_mode,
            config,
            producer_processor,
            consumer_processor,
            topic_route_cache,
            assignment_selector,
            transaction_heartbeat,
            channel_manager,
            client_settings_manager,
            retry_policy,
            endpoint_converter: Arc::new(IdentityEndpointConverter),
            receive_message_hook: None,
            send_message_hook: None,
        }
    }

    pub fn set_endpoint_converter(
        &mut self,
        endpoint_converter: Arc<dyn EndpointConverter<pb::Endpoints>>,
    ) {
        self.endpoint_converter = endpoint_converter;
    }

    pub fn set_receive_message_hook(&mut self, hook: Arc<ReceiveMessageHook>) {
        self.receive_message_hook = Some(hook);
    }

    pub fn set_send_message_hook(&mut self, hook: Arc<SendMessageHook>) {
        self.send_message_hook = Some(hook);
    }

    fn checked_endpoints(
        &self,
        endpoints: Option<pb::Endpoints>,
    ) -> Result<pb::Endpoints, pb::Status> {
        let converted = self.endpoint_converter.convert(endpoints);
        match converted {
            Some(endpoints) if endpoints != pb::Endpoints::default() => Ok(endpoints),
            other => Err(build_status(
                StatusCode::InvalidArgument,
                format!("endpoint {other:?} is invalidate"),
            )),
        }
    }

    fn local_mode_unimplemented(&self) -> Option<pb::Status> {
        if self.mode.is_local() {
            Some(build_status(
                StatusCode::Unimplemented,
                "not implemented in LOCAL mode",
            ))
        } else {
            None
        }
    }

    async fn receive_message_inner(
        &self,
        context: &ProxyContext,
        request: &pb::ReceiveMessageRequest,
    ) -> Result<pb::ReceiveMessageResponse, ProxyError> {
        let message_queue = request
            .message_queue
            .as_ref()
            .ok_or_else(|| ProxyError::ClientInput("message queue is required".to_string()))?;
        let topic = resource_name(message_queue.topic.as_ref());
        let group = resource_name(request.group.as_ref());
        let subscription = build_subscription(&topic, request.filter_expression.as_ref())?;
        let fifo = self.client_settings_manager.is_fifo(&context.client_id);

        let invisible_millis = request
            .invisible_duration
            .as_ref()
            .map(duration_to_millis)
            .unwrap_or(60_000);
        let poll_millis = request
            .long_polling_timeout
            .as_ref()
            .map(duration_to_millis)
            .unwrap_or(20_000);
        let batch_size = if request.batch_size > 0 {
            request.batch_size as u32
        } else {
            32
        };

        let result = self
            .consumer_processor
            .pop_message(
                &group,
                &topic,
                batch_size,
                invisible_millis,
                poll_millis,
                INIT_MODE_MAX,
                &subscription,
                fifo,
                context.remaining_millis(),
            )
            .await?;

        let response = match result.pop_status {
            PopStatus::Found => pb::ReceiveMessageResponse {
                status: Some(ok_status()),
                messages: result.msg_found_list.iter().map(build_message).collect(),
                delivery_timestamp: Some(crate::grpc::common::millis_to_timestamp(
                    result.pop_time as i64,
                )),
            },
            PopStatus::PollingFull => pb::ReceiveMessageResponse {
                status: Some(build_status(StatusCode::TooManyRequests, "polling full")),
                ..Default::default()
            },
            PopStatus::NoNewMsg | PopStatus::PollingNotFound => pb::ReceiveMessageResponse {
                status: Some(build_status(StatusCode::Ok, "no new message")),
                ..Default::default()
            },
        };
        Ok(response)
    }

    async fn ack_one(
        &self,
        group: &CheetahString,
        topic: &CheetahString,
        entry: &pb::AckMessageEntry,
    ) -> pb::AckMessageResultEntry {
        let result = self
            .consumer_processor
            .ack_message(
                group,
                topic,
                &entry.receipt_handle,
                self.consumer_processor.default_timeout(),
            )
            .await;
        let status = match result {
            Ok(ack_result) if ack_result.status == AckStatus::Ok => ok_status(),
            Ok(_) => build_status(
                StatusCode::InternalServerError,
                "ack failed: status is abnormal",
            ),
            Err(error) => error_status(&error),
        };
        pb::AckMessageResultEntry {
            message_id: entry.message_id.clone(),
            receipt_handle: entry.receipt_handle.clone(),
            status: Some(status),
        }
    }
}

#[tonic::async_trait]
impl MessagingService for MessagingActivityV2 {
    async fn query_route(
        &self,
        request: Request<pb::QueryRouteRequest>,
    ) -> Result<Response<pb::QueryRouteResponse>, Status> {
        let request = request.into_inner();
        let topic = resource_name(request.topic.as_ref());
        let wrapper = match self.topic_route_cache.get_message_queue(&topic).await {
            Ok(wrapper) => wrapper,
            Err(error) => {
                return Ok(Response::new(pb::QueryRouteResponse {
                    status: Some(error_status(&error)),
                    message_queues: vec![],
                }))
            }
        };
        let route = wrapper.topic_route_data();

        let mut message_queues = Vec::new();
        if self.mode.is_cluster() {
            let endpoints = match self.checked_endpoints(request.endpoints.clone()) {
                Ok(endpoints) => endpoints,
                Err(status) => {
                    return Ok(Response::new(pb::QueryRouteResponse {
                        status: Some(status),
                        message_queues: vec![],
                    }))
                }
            };
            for queue_data in &route.queue_datas {
                let broker = pb::Broker {
                    name: queue_data.broker_name.to_string(),
                    id: 0,
                    endpoints: Some(endpoints.clone()),
                };
                message_queues.extend(gen_message_queues_from_queue_data(
                    queue_data,
                    request.topic.clone(),
                    broker,
                ));
            }
        } else {
            let broker_map = build_broker_map(route, self.config.grpc_server_port);
            for queue_data in &route.queue_datas {
                let Some(broker_id_map) = broker_map.get(&queue_data.broker_name) else {
                    break;
                };
                for broker in broker_id_map.values() {
                    message_queues.extend(gen_message_queues_from_queue_data(
                        queue_data,
                        request.topic.clone(),
                        broker.clone(),
                    ));
                }
            }
        }

        Ok(Response::new(pb::QueryRouteResponse {
            status: Some(ok_status()),
            message_queues,
        }))
    }

    async fn query_assignment(
        &self,
        request: Request<pb::QueryAssignmentRequest>,
    ) -> Result<Response<pb::QueryAssignmentResponse>, Status> {
        let request = request.into_inner();
        let topic = resource_name(request.topic.as_ref());
        let wrapper = match self.topic_route_cache.get_message_queue(&topic).await {
            Ok(wrapper) => wrapper,
            Err(error) => {
                return Ok(Response::new(pb::QueryAssignmentResponse {
                    status: Some(error_status(&error)),
                    assignments: vec![],
                }))
            }
        };
        let queues = self.assignment_selector.get_assignment(&wrapper);

        let mut assignments = Vec::new();
        if self.mode.is_cluster() {
            let endpoints = match self.checked_endpoints(request.endpoints.clone()) {
                Ok(endpoints) => endpoints,
                Err(status) => {
                    return Ok(Response::new(pb::QueryAssignmentResponse {
                        status: Some(status),
                        assignments: vec![],
                    }))
                }
            };
            for queue in queues {
                assignments.push(pb::Assignment {
                    message_queue: Some(pb::MessageQueue {
                        topic: request.topic.clone(),
                        id: -1,
                        permission: pb::Permission::ReadWrite as i32,
                        broker: Some(pb::Broker {
                            name: queue.broker_name.to_string(),
                            id: 0,
                            endpoints: Some(endpoints.clone()),
                        }),
                        accept_message_types: vec![],
                    }),
                });
            }
        } else {
            let broker_map =
                build_broker_map(wrapper.topic_route_data(), self.config.grpc_server_port);
            for queue in queues {
                let Some(broker) = broker_map
                    .get(&queue.broker_name)
                    .and_then(|broker_id_map| broker_id_map.get(&0))
                else {
                    continue;
                };
                assignments.push(pb::Assignment {
                    message_queue: Some(pb::MessageQueue {
                        topic: request.topic.clone(),
                        id: -1,
                        permission: pb::Permission::ReadWrite as i32,
                        broker: Some(broker.clone()),
                        accept_message_types: vec![],
                    }),
                });
            }
        }

        Ok(Response::new(pb::QueryAssignmentResponse {
            status: Some(ok_status()),
            assignments,
        }))
    }

    async fn send_message(
        &self,
        request: Request<pb::SendMessageRequest>,
    ) -> Result<Response<pb::SendMessageResponse>, Status> {
        let context = ProxyContext::from_request(&request);
        let request = request.into_inner();
        let result = async {
            if request.messages.is_empty() {
                return Err(ProxyError::ClientInput("empty message list".to_string()));
            }
            let mut topic = CheetahString::new();
            let mut messages = Vec::with_capacity(request.messages.len());
            for proto_message in request.messages.clone() {
                let (message_topic, canonical) = build_send_message(proto_message)?;
                if topic.is_empty() {
                    topic = message_topic;
                } else if topic != message_topic {
                    return Err(ProxyError::ClientInput(
                        "messages of one batch must share a topic".to_string(),
                    ));
                }
                messages.push(canonical);
            }
            // v2 clients do not repeat the producer group per message; the
            // client id scopes the write selector instead
            let producer_group = if context.client_id.is_empty() {
                CheetahString::from_static_str("DEFAULT_PRODUCER")
            } else {
                context.client_id.clone()
            };
            self.producer_processor
                .send_message(
                    &producer_group,
                    &topic,
                    messages,
                    self.producer_processor.default_timeout(),
                )
                .await
        }
        .await;

        let (response, error) = match result {
            Ok(send_result) => {
                let status = if send_result.send_status == SendStatus::SendOk {
                    ok_status()
                } else {
                    build_status(
                        StatusCode::InternalServerError,
                        format!("{:?}", send_result.send_status),
                    )
                };
                let entry = pb::SendResultEntry {
                    status: Some(status.clone()),
                    message_id: send_result.msg_id.to_string(),
                    transaction_id: send_result
                        .transaction_id
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    offset: send_result.queue_offset,
                };
                (
                    pb::SendMessageResponse {
                        status: Some(status),
                        entries: vec![entry],
                    },
                    None,
                )
            }
            Err(error) => (
                pb::SendMessageResponse {
                    status: Some(error_status(&error)),
                    entries: vec![],
                },
                Some(error),
            ),
        };
        if let Some(hook) = &self.send_message_hook {
            hook.before_response(&request, Some(&response), error.as_ref());
        }
        Ok(Response::new(response))
    }

    async fn receive_message(
        &self,
        request: Request<pb::ReceiveMessageRequest>,
    ) -> Result<Response<pb::ReceiveMessageResponse>, Status> {
        let context = ProxyContext::from_request(&request);
        let request = request.into_inner();
        let (response, error) = match self.receive_message_inner(&context, &request).await {
            Ok(response) => (response, None),
            Err(error) => (
                pb::ReceiveMessageResponse {
                    status: Some(error_status(&error)),
                    ..Default::default()
                },
                Some(error),
            ),
        };
        if let Some(hook) = &self.receive_message_hook {
            hook.before_response(&request, Some(&response), error.as_ref());
        }
        Ok(Response::new(response))
    }

    async fn ack_message(
        &self,
        request: Request<pb::AckMessageRequest>,
    ) -> Result<Response<pb::AckMessageResponse>, Status> {
        let request = request.into_inner();
        let group = resource_name(request.group.as_ref());
        let topic = resource_name(request.topic.as_ref());
        if request.entries.is_empty() {
            return Ok(Response::new(pb::AckMessageResponse {
                status: Some(build_status(
                    StatusCode::InvalidArgument,
                    "no ack entries",
                )),
                entries: vec![],
            }));
        }
        let mut entries = Vec::with_capacity(request.entries.len());
        for entry in &request.entries {
            entries.push(self.ack_one(&group, &topic, entry).await);
        }
        let all_ok = entries.iter().all(|entry| {
            entry
                .status
                .as_ref()
                .map(|status| status.code == StatusCode::Ok.to_i32())
                .unwrap_or(false)
        });
        let status = if all_ok {
            ok_status()
        } else {
            build_status(StatusCode::InternalServerError, "some entries failed")
        };
        Ok(Response::new(pb::AckMessageResponse {
            status: Some(status),
            entries,
        }))
    }

    async fn change_invisible_duration(
        &self,
        request: Request<pb::ChangeInvisibleDurationRequest>,
    ) -> Result<Response<pb::ChangeInvisibleDurationResponse>, Status> {
        let request = request.into_inner();
        let group = resource_name(request.group.as_ref());
        let topic = resource_name(request.topic.as_ref());
        let invisible_millis = request
            .invisible_duration
            .as_ref()
            .map(duration_to_millis)
            .unwrap_or_else(|| self.retry_policy.next_delay_duration(0) as u64);
        let result = self
            .consumer_processor
            .change_invisible_time(
                &group,
                &topic,
                &request.receipt_handle,
                invisible_millis,
                self.consumer_processor.default_timeout(),
            )
            .await;
        let response = match result {
            Ok(ack_result) if ack_result.status == AckStatus::Ok => {
                pb::ChangeInvisibleDurationResponse {
                    status: Some(ok_status()),
                    // the old handle is dead, hand the renewed one back
                    receipt_handle: ack_result.extra_info.to_string(),
                }
            }
            Ok(_) => pb::ChangeInvisibleDurationResponse {
                status: Some(build_status(
                    StatusCode::InternalServerError,
                    "changeInvisibleDuration failed: status is abnormal",
                )),
                receipt_handle: String::new(),
            },
            Err(error) => pb::ChangeInvisibleDurationResponse {
                status: Some(error_status(&error)),
                receipt_handle: String::new(),
            },
        };
        Ok(Response::new(response))
    }

    async fn forward_message_to_dead_letter_queue(
        &self,
        request: Request<pb::ForwardMessageToDeadLetterQueueRequest>,
    ) -> Result<Response<pb::ForwardMessageToDeadLetterQueueResponse>, Status> {
        let context = ProxyContext::from_request(&request);
        let request = request.into_inner();
        let group = resource_name(request.group.as_ref());
        let topic = resource_name(request.topic.as_ref());
        let max_delivery_attempts = if request.max_delivery_attempts > 0 {
            request.max_delivery_attempts
        } else {
            self.client_settings_manager
                .max_delivery_attempts(&context.client_id)
        };
        let result = self
            .consumer_processor
            .forward_to_dead_letter_queue(
                &group,
                &topic,
                &request.receipt_handle,
                &CheetahString::from_slice(&request.message_id),
                max_delivery_attempts,
                self.consumer_processor.default_timeout(),
            )
            .await;
        let status = match result {
            Ok(NackResult::ForwardedToDeadLetter { code, remark }) => {
                broker_code_status(code, &remark)
            }
            Ok(NackResult::ChangedInvisible(_)) => build_status(
                StatusCode::InternalServerError,
                "unexpected nack outcome",
            ),
            Err(error) => error_status(&error),
        };
        Ok(Response::new(pb::ForwardMessageToDeadLetterQueueResponse {
            status: Some(status),
        }))
    }

    async fn heartbeat(
        &self,
        request: Request<pb::HeartbeatRequest>,
    ) -> Result<Response<pb::HeartbeatResponse>, Status> {
        let request = request.into_inner();
        let client_id = CheetahString::from_slice(&request.client_id);
        if let Some(settings) = request.settings.clone() {
            self.client_settings_manager
                .update_client_settings(&client_id, settings);
        }
        let group = resource_name(request.group.as_ref());
        if !group.is_empty() {
            self.channel_manager.touch_channel(&group, &client_id);
        }
        Ok(Response::new(pb::HeartbeatResponse {
            status: Some(ok_status()),
        }))
    }

    async fn health_check(
        &self,
        _request: Request<pb::HealthCheckRequest>,
    ) -> Result<Response<pb::HealthCheckResponse>, Status> {
        Ok(Response::new(pb::HealthCheckResponse {
            status: Some(ok_status()),
        }))
    }

    async fn notify_client_termination(
        &self,
        request: Request<pb::NotifyClientTerminationRequest>,
    ) -> Result<Response<pb::NotifyClientTerminationResponse>, Status> {
        let request = request.into_inner();
        let client_id = CheetahString::from_slice(&request.client_id);
        let group = resource_name(request.group.as_ref());
        if !group.is_empty() {
            self.channel_manager.remove_channel(&group, &client_id);
            if request.client_type() == pb::ClientType::Producer {
                self.transaction_heartbeat.on_producer_group_offline(&group);
            }
        }
        self.client_settings_manager.remove_client_settings(&client_id);
        info!("client {} of group {} terminated", client_id, group);
        Ok(Response::new(pb::NotifyClientTerminationResponse {
            status: Some(ok_status()),
        }))
    }

    async fn end_transaction(
        &self,
        request: Request<pb::EndTransactionRequest>,
    ) -> Result<Response<pb::EndTransactionResponse>, Status> {
        let context = ProxyContext::from_request(&request);
        let request = request.into_inner();
        let resolution = match request.resolution() {
            pb::TransactionResolution::Commit => TransactionResolution::Commit,
            pb::TransactionResolution::Rollback => TransactionResolution::Rollback,
            pb::TransactionResolution::Unspecified => {
                return Ok(Response::new(pb::EndTransactionResponse {
                    status: Some(build_status(
                        StatusCode::InvalidArgument,
                        "unspecified transaction resolution",
                    )),
                }))
            }
        };
        let from_check = request.source() == pb::TransactionSource::SourceServerCheck;
        let producer_group = if context.client_id.is_empty() {
            CheetahString::from_static_str("DEFAULT_PRODUCER")
        } else {
            context.client_id.clone()
        };
        let result = self
            .producer_processor
            .end_transaction(
                &producer_group,
                &request.transaction_id,
                &CheetahString::from_slice(&request.message_id),
                resolution,
                from_check,
                self.producer_processor.default_timeout(),
            )
            .await;
        let status = match result {
            Ok(()) => ok_status(),
            Err(error) => error_status(&error),
        };
        Ok(Response::new(pb::EndTransactionResponse {
            status: Some(status),
        }))
    }

    async fn pull_message(
        &self,
        request: Request<pb::PullMessageRequest>,
    ) -> Result<Response<pb::PullMessageResponse>, Status> {
        let request = request.into_inner();
        let result = async {
            let message_queue = request
                .message_queue
                .as_ref()
                .ok_or_else(|| ProxyError::ClientInput("message queue is required".to_string()))?;
            let topic = resource_name(message_queue.topic.as_ref());
            let group = resource_name(request.group.as_ref());
            let broker_name = message_queue
                .broker
                .as_ref()
                .map(|broker| CheetahString::from_slice(&broker.name))
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ProxyError::ClientInput("broker name is required".to_string()))?;
            let subscription = build_subscription(&topic, request.filter_expression.as_ref())?;
            let poll_millis = request
                .long_polling_timeout
                .as_ref()
                .map(duration_to_millis)
                .unwrap_or(20_000);
            self.consumer_processor
                .pull_message(
                    &group,
                    &topic,
                    &broker_name,
                    message_queue.id,
                    request.offset,
                    request.batch_size.max(1),
                    poll_millis,
                    &subscription,
                    poll_millis + self.consumer_processor.default_timeout(),
                )
                .await
        }
        .await;

        let response = match result {
            Ok(pull_result) => {
                let messages = if pull_result.pull_status == PullStatus::Found {
                    pull_result.msg_found_list.iter().map(build_message).collect()
                } else {
                    vec![]
                };
                pb::PullMessageResponse {
                    status: Some(ok_status()),
                    next_offset: pull_result.next_begin_offset,
                    messages,
                }
            }
            Err(error) => pb::PullMessageResponse {
                status: Some(error_status(&error)),
                ..Default::default()
            },
        };
        Ok(Response::new(response))
    }

    async fn query_offset(
        &self,
        request: Request<pb::QueryOffsetRequest>,
    ) -> Result<Response<pb::QueryOffsetResponse>, Status> {
        let request = request.into_inner();
        let result = async {
            let message_queue = request
                .message_queue
                .as_ref()
                .ok_or_else(|| ProxyError::ClientInput("message queue is required".to_string()))?;
            let topic = resource_name(message_queue.topic.as_ref());
            let broker_name = message_queue
                .broker
                .as_ref()
                .map(|broker| CheetahString::from_slice(&broker.name))
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ProxyError::ClientInput("broker name is required".to_string()))?;
            let policy = match request.query_offset_policy() {
                pb::QueryOffsetPolicy::Beginning => QueryOffsetPolicy::Beginning,
                pb::QueryOffsetPolicy::End => QueryOffsetPolicy::End,
                pb::QueryOffsetPolicy::TimePoint => QueryOffsetPolicy::TimePoint(
                    request
                        .timestamp
                        .as_ref()
                        .map(timestamp_to_millis)
                        .unwrap_or(0),
                ),
            };
            self.consumer_processor
                .query_offset(
                    &topic,
                    &broker_name,
                    message_queue.id,
                    policy,
                    self.consumer_processor.default_timeout(),
                )
                .await
        }
        .await;

        let response = match result {
            Ok(offset) => pb::QueryOffsetResponse {
                status: Some(ok_status()),
                offset,
            },
            Err(error) => pb::QueryOffsetResponse {
                status: Some(error_status(&error)),
                offset: 0,
            },
        };
        Ok(Response::new(response))
    }

    type PollCommandStream =
        Pin<Box<dyn Stream<Item = Result<pb::PollCommandResponse, Status>> + Send>>;

    async fn poll_command(
        &self,
        request: Request<pb::PollCommandRequest>,
    ) -> Result<Response<Self::PollCommandStream>, Status> {
        if self.local_mode_unimplemented().is_some() {
            return Err(Status::unimplemented("not implemented in LOCAL mode"));
        }
        let request = request.into_inner();
        let client_id = CheetahString::from_slice(&request.client_id);
        let group = resource_name(request.group.as_ref());
        if group.is_empty() {
            return Err(Status::invalid_argument("no group in poll command"));
        }
        let mailbox = self.channel_manager.create_channel(&group, &client_id);
        let stream = ReceiverStream::new(mailbox).map(|command| Ok(poll_command_response(command)));
        Ok(Response::new(Box::pin(stream)))
    }

    async fn report_thread_stack_trace(
        &self,
        request: Request<pb::ReportThreadStackTraceRequest>,
    ) -> Result<Response<pb::ReportThreadStackTraceResponse>, Status> {
        if let Some(status) = self.local_mode_unimplemented() {
            return Ok(Response::new(pb::ReportThreadStackTraceResponse {
                status: Some(status),
            }));
        }
        let request = request.into_inner();
        let nonce = CheetahString::from_slice(&request.nonce);
        let completed = self.channel_manager.complete_response(
            &nonce,
            ProxyRelayResult::ok(RelayReply::ConsumerRunningInfo(
                ConsumerRunningInfo::with_jstack(request.thread_stack_trace),
            )),
        );
        if !completed {
            warn!("thread stack trace for unknown nonce {}", nonce);
        }
        Ok(Response::new(pb::ReportThreadStackTraceResponse {
            status: Some(ok_status()),
        }))
    }

    async fn report_message_consumption_result(
        &self,
        request: Request<pb::ReportMessageConsumptionResultRequest>,
    ) -> Result<Response<pb::ReportMessageConsumptionResultResponse>, Status> {
        if let Some(status) = self.local_mode_unimplemented() {
            return Ok(Response::new(pb::ReportMessageConsumptionResultResponse {
                status: Some(status),
            }));
        }
        let request = request.into_inner();
        let nonce = CheetahString::from_slice(&request.nonce);
        let consume_result = if request.code == pb::Code::Ok as i32 {
            "CR_SUCCESS"
        } else {
            "CR_LATER"
        };
        let completed = self.channel_manager.complete_response(
            &nonce,
            ProxyRelayResult::ok(RelayReply::ConsumeMessageDirectlyResult(
                ConsumeMessageDirectlyResult {
                    order: false,
                    auto_commit: true,
                    consume_result: CheetahString::from_static_str(consume_result),
                    remark: Some(CheetahString::from_slice(&request.remark)),
                    spent_time_mills: 0,
                },
            )),
        );
        if !completed {
            warn!("consumption result for unknown nonce {}", nonce);
        }
        Ok(Response::new(pb::ReportMessageConsumptionResultResponse {
            status: Some(ok_status()),
        }))
    }
}

fn build_subscription(
    topic: &CheetahString,
    filter_expression: Option<&pb::FilterExpression>,
) -> Result<SubscriptionData, ProxyError> {
    match filter_expression {
        Some(expression) if expression.r#type == pb::FilterType::Sql as i32 => {
            SubscriptionData::build_sql(topic.clone(), &expression.expression)
        }
        Some(expression) => SubscriptionData::build(topic.clone(), &expression.expression),
        None => SubscriptionData::build(topic.clone(), ""),
    }
}

fn poll_command_response(command: RelayCommand) -> pb::PollCommandResponse {
    let command = match command {
        RelayCommand::PrintThreadStackTrace { nonce } => {
            pb::poll_command_response::Command::PrintThreadStackTraceCommand(
                pb::PrintThreadStackTraceCommand {
                    nonce: nonce.to_string(),
                },
            )
        }
        RelayCommand::RecoverOrphanedTransaction {
            message,
            transaction_id,
        } => pb::poll_command_response::Command::RecoverOrphanedTransactionCommand(
            pb::RecoverOrphanedTransactionCommand {
                message: Some(build_message(&message)),
                transaction_id: transaction_id.to_string(),
            },
        ),
        RelayCommand::VerifyMessageConsumption { nonce, message } => {
            pb::poll_command_response::Command::VerifyMessageCommand(pb::VerifyMessageCommand {
                nonce: nonce.to_string(),
                message: Some(build_message(&message)),
            })
        }
    };
    pb::PollCommandResponse {
        command: Some(command),
    }
}
