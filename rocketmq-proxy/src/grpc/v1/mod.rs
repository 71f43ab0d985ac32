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

use crate::common::delay_policy::DelayPolicy;
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
use crate::grpc::common::duration_to_millis;
use crate::grpc::common::timestamp_to_millis;
use crate::grpc::common::EndpointConverter;
use crate::grpc::common::IdentityEndpointConverter;
use crate::grpc::common::ResponseHook;
use crate::grpc::common::StatusCode;
use crate::grpc::context::ProxyContext;
use crate::grpc::proto::v1 as pb;
use crate::grpc::proto::v1::messaging_service_server::MessagingService;
use crate::grpc::v1::converter::broker_code_common;
use crate::grpc::v1::converter::build_broker_map;
use crate::grpc::v1::converter::build_common;
use crate::grpc::v1::converter::build_message;
use crate::grpc::v1::converter::build_send_message;
use crate::grpc::v1::converter::error_common;
use crate::grpc::v1::converter::gen_partitions_from_queue_data;
use crate::grpc::v1::converter::ok_common;
use crate::grpc::v1::converter::resource_name;
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
use crate::remoting::header::pop_message_request_header::INIT_MODE_MIN;
use crate::remoting::heartbeat::SubscriptionData;

type ReceiveMessageHook = dyn ResponseHook<pb::ReceiveMessageRequest, pb::ReceiveMessageResponse>;
type SendMessageHook = dyn ResponseHook<pb::SendMessageRequest, pb::SendMessageResponse>;
type QueryRouteHook = dyn ResponseHook<pb::QueryRouteRequest, pb::QueryRouteResponse>;

/// The v1 revision of the messaging surface, a thin translator onto the
/// version-agnostic engines.
pub struct MessagingActivityV1 {
    config: Arc<ProxyConfig>,
    mode: ProxyMode,
    producer_processor: Arc<ProducerProcessor>,
    consumer_processor: Arc<ConsumerProcessor>,
    topic_route_cache: Arc<TopicRouteCache>,
    assignment_selector: Arc<dyn AssignmentQueueSelector>,
    transaction_heartbeat: Arc<TransactionHeartbeatRegisterService>,
    channel_manager: Arc<ChannelManager>,
    delay_policy: DelayPolicy,
    endpoint_converter: Arc<dyn EndpointConverter<pb::Endpoints>>,
    receive_message_hook: Option<Arc<ReceiveMessageHook>>,
    send_message_hook: Option<Arc<SendMessageHook>>,
    query_route_hook: Option<Arc<QueryRouteHook>>,
}

impl MessagingActivityV1 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<ProxyConfig>,
        producer_processor: Arc<ProducerProcessor>,
        consumer_processor: Arc<ConsumerProcessor>,
        topic_route_cache: Arc<TopicRouteCache>,
        assignment_selector: Arc<dyn AssignmentQueueSelector>,
        transaction_heartbeat: Arc<TransactionHeartbeatRegisterService>,
        channel_manager: Arc<ChannelManager>,
    ) -> Self {
        let delay_policy = DelayPolicy::build(&config.message_delay_level);
        MessagingActivityV1 {
            mode: config.proxy_mode,
            config,
            producer_processor,
            consumer_processor,
            topic_route_cache,
            assignment_selector,
            transaction_heartbeat,
            channel_manager,
            delay_policy,
            endpoint_converter: Arc::new(IdentityEndpointConverter),
            receive_message_hook: None,
            send_message_hook: None,
            query_route_hook: None,
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

    pub fn set_query_route_hook(&mut self, hook: Arc<QueryRouteHook>) {
        self.query_route_hook = Some(hook);
    }

    /// Cluster mode must advertise a client-facing endpoint on every route
    /// reply; a missing or default one is a client error.
    fn checked_endpoints(
        &self,
        endpoints: Option<pb::Endpoints>,
    ) -> Result<pb::Endpoints, pb::ResponseCommon> {
        let converted = self.endpoint_converter.convert(endpoints);
        match converted {
            Some(endpoints) if endpoints != pb::Endpoints::default() => Ok(endpoints),
            other => Err(build_common(
                StatusCode::InvalidArgument,
                format!("endpoint {other:?} is invalidate"),
            )),
        }
    }

    async fn query_route_inner(
        &self,
        request: &pb::QueryRouteRequest,
    ) -> Result<pb::QueryRouteResponse, ProxyError> {
        let topic = resource_name(request.topic.as_ref());
        let wrapper = self.topic_route_cache.get_message_queue(&topic).await?;
        let route = wrapper.topic_route_data();

        let mut partitions = Vec::new();
        if self.mode.is_cluster() {
            let endpoints = match self.checked_endpoints(request.endpoints.clone()) {
                Ok(endpoints) => endpoints,
                Err(common) => {
                    return Ok(pb::QueryRouteResponse {
                        common: Some(common),
                        partitions: vec![],
                    })
                }
            };
            for queue_data in &route.queue_datas {
                let broker = pb::Broker {
                    name: queue_data.broker_name.to_string(),
                    id: 0,
                    endpoints: Some(endpoints.clone()),
                };
                partitions.extend(gen_partitions_from_queue_data(
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
                    partitions.extend(gen_partitions_from_queue_data(
                        queue_data,
                        request.topic.clone(),
                        broker.clone(),
                    ));
                }
            }
        }

        Ok(pb::QueryRouteResponse {
            common: Some(ok_common()),
            partitions,
        })
    }

    async fn receive_message_inner(
        &self,
        context: &ProxyContext,
        request: &pb::ReceiveMessageRequest,
    ) -> Result<pb::ReceiveMessageResponse, ProxyError> {
        let partition = request
            .partition
            .as_ref()
            .ok_or_else(|| ProxyError::ClientInput("partition is required".to_string()))?;
        let topic = resource_name(partition.topic.as_ref());
        let group = resource_name(request.group.as_ref());
        let subscription = build_subscription(&topic, request.filter_expression.as_ref())?;

        let invisible_millis = request
            .invisible_duration
            .as_ref()
            .map(duration_to_millis)
            .unwrap_or(60_000);
        let poll_millis = request
            .await_time
            .as_ref()
            .map(duration_to_millis)
            .unwrap_or(20_000);
        let init_mode = match request.consume_policy() {
            pb::ConsumePolicy::Playback => INIT_MODE_MIN,
            _ => INIT_MODE_MAX,
        };
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
                init_mode,
                &subscription,
                request.fifo_flag,
                context.remaining_millis(),
            )
            .await?;

        let response = match result.pop_status {
            PopStatus::Found => pb::ReceiveMessageResponse {
                common: Some(ok_common()),
                messages: result.msg_found_list.iter().map(build_message).collect(),
                delivery_timestamp: Some(crate::grpc::common::millis_to_timestamp(
                    result.pop_time as i64,
                )),
                invisible_duration: Some(prost_types::Duration {
                    seconds: (result.invisible_time / 1000) as i64,
                    nanos: ((result.invisible_time % 1000) * 1_000_000) as i32,
                }),
            },
            PopStatus::PollingFull => pb::ReceiveMessageResponse {
                common: Some(build_common(StatusCode::TooManyRequests, "polling full")),
                ..Default::default()
            },
            PopStatus::NoNewMsg | PopStatus::PollingNotFound => pb::ReceiveMessageResponse {
                common: Some(build_common(StatusCode::Ok, "no new message")),
                ..Default::default()
            },
        };
        Ok(response)
    }

    fn local_mode_unimplemented(&self) -> Option<pb::ResponseCommon> {
        if self.mode.is_local() {
            // the co-located broker talks to its clients directly
            Some(build_common(
                StatusCode::Unimplemented,
                "not implemented in LOCAL mode",
            ))
        } else {
            None
        }
    }
}

#[tonic::async_trait]
impl MessagingService for MessagingActivityV1 {
    async fn query_route(
        &self,
        request: Request<pb::QueryRouteRequest>,
    ) -> Result<Response<pb::QueryRouteResponse>, Status> {
        let request = request.into_inner();
        let (response, error) = match self.query_route_inner(&request).await {
            Ok(response) => (response, None),
            Err(error) => (
                pb::QueryRouteResponse {
                    common: Some(error_common(&error)),
                    partitions: vec![],
                },
                Some(error),
            ),
        };
        if let Some(hook) = &self.query_route_hook {
            hook.before_response(&request, Some(&response), error.as_ref());
        }
        Ok(Response::new(response))
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
                    common: Some(error_common(&error)),
                    assignments: vec![],
                }))
            }
        };
        let queues = self.assignment_selector.get_assignment(&wrapper);

        let mut assignments = Vec::new();
        if self.mode.is_cluster() {
            let endpoints = match self.checked_endpoints(request.endpoints.clone()) {
                Ok(endpoints) => endpoints,
                Err(common) => {
                    return Ok(Response::new(pb::QueryAssignmentResponse {
                        common: Some(common),
                        assignments: vec![],
                    }))
                }
            };
            for queue in queues {
                assignments.push(pb::Assignment {
                    partition: Some(pb::Partition {
                        topic: request.topic.clone(),
                        id: -1,
                        permission: pb::Permission::ReadWrite as i32,
                        broker: Some(pb::Broker {
                            name: queue.broker_name.to_string(),
                            id: 0,
                            endpoints: Some(endpoints.clone()),
                        }),
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
                    partition: Some(pb::Partition {
                        topic: request.topic.clone(),
                        id: -1,
                        permission: pb::Permission::ReadWrite as i32,
                        broker: Some(broker.clone()),
                    }),
                });
            }
        }

        Ok(Response::new(pb::QueryAssignmentResponse {
            common: Some(ok_common()),
            assignments,
        }))
    }

    async fn send_message(
        &self,
        request: Request<pb::SendMessageRequest>,
    ) -> Result<Response<pb::SendMessageResponse>, Status> {
        let request = request.into_inner();
        let result = async {
            let message = request
                .message
                .clone()
                .ok_or_else(|| ProxyError::ClientInput("message is required".to_string()))?;
            let producer_group = message
                .system_attribute
                .as_ref()
                .map(|attr| CheetahString::from_slice(&attr.producer_group))
                .filter(|group| !group.is_empty())
                .ok_or_else(|| ProxyError::ClientInput("producer group is empty".to_string()))?;
            let (topic, canonical) = build_send_message(message)?;
            self.producer_processor
                .send_message(
                    &producer_group,
                    &topic,
                    vec![canonical],
                    self.producer_processor.default_timeout(),
                )
                .await
        }
        .await;

        let (response, error) = match result {
            Ok(send_result) => {
                let common = if send_result.send_status == SendStatus::SendOk {
                    ok_common()
                } else {
                    build_common(
                        StatusCode::InternalServerError,
                        format!("{:?}", send_result.send_status),
                    )
                };
                (
                    pb::SendMessageResponse {
                        common: Some(common),
                        message_id: send_result.msg_id.to_string(),
                        transaction_id: send_result
                            .transaction_id
                            .map(|id| id.to_string())
                            .unwrap_or_default(),
                    },
                    None,
                )
            }
            Err(error) => (
                pb::SendMessageResponse {
                    common: Some(error_common(&error)),
                    ..Default::default()
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
                    common: Some(error_common(&error)),
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
        let result = self
            .consumer_processor
            .ack_message(
                &group,
                &topic,
                &request.receipt_handle,
                self.consumer_processor.default_timeout(),
            )
            .await;
        let common = match result {
            Ok(ack_result) if ack_result.status == AckStatus::Ok => ok_common(),
            Ok(_) => build_common(
                StatusCode::InternalServerError,
                "ack failed: status is abnormal",
            ),
            Err(error) => error_common(&error),
        };
        Ok(Response::new(pb::AckMessageResponse {
            common: Some(common),
        }))
    }

    async fn nack_message(
        &self,
        request: Request<pb::NackMessageRequest>,
    ) -> Result<Response<pb::NackMessageResponse>, Status> {
        let request = request.into_inner();
        let group = resource_name(request.group.as_ref());
        let topic = resource_name(request.topic.as_ref());
        let max_delivery_attempts = if request.max_delivery_attempts > 0 {
            request.max_delivery_attempts
        } else {
            self.config.max_delivery_attempts
        };
        let next_invisible_millis = self
            .delay_policy
            .next_delay_millis(request.delivery_attempt);

        let result = self
            .consumer_processor
            .nack_message(
                &group,
                &topic,
                &request.receipt_handle,
                &CheetahString::from_slice(&request.message_id),
                request.delivery_attempt,
                max_delivery_attempts,
                next_invisible_millis,
                self.consumer_processor.default_timeout(),
            )
            .await;

        let common = match result {
            Ok(NackResult::ChangedInvisible(ack_result)) if ack_result.status == AckStatus::Ok => {
                ok_common()
            }
            Ok(NackResult::ChangedInvisible(_)) => build_common(
                StatusCode::InternalServerError,
                "nack failed: status is abnormal",
            ),
            Ok(NackResult::ForwardedToDeadLetter { code, remark }) => {
                broker_code_common(code, &remark)
            }
            Err(error) => error_common(&error),
        };
        Ok(Response::new(pb::NackMessageResponse {
            common: Some(common),
        }))
    }

    async fn heartbeat(
        &self,
        request: Request<pb::HeartbeatRequest>,
    ) -> Result<Response<pb::HeartbeatResponse>, Status> {
        let request = request.into_inner();
        let client_id = CheetahString::from_slice(&request.client_id);
        match &request.client_data {
            Some(pb::heartbeat_request::ClientData::ProducerData(producer_data)) => {
                let group = resource_name(producer_data.group.as_ref());
                self.channel_manager.touch_channel(&group, &client_id);
            }
            Some(pb::heartbeat_request::ClientData::ConsumerData(consumer_data)) => {
                let group = resource_name(consumer_data.group.as_ref());
                self.channel_manager.touch_channel(&group, &client_id);
            }
            None => {
                return Ok(Response::new(pb::HeartbeatResponse {
                    common: Some(build_common(
                        StatusCode::InvalidArgument,
                        "no client data in heartbeat",
                    )),
                }))
            }
        }
        Ok(Response::new(pb::HeartbeatResponse {
            common: Some(ok_common()),
        }))
    }

    async fn health_check(
        &self,
        _request: Request<pb::HealthCheckRequest>,
    ) -> Result<Response<pb::HealthCheckResponse>, Status> {
        Ok(Response::new(pb::HealthCheckResponse {
            common: Some(ok_common()),
        }))
    }

    async fn notify_client_termination(
        &self,
        request: Request<pb::NotifyClientTerminationRequest>,
    ) -> Result<Response<pb::NotifyClientTerminationResponse>, Status> {
        let request = request.into_inner();
        let client_id = CheetahString::from_slice(&request.client_id);
        if let Some(producer_group) = request.producer_group.as_ref() {
            let group = resource_name(Some(producer_group));
            self.channel_manager.remove_channel(&group, &client_id);
            self.transaction_heartbeat.on_producer_group_offline(&group);
            info!("producer client {} of group {} terminated", client_id, group);
        }
        if let Some(consumer_group) = request.consumer_group.as_ref() {
            let group = resource_name(Some(consumer_group));
            self.channel_manager.remove_channel(&group, &client_id);
            info!("consumer client {} of group {} terminated", client_id, group);
        }
        Ok(Response::new(pb::NotifyClientTerminationResponse {
            common: Some(ok_common()),
        }))
    }

    async fn end_transaction(
        &self,
        request: Request<pb::EndTransactionRequest>,
    ) -> Result<Response<pb::EndTransactionResponse>, Status> {
        let request = request.into_inner();
        let group = resource_name(request.group.as_ref());
        let resolution = match request.resolution() {
            pb::TransactionResolution::Commit => TransactionResolution::Commit,
            pb::TransactionResolution::Rollback => TransactionResolution::Rollback,
        };
        let from_check = request.source() == pb::TransactionSource::SourceServerCheck;
        let result = self
            .producer_processor
            .end_transaction(
                &group,
                &request.transaction_id,
                &CheetahString::from_slice(&request.message_id),
                resolution,
                from_check,
                self.producer_processor.default_timeout(),
            )
            .await;
        let common = match result {
            Ok(()) => ok_common(),
            Err(error) => error_common(&error),
        };
        Ok(Response::new(pb::EndTransactionResponse {
            common: Some(common),
        }))
    }

    async fn pull_message(
        &self,
        request: Request<pb::PullMessageRequest>,
    ) -> Result<Response<pb::PullMessageResponse>, Status> {
        let request = request.into_inner();
        let result = async {
            let partition = request
                .partition
                .as_ref()
                .ok_or_else(|| ProxyError::ClientInput("partition is required".to_string()))?;
            let topic = resource_name(partition.topic.as_ref());
            let group = resource_name(request.group.as_ref());
            let broker_name = partition
                .broker
                .as_ref()
                .map(|broker| CheetahString::from_slice(&broker.name))
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ProxyError::ClientInput("broker name is required".to_string()))?;
            let subscription = build_subscription(&topic, request.filter_expression.as_ref())?;
            let poll_millis = request
                .await_time
                .as_ref()
                .map(duration_to_millis)
                .unwrap_or(20_000);
            self.consumer_processor
                .pull_message(
                    &group,
                    &topic,
                    &broker_name,
                    partition.id,
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
                    common: Some(ok_common()),
                    min_offset: pull_result.min_offset,
                    next_offset: pull_result.next_begin_offset,
                    max_offset: pull_result.max_offset,
                    messages,
                }
            }
            Err(error) => pb::PullMessageResponse {
                common: Some(error_common(&error)),
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
            let partition = request
                .partition
                .as_ref()
                .ok_or_else(|| ProxyError::ClientInput("partition is required".to_string()))?;
            let topic = resource_name(partition.topic.as_ref());
            let broker_name = partition
                .broker
                .as_ref()
                .map(|broker| CheetahString::from_slice(&broker.name))
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ProxyError::ClientInput("broker name is required".to_string()))?;
            let policy = match request.policy() {
                pb::QueryOffsetPolicy::Beginning => QueryOffsetPolicy::Beginning,
                pb::QueryOffsetPolicy::End => QueryOffsetPolicy::End,
                pb::QueryOffsetPolicy::TimePoint => QueryOffsetPolicy::TimePoint(
                    request
                        .time_point
                        .as_ref()
                        .map(timestamp_to_millis)
                        .unwrap_or(0),
                ),
            };
            self.consumer_processor
                .query_offset(
                    &topic,
                    &broker_name,
                    partition.id,
                    policy,
                    self.consumer_processor.default_timeout(),
                )
                .await
        }
        .await;

        let response = match result {
            Ok(offset) => pb::QueryOffsetResponse {
                common: Some(ok_common()),
                offset,
            },
            Err(error) => pb::QueryOffsetResponse {
                common: Some(error_common(&error)),
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
        let group = match &request.group {
            Some(pb::poll_command_request::Group::ProducerGroup(group)) => {
                resource_name(Some(group))
            }
            Some(pb::poll_command_request::Group::ConsumerGroup(group)) => {
                resource_name(Some(group))
            }
            None => return Err(Status::invalid_argument("no group in poll command")),
        };

        let mailbox = self.channel_manager.create_channel(&group, &client_id);
        let stream = ReceiverStream::new(mailbox).map(|command| Ok(poll_command_response(command)));
        Ok(Response::new(Box::pin(stream)))
    }

    async fn report_thread_stack_trace(
        &self,
        request: Request<pb::ReportThreadStackTraceRequest>,
    ) -> Result<Response<pb::ReportThreadStackTraceResponse>, Status> {
        if let Some(common) = self.local_mode_unimplemented() {
            return Ok(Response::new(pb::ReportThreadStackTraceResponse {
                common: Some(common),
            }));
        }
        let request = request.into_inner();
        let nonce = CheetahString::from_slice(&request.command_id);
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
            common: Some(ok_common()),
        }))
    }

    async fn report_message_consumption_result(
        &self,
        request: Request<pb::ReportMessageConsumptionResultRequest>,
    ) -> Result<Response<pb::ReportMessageConsumptionResultResponse>, Status> {
        if let Some(common) = self.local_mode_unimplemented() {
            return Ok(Response::new(pb::ReportMessageConsumptionResultResponse {
                common: Some(common),
            }));
        }
        let request = request.into_inner();
        let nonce = CheetahString::from_slice(&request.command_id);
        let consume_result = if request.code == 0 {
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
            common: Some(ok_common()),
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
            pb::poll_command_response::Type::PrintThreadStackTraceCommand(
                pb::PrintThreadStackTraceCommand {
                    command_id: nonce.to_string(),
                },
            )
        }
        RelayCommand::RecoverOrphanedTransaction {
            message,
            transaction_id,
        } => pb::poll_command_response::Type::RecoverOrphanedTransactionCommand(
            pb::RecoverOrphanedTransactionCommand {
                orphaned_transactional_message: Some(build_message(&message)),
                transaction_id: transaction_id.to_string(),
            },
        ),
        RelayCommand::VerifyMessageConsumption { nonce, message } => {
            pb::poll_command_response::Type::VerifyMessageConsumptionCommand(
                pb::VerifyMessageConsumptionCommand {
                    command_id: nonce.to_string(),
                    message: Some(build_message(&message)),
                },
            )
        }
    };
    pb::PollCommandResponse {
        r#type: Some(command),
    }
}
