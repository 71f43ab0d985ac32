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

use bytes::Bytes;
use cheetah_string::CheetahString;

use crate::common::address::HostAndPort;
use crate::common::address::HostScheme;
use crate::common::message::message_ext::MessageExt;
use crate::common::message::Message;
use crate::common::message::MessageConst;
use crate::connector::route::gen_queue_permissions;
use crate::connector::route::QueuePermission;
use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::grpc::common::millis_to_timestamp;
use crate::grpc::common::status_of_error;
use crate::grpc::common::user_properties;
use crate::grpc::common::StatusCode;
use crate::grpc::proto::v2 as pb;
use crate::remoting::route::QueueData;
use crate::remoting::route::TopicRouteData;

pub fn build_status(code: StatusCode, message: impl Into<String>) -> pb::Status {
    pb::Status {
        code: code.to_i32(),
        message: message.into(),
    }
}

pub fn ok_status() -> pb::Status {
    build_status(StatusCode::Ok, StatusCode::Ok.name())
}

pub fn error_status(error: &ProxyError) -> pb::Status {
    let (code, message) = status_of_error(error);
    build_status(code, message)
}

pub fn broker_code_status(code: i32, remark: &str) -> pb::Status {
    if code == 0 {
        ok_status()
    } else {
        pb::Status {
            code,
            message: remark.to_string(),
        }
    }
}

pub fn resource_name(resource: Option<&pb::Resource>) -> CheetahString {
    match resource {
        Some(resource) if !resource.resource_namespace.is_empty() => CheetahString::from_string(
            format!("{}%{}", resource.resource_namespace, resource.name),
        ),
        Some(resource) => CheetahString::from_slice(&resource.name),
        None => CheetahString::new(),
    }
}

fn permission_of(permission: QueuePermission) -> pb::Permission {
    match permission {
        QueuePermission::Read => pb::Permission::Read,
        QueuePermission::Write => pb::Permission::Write,
        QueuePermission::ReadWrite => pb::Permission::ReadWrite,
    }
}

pub fn gen_message_queues_from_queue_data(
    queue_data: &QueueData,
    topic: Option<pb::Resource>,
    broker: pb::Broker,
) -> Vec<pb::MessageQueue> {
    gen_queue_permissions(queue_data)
        .into_iter()
        .map(|(queue_id, permission)| pb::MessageQueue {
            topic: topic.clone(),
            id: queue_id,
            permission: permission_of(permission) as i32,
            broker: Some(broker.clone()),
            accept_message_types: vec![
                pb::MessageType::Normal as i32,
                pb::MessageType::Fifo as i32,
                pb::MessageType::Delay as i32,
                pb::MessageType::Transaction as i32,
            ],
        })
        .collect()
}

pub fn build_broker_map(
    route: &TopicRouteData,
    grpc_port: u16,
) -> HashMap<CheetahString, HashMap<i64, pb::Broker>> {
    let mut broker_map = HashMap::new();
    for broker_data in &route.broker_datas {
        let mut broker_id_map = HashMap::new();
        for (broker_id, broker_addr) in &broker_data.broker_addrs {
            let Ok(host_and_port) = broker_addr.as_str().parse::<HostAndPort>() else {
                continue;
            };
            let scheme = match host_and_port.scheme() {
                HostScheme::Ipv4 => pb::AddressScheme::Ipv4,
                HostScheme::Ipv6 => pb::AddressScheme::Ipv6,
                HostScheme::DomainName => pb::AddressScheme::DomainName,
            };
            broker_id_map.insert(
                *broker_id,
                pb::Broker {
                    name: broker_data.broker_name.to_string(),
                    id: *broker_id as i32,
                    endpoints: Some(pb::Endpoints {
                        scheme: scheme as i32,
                        addresses: vec![pb::Address {
                            host: host_and_port.host().to_string(),
                            port: grpc_port as i32,
                        }],
                    }),
                },
            );
        }
        broker_map.insert(broker_data.broker_name.clone(), broker_id_map);
    }
    broker_map
}

pub fn build_message(message_ext: &MessageExt) -> pb::Message {
    let message_group = message_ext
        .get_property(MessageConst::PROPERTY_SHARDING_KEY)
        .map(|group| group.to_string())
        .unwrap_or_default();
    let is_transaction = message_ext
        .get_property(MessageConst::PROPERTY_TRANSACTION_PREPARED)
        .map(|value| value.as_str().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let delay_level = message_ext
        .get_property(MessageConst::PROPERTY_DELAY_TIME_LEVEL)
        .and_then(|level| level.as_str().parse::<i32>().ok())
        .unwrap_or(0);
    let message_type = if is_transaction {
        pb::MessageType::Transaction
    } else if !message_group.is_empty() {
        pb::MessageType::Fifo
    } else if delay_level > 0 {
        pb::MessageType::Delay
    } else {
        pb::MessageType::Normal
    };

    let system_properties = pb::SystemProperties {
        tag: message_ext
            .get_tags()
            .map(|tags| tags.to_string())
            .unwrap_or_default(),
        keys: message_ext
            .get_property(MessageConst::PROPERTY_KEYS)
            .map(|keys| {
                keys.as_str()
                    .split(MessageConst::KEY_SEPARATOR)
                    .filter(|key| !key.is_empty())
                    .map(|key| key.to_string())
                    .collect()
            })
            .unwrap_or_default(),
        message_id: message_ext.uniq_or_msg_id().to_string(),
        message_type: message_type as i32,
        born_timestamp: Some(millis_to_timestamp(message_ext.born_timestamp)),
        born_host: message_ext.born_host.to_string(),
        store_timestamp: Some(millis_to_timestamp(message_ext.store_timestamp)),
        store_host: message_ext.store_host.to_string(),
        queue_id: message_ext.queue_id,
        queue_offset: message_ext.queue_offset,
        receipt_handle: message_ext
            .get_property(MessageConst::PROPERTY_POP_CK)
            .map(|handle| handle.to_string())
            .unwrap_or_default(),
        invisible_duration: None,
        delivery_attempt: message_ext.reconsume_times + 1,
        message_group,
        delivery_timestamp: None,
        trace_context: String::new(),
        transaction_id: message_ext
            .message
            .transaction_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default(),
    };

    pb::Message {
        topic: Some(pb::Resource {
            resource_namespace: String::new(),
            name: message_ext.topic().to_string(),
        }),
        user_properties: user_properties(message_ext)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        system_properties: Some(system_properties),
        body: message_ext.message.body.to_vec(),
    }
}

pub fn build_send_message(message: pb::Message) -> ProxyResult<(CheetahString, Message)> {
    let topic = resource_name(message.topic.as_ref());
    if topic.is_empty() {
        return Err(ProxyError::ClientInput("message topic is empty".to_string()));
    }
    let mut canonical = Message::new(topic.clone(), Bytes::from(message.body));
    for (key, value) in message.user_properties {
        canonical.put_property(
            CheetahString::from_string(key),
            CheetahString::from_string(value),
        );
    }
    if let Some(system_properties) = message.system_properties {
        if !system_properties.tag.is_empty() {
            canonical.put_property(MessageConst::PROPERTY_TAGS, system_properties.tag);
        }
        if !system_properties.keys.is_empty() {
            canonical.put_property(
                MessageConst::PROPERTY_KEYS,
                system_properties.keys.join(MessageConst::KEY_SEPARATOR),
            );
        }
        if !system_properties.message_id.is_empty() {
            canonical.put_property(
                MessageConst::PROPERTY_UNIQ_CLIENT_MESSAGE_ID_KEYIDX,
                system_properties.message_id,
            );
        }
        if !system_properties.message_group.is_empty() {
            canonical.put_property(
                MessageConst::PROPERTY_SHARDING_KEY,
                system_properties.message_group,
            );
        }
        if system_properties.message_type == pb::MessageType::Transaction as i32 {
            canonical.put_property(MessageConst::PROPERTY_TRANSACTION_PREPARED, "true");
        }
    }
    Ok((topic, canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_queues_follow_queue_id_layout() {
        let queue_data = QueueData {
            broker_name: CheetahString::from("broker-a"),
            read_queue_nums: 4,
            write_queue_nums: 8,
            perm: 6,
            topic_sys_flag: 0,
        };
        let broker = pb::Broker {
            name: "broker-a".to_string(),
            id: 0,
            endpoints: None,
        };
        let queues = gen_message_queues_from_queue_data(&queue_data, None, broker);
        assert_eq!(queues.len(), 8);
        assert!(queues[..4]
            .iter()
            .all(|queue| queue.permission == pb::Permission::Write as i32));
        assert!(queues[4..]
            .iter()
            .all(|queue| queue.permission == pb::Permission::ReadWrite as i32));
    }

    #[test]
    fn receipt_handle_travels_in_system_properties() {
        let mut message_ext = MessageExt {
            queue_id: 3,
            queue_offset: 42,
            ..Default::default()
        };
        message_ext.message.topic = CheetahString::from("topic");
        message_ext.put_property(MessageConst::PROPERTY_POP_CK, "ck");
        let proto_message = build_message(&message_ext);
        assert_eq!(
            proto_message.system_properties.unwrap().receipt_handle,
            "ck"
        );
    }

    #[test]
    fn fifo_message_type_derives_from_message_group() {
        let mut message_ext = MessageExt::default();
        message_ext.message.topic = CheetahString::from("topic");
        message_ext.put_property(MessageConst::PROPERTY_SHARDING_KEY, "order-key");
        let proto_message = build_message(&message_ext);
        assert_eq!(
            proto_message.system_properties.unwrap().message_type,
            pb::MessageType::Fifo as i32
        );
    }

    #[test]
    fn send_message_requires_topic() {
        assert!(build_send_message(pb::Message::default()).is_err());
    }
}
