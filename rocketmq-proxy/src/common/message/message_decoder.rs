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

use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use cheetah_string::CheetahString;

use crate::common::message::message_ext::MessageExt;
use crate::common::message::message_properties_to_string;
use crate::common::message::string_to_message_properties;
use crate::common::message::Message;
use crate::error::ProxyError;
use crate::error::ProxyResult;

pub const MESSAGE_MAGIC_CODE: i32 = -626843481;

/// A store-generated message id, the storing host plus the message's
/// commit-log offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId {
    pub address: std::net::SocketAddr,
    pub offset: i64,
}

/// Decoder/encoder for the storage layout carried inside pop and pull reply
/// bodies. Only the fixed-width v4 host format is handled, messages the
/// proxy relays never carry v6 host flags on this path.
pub struct MessageDecoder;

impl MessageDecoder {
    pub fn decode(buf: &mut Bytes) -> ProxyResult<MessageExt> {
        let start_remaining = buf.remaining();
        if start_remaining < 4 {
            return Err(ProxyError::Internal(
                "message buffer truncated before total size".to_string(),
            ));
        }
        let store_size = buf.get_i32();
        if (buf.remaining() as i32) < store_size - 4 {
            return Err(ProxyError::Internal(format!(
                "message buffer truncated, total size {store_size}, remaining {}",
                buf.remaining()
            )));
        }
        let magic_code = buf.get_i32();
        if magic_code != MESSAGE_MAGIC_CODE {
            return Err(ProxyError::Internal(format!(
                "unexpected message magic code {magic_code}"
            )));
        }
        let body_crc = buf.get_i32();
        let queue_id = buf.get_i32();
        let flag = buf.get_i32();
        let queue_offset = buf.get_i64();
        let commit_log_offset = buf.get_i64();
        let sys_flag = buf.get_i32();
        let born_timestamp = buf.get_i64();
        let born_host = Self::read_host(buf);
        let store_timestamp = buf.get_i64();
        let store_host = Self::read_host(buf);
        let reconsume_times = buf.get_i32();
        let prepared_transaction_offset = buf.get_i64();

        let body_len = buf.get_i32() as usize;
        let body = buf.copy_to_bytes(body_len);

        let topic_len = buf.get_u8() as usize;
        let topic_bytes = buf.copy_to_bytes(topic_len);
        let topic = CheetahString::from_string(
            String::from_utf8(topic_bytes.to_vec())
                .map_err(|e| ProxyError::Internal(format!("topic is not utf-8: {e}")))?,
        );

        let properties_len = buf.get_i16() as usize;
        let properties_bytes = buf.copy_to_bytes(properties_len);
        let properties = string_to_message_properties(
            std::str::from_utf8(&properties_bytes)
                .map_err(|e| ProxyError::Internal(format!("properties are not utf-8: {e}")))?,
        );

        let msg_id = Self::create_message_id(&store_host, commit_log_offset);

        Ok(MessageExt {
            message: Message {
                topic,
                flag,
                properties,
                body,
                transaction_id: None,
            },
            broker_name: CheetahString::new(),
            queue_id,
            store_size,
            queue_offset,
            sys_flag,
            born_timestamp,
            born_host,
            store_timestamp,
            store_host,
            msg_id,
            commit_log_offset,
            body_crc,
            reconsume_times,
            prepared_transaction_offset,
        })
    }

    pub fn decodes_batch(body: &Bytes) -> ProxyResult<Vec<MessageExt>> {
        let mut buf = body.clone();
        let mut messages = Vec::new();
        while buf.remaining() >= 4 {
            messages.push(Self::decode(&mut buf)?);
        }
        Ok(messages)
    }

    pub fn encode(message_ext: &MessageExt) -> Bytes {
        let properties = message_properties_to_string(&message_ext.message.properties);
        let properties_bytes = properties.as_bytes();
        let topic_bytes = message_ext.message.topic.as_str().as_bytes();
        let body = &message_ext.message.body;

        let store_size = 4 // total size
            + 4 // magic code
            + 4 // body crc
            + 4 // queue id
            + 4 // flag
            + 8 // queue offset
            + 8 // commit log offset
            + 4 // sys flag
            + 8 // born timestamp
            + 8 // born host
            + 8 // store timestamp
            + 8 // store host
            + 4 // reconsume times
            + 8 // prepared transaction offset
            + 4 + body.len()
            + 1 + topic_bytes.len()
            + 2 + properties_bytes.len();

        let mut buf = BytesMut::with_capacity(store_size);
        buf.put_i32(store_size as i32);
        buf.put_i32(MESSAGE_MAGIC_CODE);
        buf.put_i32(message_ext.body_crc);
        buf.put_i32(message_ext.queue_id);
        buf.put_i32(message_ext.message.flag);
        buf.put_i64(message_ext.queue_offset);
        buf.put_i64(message_ext.commit_log_offset);
        buf.put_i32(message_ext.sys_flag);
        buf.put_i64(message_ext.born_timestamp);
        Self::write_host(&mut buf, &message_ext.born_host);
        buf.put_i64(message_ext.store_timestamp);
        Self::write_host(&mut buf, &message_ext.store_host);
        buf.put_i32(message_ext.reconsume_times);
        buf.put_i64(message_ext.prepared_transaction_offset);
        buf.put_i32(body.len() as i32);
        buf.put_slice(body);
        buf.put_u8(topic_bytes.len() as u8);
        buf.put_slice(topic_bytes);
        buf.put_i16(properties_bytes.len() as i16);
        buf.put_slice(properties_bytes);
        buf.freeze()
    }

    /// Serialize a message list into the wire body of a batch send. Batch
    /// entries carry no storage coordinates yet, only flag/body/properties.
    pub fn encode_messages(messages: &[Message]) -> Bytes {
        let mut buf = BytesMut::new();
        for message in messages {
            let properties = message_properties_to_string(&message.properties);
            let properties_bytes = properties.as_bytes();
            let total_size = 4 + 4 + 4 + 4 + 4 + message.body.len() + 2 + properties_bytes.len();
            buf.put_i32(total_size as i32);
            buf.put_i32(0); // batch entry magic
            buf.put_i32(0); // body crc
            buf.put_i32(message.flag);
            buf.put_i32(message.body.len() as i32);
            buf.put_slice(&message.body);
            buf.put_i16(properties_bytes.len() as i16);
            buf.put_slice(properties_bytes);
        }
        buf.freeze()
    }

    /// The reverse of [`Self::create_message_id`]: recover the storing host
    /// and the commit-log offset from a store-generated message id. A
    /// 32-char id carries a v4 host, a 56-char one a v6 host.
    pub fn decode_message_id(msg_id: &str) -> ProxyResult<MessageId> {
        use std::net::IpAddr;
        use std::net::Ipv4Addr;
        use std::net::Ipv6Addr;
        use std::net::SocketAddr;

        let bytes = hex_to_bytes(msg_id)
            .ok_or_else(|| ProxyError::Internal(format!("malformed message id: {msg_id}")))?;
        let mut buffer = Bytes::from(bytes);
        let address = match msg_id.len() {
            32 => {
                let mut ip = [0u8; 4];
                buffer.copy_to_slice(&mut ip);
                let port = buffer.get_i32();
                SocketAddr::new(IpAddr::V4(Ipv4Addr::from(ip)), port as u16)
            }
            56 => {
                let mut ip = [0u8; 16];
                buffer.copy_to_slice(&mut ip);
                let port = buffer.get_i32();
                SocketAddr::new(IpAddr::V6(Ipv6Addr::from(ip)), port as u16)
            }
            len => {
                return Err(ProxyError::Internal(format!(
                    "unexpected message id length {len}: {msg_id}"
                )))
            }
        };
        Ok(MessageId {
            address,
            offset: buffer.get_i64(),
        })
    }

    fn read_host(buf: &mut Bytes) -> CheetahString {
        let ip = [buf.get_u8(), buf.get_u8(), buf.get_u8(), buf.get_u8()];
        let port = buf.get_i32();
        CheetahString::from_string(format!("{}.{}.{}.{}:{}", ip[0], ip[1], ip[2], ip[3], port))
    }

    fn write_host(buf: &mut BytesMut, host: &CheetahString) {
        let parsed = host
            .as_str()
            .parse::<std::net::SocketAddrV4>()
            .unwrap_or_else(|_| "0.0.0.0:0".parse().unwrap());
        buf.put_slice(&parsed.ip().octets());
        buf.put_i32(parsed.port() as i32);
    }

    pub fn create_message_id(store_host: &CheetahString, commit_log_offset: i64) -> CheetahString {
        let parsed = store_host
            .as_str()
            .parse::<std::net::SocketAddrV4>()
            .unwrap_or_else(|_| "0.0.0.0:0".parse().unwrap());
        let mut id = BytesMut::with_capacity(16);
        id.put_slice(&parsed.ip().octets());
        id.put_i32(parsed.port() as i32);
        id.put_i64(commit_log_offset);
        let mut out = String::with_capacity(32);
        for byte in id.freeze() {
            out.push_str(&format!("{byte:02X}"));
        }
        CheetahString::from_string(out)
    }
}

fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(&hex[index..index + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::common::message::MessageConst;

    fn sample_message_ext() -> MessageExt {
        let mut message = Message::new("unit-topic", Bytes::from_static(b"hello"));
        message.put_property(MessageConst::PROPERTY_TAGS, "tagA");
        MessageExt {
            message,
            queue_id: 3,
            queue_offset: 42,
            commit_log_offset: 1024,
            sys_flag: 0,
            born_timestamp: 1700000000000,
            born_host: CheetahString::from("127.0.0.1:52000"),
            store_timestamp: 1700000000100,
            store_host: CheetahString::from("127.0.0.1:10911"),
            reconsume_times: 1,
            ..Default::default()
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let original = sample_message_ext();
        let mut encoded = MessageDecoder::encode(&original);
        let decoded = MessageDecoder::decode(&mut encoded).unwrap();

        assert_eq!(decoded.message.topic.as_str(), "unit-topic");
        assert_eq!(decoded.message.body.as_ref(), b"hello");
        assert_eq!(decoded.queue_id, 3);
        assert_eq!(decoded.queue_offset, 42);
        assert_eq!(decoded.commit_log_offset, 1024);
        assert_eq!(decoded.reconsume_times, 1);
        assert_eq!(decoded.get_tags().unwrap().as_str(), "tagA");
        assert_eq!(decoded.store_host.as_str(), "127.0.0.1:10911");
    }

    #[test]
    fn decodes_batch_preserves_order() {
        let mut first = sample_message_ext();
        first.queue_offset = 1;
        let mut second = sample_message_ext();
        second.queue_offset = 2;

        let mut body = bytes::BytesMut::new();
        body.extend_from_slice(&MessageDecoder::encode(&first));
        body.extend_from_slice(&MessageDecoder::encode(&second));

        let decoded = MessageDecoder::decodes_batch(&body.freeze()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].queue_offset, 1);
        assert_eq!(decoded[1].queue_offset, 2);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut encoded = bytes::BytesMut::new();
        encoded.put_i32(8);
        encoded.put_i32(12345);
        let result = MessageDecoder::decode(&mut encoded.freeze());
        assert!(result.is_err());
    }

    #[test]
    fn message_id_is_stable_hex() {
        let id = MessageDecoder::create_message_id(&CheetahString::from("127.0.0.1:10911"), 1024);
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn message_id_round_trips_commit_log_offset() {
        let store_host = CheetahString::from("127.0.0.1:10911");
        let id = MessageDecoder::create_message_id(&store_host, 2048);
        let decoded = MessageDecoder::decode_message_id(id.as_str()).unwrap();
        assert_eq!(decoded.offset, 2048);
        assert_eq!(decoded.address.to_string(), "127.0.0.1:10911");
    }

    #[test]
    fn decode_message_id_rejects_malformed_input() {
        assert!(MessageDecoder::decode_message_id("").is_err());
        assert!(MessageDecoder::decode_message_id("abc").is_err());
        // right length, not hex
        assert!(MessageDecoder::decode_message_id(&"ZZ".repeat(16)).is_err());
        // hex but neither v4 nor v6 sized
        assert!(MessageDecoder::decode_message_id(&"AB".repeat(10)).is_err());
    }
}
