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
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;

use crate::error::ProxyError;
use crate::remoting::RemotingCommand;

const JSON_SERIALIZE_TYPE: u8 = 0;
const FRAME_MAX_LENGTH: usize = 16 * 1024 * 1024;

/// Length-prefixed framing: `totalLen(i32) headerLen(i32, high byte =
/// serialize type) headerJson body`.
#[derive(Debug, Default)]
pub struct RemotingCommandCodec;

impl Decoder for RemotingCommandCodec {
    type Item = RemotingCommand;
    type Error = ProxyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }
        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[..4]);
        let total_length = i32::from_be_bytes(length_bytes) as usize;
        if total_length > FRAME_MAX_LENGTH {
            return Err(ProxyError::Internal(format!(
                "frame length {total_length} exceeds limit"
            )));
        }
        if src.len() < 4 + total_length {
            src.reserve(4 + total_length - src.len());
            return Ok(None);
        }
        src.advance(4);
        let mut frame = src.split_to(total_length);

        let header_meta = frame.get_i32();
        let serialize_type = ((header_meta >> 24) & 0xFF) as u8;
        if serialize_type != JSON_SERIALIZE_TYPE {
            return Err(ProxyError::Internal(format!(
                "unsupported serialize type: {serialize_type}"
            )));
        }
        let header_length = (header_meta & 0x00FF_FFFF) as usize;
        if header_length > frame.len() {
            return Err(ProxyError::Internal(format!(
                "header length {header_length} exceeds frame {}",
                frame.len()
            )));
        }
        let header_bytes = frame.split_to(header_length);
        let mut command: RemotingCommand = serde_json::from_slice(&header_bytes)?;
        if !frame.is_empty() {
            command = command.set_body(frame.freeze());
        }
        Ok(Some(command))
    }
}

impl Encoder<RemotingCommand> for RemotingCommandCodec {
    type Error = ProxyError;

    fn encode(&mut self, item: RemotingCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let header = serde_json::to_vec(&item)?;
        let body_length = item.body().map_or(0, |body| body.len());
        let total_length = 4 + header.len() + body_length;

        dst.reserve(4 + total_length);
        dst.put_i32(total_length as i32);
        let header_meta =
            ((JSON_SERIALIZE_TYPE as i32) << 24) | (header.len() as i32 & 0x00FF_FFFF);
        dst.put_i32(header_meta);
        dst.put_slice(&header);
        if let Some(body) = item.body() {
            dst.put_slice(body);
        }
        Ok(())
    }
}
