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
use std::fmt;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use cheetah_string::CheetahString;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde::Serialize;

use crate::remoting::command_custom_header::CommandCustomHeader;
use crate::remoting::command_custom_header::FromMap;

pub const RPC_TYPE_RESPONSE: i32 = 1;
pub const RPC_ONEWAY: i32 = 1 << 1;

const PROXY_VERSION: i32 = 500;

lazy_static! {
    static ref REQUEST_ID: AtomicI32 = AtomicI32::new(0);
}

/// The framed unit of the broker wire protocol. The JSON-serialized part is
/// the header frame, the opaque body rides behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotingCommand {
    code: i32,
    language: CheetahString,
    version: i32,
    opaque: i32,

    /// Lowest bit marks a response, second bit a one-way request.
    flag: i32,
    remark: Option<CheetahString>,

    #[serde(rename = "extFields")]
    ext_fields: Option<HashMap<CheetahString, CheetahString>>,

    #[serde(skip)]
    body: Option<Bytes>,
}

impl RemotingCommand {
    pub fn create_remoting_command(code: impl Into<i32>) -> Self {
        RemotingCommand {
            code: code.into(),
            language: CheetahString::from_static_str("RUST"),
            version: PROXY_VERSION,
            opaque: REQUEST_ID.fetch_add(1, Ordering::AcqRel),
            flag: 0,
            remark: None,
            ext_fields: None,
            body: None,
        }
    }

    pub fn create_request_command<H>(code: impl Into<i32>, header: H) -> Self
    where
        H: CommandCustomHeader,
    {
        Self::create_remoting_command(code).set_ext_fields(header.to_map())
    }

    pub fn create_response_command_with_code(code: impl Into<i32>) -> Self {
        Self::create_remoting_command(code).mark_response_type()
    }

    pub fn set_code(mut self, code: impl Into<i32>) -> Self {
        self.code = code.into();
        self
    }

    pub fn set_opaque(mut self, opaque: i32) -> Self {
        self.opaque = opaque;
        self
    }

    pub fn set_remark(mut self, remark: impl Into<CheetahString>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    pub fn set_ext_fields(mut self, ext_fields: HashMap<CheetahString, CheetahString>) -> Self {
        self.ext_fields = Some(ext_fields);
        self
    }

    pub fn put_ext_field(
        &mut self,
        key: impl Into<CheetahString>,
        value: impl Into<CheetahString>,
    ) {
        self.ext_fields
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }

    pub fn set_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn mark_response_type(mut self) -> Self {
        self.flag |= RPC_TYPE_RESPONSE;
        self
    }

    pub fn mark_oneway_rpc(mut self) -> Self {
        self.flag |= RPC_ONEWAY;
        self
    }

    pub fn is_response_type(&self) -> bool {
        self.flag & RPC_TYPE_RESPONSE == RPC_TYPE_RESPONSE
    }

    pub fn is_oneway_rpc(&self) -> bool {
        self.flag & RPC_ONEWAY == RPC_ONEWAY
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn language(&self) -> &CheetahString {
        &self.language
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn opaque(&self) -> i32 {
        self.opaque
    }

    pub fn flag(&self) -> i32 {
        self.flag
    }

    pub fn remark(&self) -> Option<&CheetahString> {
        self.remark.as_ref()
    }

    pub fn remark_or_default(&self) -> String {
        self.remark
            .as_ref()
            .map(|remark| remark.to_string())
            .unwrap_or_default()
    }

    pub fn ext_fields(&self) -> Option<&HashMap<CheetahString, CheetahString>> {
        self.ext_fields.as_ref()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    pub fn decode_command_custom_header<T: FromMap>(&self) -> crate::error::ProxyResult<T> {
        match self.ext_fields.as_ref() {
            Some(map) => T::from_map(map),
            None => T::from_map(&HashMap::new()),
        }
    }
}

impl fmt::Display for RemotingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RemotingCommand [code={}, language={}, version={}, opaque={}, flag(B)={:b}, remark={:?}]",
            self.code, self.language, self.version, self.opaque, self.flag, self.remark
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_commands_get_unique_opaque() {
        let first = RemotingCommand::create_remoting_command(10);
        let second = RemotingCommand::create_remoting_command(10);
        assert_ne!(first.opaque(), second.opaque());
        assert!(!first.is_response_type());
    }

    #[test]
    fn response_flag_is_marked() {
        let response = RemotingCommand::create_response_command_with_code(0);
        assert!(response.is_response_type());
        assert!(!response.is_oneway_rpc());
    }

    #[test]
    fn oneway_flag_is_marked() {
        let request = RemotingCommand::create_remoting_command(15).mark_oneway_rpc();
        assert!(request.is_oneway_rpc());
    }

    #[test]
    fn ext_fields_survive_json_round_trip() {
        let mut command = RemotingCommand::create_remoting_command(10);
        command.put_ext_field("topic", "t");
        let json = serde_json::to_string(&command).unwrap();
        let decoded: RemotingCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(
            decoded.ext_fields().unwrap().get("topic").unwrap().as_str(),
            "t"
        );
        assert_eq!(decoded.code(), 10);
    }
}
