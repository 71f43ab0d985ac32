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

use crate::error::ProxyResult;
use crate::remoting::client::RemotingClient;
use crate::remoting::RemotingCommand;

/// The co-located broker in LOCAL mode, consumed as an in-process call.
#[tonic::async_trait]
pub trait InProcessBroker: Send + Sync + 'static {
    async fn async_process_request(
        &self,
        request: RemotingCommand,
    ) -> ProxyResult<RemotingCommand>;
}

/// LOCAL-mode replacement for the network client: every invoke goes straight
/// into the embedded broker, the address is ignored.
pub struct LocalBrokerClient {
    broker: Arc<dyn InProcessBroker>,
}

impl LocalBrokerClient {
    pub fn new(broker: Arc<dyn InProcessBroker>) -> Self {
        LocalBrokerClient { broker }
    }
}

#[tonic::async_trait]
impl RemotingClient for LocalBrokerClient {
    async fn invoke(
        &self,
        _addr: &CheetahString,
        request: RemotingCommand,
        _timeout_millis: u64,
    ) -> ProxyResult<RemotingCommand> {
        self.broker.async_process_request(request).await
    }

    async fn invoke_oneway(
        &self,
        _addr: &CheetahString,
        request: RemotingCommand,
        _timeout_millis: u64,
    ) -> ProxyResult<()> {
        let _ = self.broker.async_process_request(request).await?;
        Ok(())
    }

    async fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remoting::code::ResponseCode;

    struct EchoBroker;

    #[tonic::async_trait]
    impl InProcessBroker for EchoBroker {
        async fn async_process_request(
            &self,
            request: RemotingCommand,
        ) -> ProxyResult<RemotingCommand> {
            Ok(
                RemotingCommand::create_response_command_with_code(ResponseCode::Success)
                    .set_opaque(request.opaque()),
            )
        }
    }

    #[tokio::test]
    async fn invoke_bypasses_the_network() {
        let client = LocalBrokerClient::new(Arc::new(EchoBroker));
        let request = RemotingCommand::create_remoting_command(10);
        let opaque = request.opaque();
        let response = client
            .invoke(&CheetahString::from("ignored"), request, 1000)
            .await
            .unwrap();
        assert_eq!(response.opaque(), opaque);
        assert!(response.is_response_type());
    }
}
