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
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use crate::common::time_utils;
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::error::ProxyResult;
use crate::relay::ProxyRelayResult;
use crate::relay::RelayCommand;

const SWEEP_PERIOD: Duration = Duration::from_secs(10);
const CHANNEL_MAILBOX_SIZE: usize = 16;

/// The virtual channel toward one `(group, clientId)`: a mailbox drained by
/// the client's poll stream plus its last-poll timestamp.
pub struct RelayChannel {
    client_id: CheetahString,
    outbound_tx: mpsc::Sender<RelayCommand>,
    last_poll_millis: AtomicU64,
}

impl RelayChannel {
    fn touch(&self) {
        self.last_poll_millis
            .store(time_utils::get_current_millis(), Ordering::Release);
    }

    fn idle_seconds(&self) -> u64 {
        let last = self.last_poll_millis.load(Ordering::Acquire);
        time_utils::get_current_millis().saturating_sub(last) / 1000
    }
}

struct PendingRelayResponse {
    sender: oneshot::Sender<ProxyRelayResult>,
    create_time_millis: u64,
}

/// Book-keeping for broker→client back-requests: outbound mailboxes per
/// `(group, clientId)` and a nonce → pending-reply table swept on a timer.
pub struct ChannelManager {
    config: Arc<ProxyConfig>,
    group_channel_map: DashMap<CheetahString, HashMap<CheetahString, Arc<RelayChannel>>>,
    nonce_generator: AtomicU64,
    pending_responses: DashMap<CheetahString, PendingRelayResponse>,
    shutdown_token: CancellationToken,
}

impl ChannelManager {
    pub fn new(config: Arc<ProxyConfig>) -> Self {
        ChannelManager {
            config,
            group_channel_map: DashMap::new(),
            nonce_generator: AtomicU64::new(0),
            pending_responses: DashMap::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Register (or replace) the channel for this client and hand back the
    /// mailbox its poll stream drains.
    pub fn create_channel(
        &self,
        group: &CheetahString,
        client_id: &CheetahString,
    ) -> mpsc::Receiver<RelayCommand> {
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_MAILBOX_SIZE);
        let channel = Arc::new(RelayChannel {
            client_id: client_id.clone(),
            outbound_tx,
            last_poll_millis: AtomicU64::new(time_utils::get_current_millis()),
        });
        self.group_channel_map
            .entry(group.clone())
            .or_default()
            .insert(client_id.clone(), channel);
        outbound_rx
    }

    pub fn touch_channel(&self, group: &CheetahString, client_id: &CheetahString) {
        if let Some(channels) = self.group_channel_map.get(group) {
            if let Some(channel) = channels.get(client_id) {
                channel.touch();
            }
        }
    }

    pub fn remove_channel(&self, group: &CheetahString, client_id: &CheetahString) {
        if let Some(mut channels) = self.group_channel_map.get_mut(group) {
            channels.remove(client_id);
            if channels.is_empty() {
                drop(channels);
                self.group_channel_map
                    .remove_if(group, |_, channels| channels.is_empty());
            }
        }
    }

    fn get_channel(
        &self,
        group: &CheetahString,
        client_id: &CheetahString,
    ) -> Option<Arc<RelayChannel>> {
        self.group_channel_map
            .get(group)?
            .get(client_id)
            .cloned()
    }

    /// Uniform random pick among the group's live clients.
    fn select_channel(&self, group: &CheetahString) -> Option<Arc<RelayChannel>> {
        let channels = self.group_channel_map.get(group)?;
        let count = channels.len();
        if count == 0 {
            return None;
        }
        let picked = rand::thread_rng().gen_range(0..count);
        channels.values().nth(picked).cloned()
    }

    pub fn client_ids(&self, group: &CheetahString) -> Vec<CheetahString> {
        self.group_channel_map
            .get(group)
            .map(|channels| channels.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn next_nonce(&self) -> CheetahString {
        CheetahString::from_string(
            self.nonce_generator
                .fetch_add(1, Ordering::AcqRel)
                .to_string(),
        )
    }

    fn add_response_future(&self) -> (CheetahString, oneshot::Receiver<ProxyRelayResult>) {
        let nonce = self.next_nonce();
        let (sender, receiver) = oneshot::channel();
        self.pending_responses.insert(
            nonce.clone(),
            PendingRelayResponse {
                sender,
                create_time_millis: time_utils::get_current_millis(),
            },
        );
        (nonce, receiver)
    }

    /// Fulfil the pending reply the given nonce refers to. False when the
    /// nonce is unknown (already swept or never issued).
    pub fn complete_response(&self, nonce: &CheetahString, result: ProxyRelayResult) -> bool {
        match self.pending_responses.remove(nonce) {
            Some((_, pending)) => pending.sender.send(result).is_ok(),
            None => false,
        }
    }

    /// Push an orphan-transaction recovery command to a random client of the
    /// producer group. Resolution arrives later as an EndTransaction call,
    /// no nonce is needed.
    pub fn relay_transaction_check(
        &self,
        group: &CheetahString,
        message: crate::common::message::message_ext::MessageExt,
        transaction_id: CheetahString,
    ) -> ProxyResult<()> {
        let channel = self
            .select_channel(group)
            .ok_or_else(|| ProxyError::Internal(format!("no client for group {group}")))?;
        channel
            .outbound_tx
            .try_send(RelayCommand::RecoverOrphanedTransaction {
                message,
                transaction_id,
            })
            .map_err(|_| {
                ProxyError::Internal(format!(
                    "relay mailbox full for client {}",
                    channel.client_id
                ))
            })
    }

    /// Relay a back-request that expects an answer; the returned receiver
    /// resolves with the client's reply or the sweeper's SYSTEM_BUSY.
    pub fn relay_with_reply(
        &self,
        group: &CheetahString,
        client_id: &CheetahString,
        make_command: impl FnOnce(CheetahString) -> RelayCommand,
    ) -> ProxyResult<oneshot::Receiver<ProxyRelayResult>> {
        let channel = self.get_channel(group, client_id).ok_or_else(|| {
            ProxyError::Internal(format!("no channel for {group}/{client_id}"))
        })?;
        let (nonce, receiver) = self.add_response_future();
        if channel.outbound_tx.try_send(make_command(nonce.clone())).is_err() {
            self.pending_responses.remove(&nonce);
            return Err(ProxyError::Internal(format!(
                "relay mailbox full for client {client_id}"
            )));
        }
        Ok(receiver)
    }

    pub fn start(self: &Arc<Self>) {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.sweep_expired_responses();
                        manager.sweep_expired_channels();
                    }
                    _ = manager.shutdown_token.cancelled() => break,
                }
            }
        });
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    fn sweep_expired_responses(&self) {
        let timeout_millis = self.config.grpc_proxy_relay_request_timeout_in_seconds * 1000;
        let now = time_utils::get_current_millis();
        let expired: Vec<CheetahString> = self
            .pending_responses
            .iter()
            .filter(|entry| now.saturating_sub(entry.create_time_millis) > timeout_millis)
            .map(|entry| entry.key().clone())
            .collect();
        for nonce in expired {
            if let Some((_, pending)) = self.pending_responses.remove(&nonce) {
                warn!("relay request {} timed out, completing with SYSTEM_BUSY", nonce);
                let _ = pending
                    .sender
                    .send(ProxyRelayResult::system_busy("call remote timeout"));
            }
        }
    }

    fn sweep_expired_channels(&self) {
        let expire_seconds = self.config.grpc_client_channel_expire_seconds;
        let mut empty_groups = Vec::new();
        for mut entry in self.group_channel_map.iter_mut() {
            entry.value_mut().retain(|client_id, channel| {
                let expired = channel.idle_seconds() > expire_seconds;
                if expired {
                    info!("relay channel for client {} expired, removing", client_id);
                }
                !expired
            });
            if entry.value().is_empty() {
                empty_groups.push(entry.key().clone());
            }
        }
        for group in empty_groups {
            self.group_channel_map
                .remove_if(&group, |_, channels| channels.is_empty());
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending_responses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::message::message_ext::MessageExt;
    use crate::relay::RelayReply;
    use crate::remoting::body::ConsumerRunningInfo;
    use crate::remoting::code::ResponseCode;

    fn manager(relay_timeout_seconds: u64, channel_expire_seconds: u64) -> Arc<ChannelManager> {
        Arc::new(ChannelManager::new(Arc::new(ProxyConfig {
            grpc_proxy_relay_request_timeout_in_seconds: relay_timeout_seconds,
            grpc_client_channel_expire_seconds: channel_expire_seconds,
            ..Default::default()
        })))
    }

    #[tokio::test]
    async fn relay_with_reply_round_trip() {
        let manager = manager(5, 120);
        let group = CheetahString::from("group");
        let client_id = CheetahString::from("client-1");
        let mut mailbox = manager.create_channel(&group, &client_id);

        let receiver = manager
            .relay_with_reply(&group, &client_id, |nonce| RelayCommand::PrintThreadStackTrace {
                nonce,
            })
            .unwrap();

        let command = mailbox.recv().await.unwrap();
        let nonce = match command {
            RelayCommand::PrintThreadStackTrace { nonce } => nonce,
            other => panic!("unexpected command {other:?}"),
        };

        assert!(manager.complete_response(
            &nonce,
            ProxyRelayResult::ok(RelayReply::ConsumerRunningInfo(
                ConsumerRunningInfo::with_jstack("main: RUNNABLE"),
            )),
        ));
        let result = receiver.await.unwrap();
        assert_eq!(result.code, ResponseCode::Success.to_i32());
        assert!(result.result.is_some());
        assert_eq!(manager.pending_count(), 0);
    }

    #[tokio::test]
    async fn completing_unknown_nonce_is_false() {
        let manager = manager(5, 120);
        assert!(!manager.complete_response(
            &CheetahString::from("42"),
            ProxyRelayResult::system_busy("late"),
        ));
    }

    #[tokio::test]
    async fn sweeper_completes_stale_pending_with_system_busy() {
        let manager = manager(0, 120);
        let group = CheetahString::from("group");
        let client_id = CheetahString::from("client-1");
        let _mailbox = manager.create_channel(&group, &client_id);
        let receiver = manager
            .relay_with_reply(&group, &client_id, |nonce| RelayCommand::PrintThreadStackTrace {
                nonce,
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.sweep_expired_responses();

        let result = receiver.await.unwrap();
        assert_eq!(result.code, ResponseCode::SystemBusy.to_i32());
        assert!(result.result.is_none());
    }

    #[tokio::test]
    async fn idle_channels_are_swept() {
        let manager = manager(5, 0);
        let group = CheetahString::from("group");
        let client_id = CheetahString::from("client-1");
        let _mailbox = manager.create_channel(&group, &client_id);
        assert_eq!(manager.client_ids(&group).len(), 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        manager.sweep_expired_channels();
        assert!(manager.client_ids(&group).is_empty());
    }

    #[tokio::test]
    async fn transaction_check_reaches_some_group_member() {
        let manager = manager(5, 120);
        let group = CheetahString::from("group");
        let mut first = manager.create_channel(&group, &CheetahString::from("client-1"));
        let mut second = manager.create_channel(&group, &CheetahString::from("client-2"));

        manager
            .relay_transaction_check(&group, MessageExt::default(), CheetahString::from("tx"))
            .unwrap();

        let received = tokio::select! {
            Some(_) = first.recv() => true,
            Some(_) = second.recv() => true,
            else => false,
        };
        assert!(received);
    }

    #[tokio::test]
    async fn transaction_check_without_clients_fails() {
        let manager = manager(5, 120);
        let result = manager.relay_transaction_check(
            &CheetahString::from("group"),
            MessageExt::default(),
            CheetahString::from("tx"),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn remove_channel_drops_group_entry() {
        let manager = manager(5, 120);
        let group = CheetahString::from("group");
        let client_id = CheetahString::from("client-1");
        let _mailbox = manager.create_channel(&group, &client_id);
        manager.remove_channel(&group, &client_id);
        assert!(manager.client_ids(&group).is_empty());
    }
}
