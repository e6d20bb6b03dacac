//! # Channel Transport Session
//!
//! Drives a full session through [`ChannelTransport`], with a socket-owner
//! task that answers from a [`MockPeer`](mirror_sync::MockPeer).

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_stream::StreamExt;

    use mirror_sync::{
        ChannelTransport, Command, HexAddressCodec, InMemoryLedger, JsonDecoder, MirrorClient,
        MirrorConfig, MockPeer, OutboundMessage, PeerEvent, PeerTransport, SessionStatus,
    };
    use mirror_telemetry::{init_logging, TelemetryConfig};
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, MirrorEvent};

    /// Answer outbound traffic from the scripted peer until `Close`.
    fn spawn_socket_owner(
        peer: Arc<MockPeer>,
        mut outbound: mpsc::Receiver<OutboundMessage>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = outbound.recv().await {
                match message {
                    OutboundMessage::Emit { event, payload } => peer.emit(&event, payload),
                    OutboundMessage::Request {
                        command,
                        payload,
                        reply,
                    } => {
                        let _ = reply.send(peer.request(command, payload).await);
                    }
                    OutboundMessage::Close => break,
                }
            }
        })
    }

    #[tokio::test]
    async fn test_session_over_channels() {
        let _ = init_logging(&TelemetryConfig::for_testing());

        let peer = Arc::new(MockPeer::new());
        peer.build_chain(8, 1, 1);
        let (transport, outbound) = ChannelTransport::new("peer-1", 16);
        let transport = Arc::new(transport);
        let socket = spawn_socket_owner(peer.clone(), outbound);

        let bus = Arc::new(InMemoryEventBus::new());
        let mut chain_events = bus.event_stream(EventFilter::topics(vec![EventTopic::Chain]));
        let client = Arc::new(
            MirrorClient::new(
                MirrorConfig::for_testing(),
                transport.clone(),
                Arc::new(JsonDecoder),
                Arc::new(InMemoryLedger::new()),
                Arc::new(HexAddressCodec::default()),
                bus,
            )
            .unwrap(),
        );

        let mut status = client.watch_status();
        let (events, rx) = mpsc::channel(8);
        let session = tokio::spawn(client.clone().run(rx));

        transport.set_connected(true);
        events.send(PeerEvent::Connected).await.unwrap();
        events
            .send(PeerEvent::Handshake(MockPeer::identity_bytes("PANDORA")))
            .await
            .unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| *s == SessionStatus::Synced),
        )
        .await
        .expect("session synced in time")
        .unwrap();

        assert_eq!(client.chain_summary().unwrap().tip_height, 8);
        assert!(matches!(
            chain_events.next().await,
            Some(MirrorEvent::ChainInfoUpdated(summary)) if summary.tip_height == 8
        ));
        let block = client.get_block_by_height(3).await.unwrap().unwrap();
        assert_eq!(block.hash, MockPeer::block_hash(3, 1));
        assert_eq!(peer.request_count(Command::ChainGetInfo), 1);
        assert!(peer
            .emits()
            .iter()
            .any(|(name, payload)| name == "ready!" && payload == "go!"));

        // Socket goes away: requests read as unavailable.
        transport.set_connected(false);
        events.send(PeerEvent::Disconnected).await.unwrap();
        drop(events);
        session.await.unwrap();
        assert_eq!(client.status(), SessionStatus::Offline);
        assert!(client.get_block_by_height(4).await.unwrap().is_none());

        transport.close();
        socket.await.unwrap();
    }
}
