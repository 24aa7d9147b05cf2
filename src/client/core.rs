use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{
    ChatClientBuilder, ChatClientOptions, ClientState, ConnectionManager, HeartbeatRecord,
    SessionState,
};
use crate::endpoint::{display_endpoint, EndpointContext};
use crate::infrastructure::HeartbeatMonitor;
use crate::messaging::{MessageRouter, SessionEvent, TypingChange};
use crate::types::constants::{
    is_normal_close, HEARTBEAT_INTERVAL_MS, TYPING_STOP_DELAY_MS, WS_CLOSE_ABNORMAL,
    WS_CLOSE_NORMAL,
};
use crate::types::{ChatError, ClientFrame, Result, ServerFrame};
use crate::websocket::WebSocketFactory;

/// The resilient realtime connection client.
///
/// A `ChatClient` owns at most one live session for one logical room at a
/// time. Opening a session walks an ordered list of endpoint candidates;
/// once open, a heartbeat monitor watches liveness and a reconnect watcher
/// restarts the cycle with exponential backoff after abnormal closes.
/// Everything observable flows through the [`SessionEvent`] stream returned
/// by [`subscribe`](Self::subscribe); the client renders nothing itself.
#[derive(Clone)]
pub struct ChatClient {
    pub(crate) options: ChatClientOptions,
    pub(crate) connection: Arc<ConnectionManager>,
    pub(crate) state: Arc<RwLock<ClientState>>,
}

impl ChatClient {
    /// Creates a client for the given page context. No connection is made
    /// until [`connect`](Self::connect).
    pub fn new(context: EndpointContext, options: ChatClientOptions) -> Result<Self> {
        ChatClientBuilder::new(context, options).map(|builder| builder.build())
    }

    /// Subscribes to the session event stream. May be called before
    /// connecting; multiple subscribers each get every event.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.state.write().await.subscribe()
    }

    /// Resolves the candidate list for the current room and opens a session.
    /// Returns without error if a session is already open or connecting.
    pub async fn connect(&self) -> Result<()> {
        {
            let state = self.connection.state().await;
            if state == SessionState::Open || state == SessionState::Connecting {
                return Ok(());
            }
        }
        let candidates = self.state.read().await.context.candidates()?;
        self.open(&candidates).await
    }

    /// Opens a session against an explicit candidate list, most likely to
    /// succeed first. Candidates failing at the transport level advance to
    /// the next; exhausting the list ends the cycle with
    /// [`ChatError::AllEndpointsFailed`] and leaves any retry to the
    /// reconnect policy.
    pub async fn open(&self, candidates: &[Url]) -> Result<()> {
        if candidates.is_empty() {
            return Err(ChatError::AllEndpointsFailed { attempts: 0 });
        }
        // every cycle runs under a fresh epoch: tasks and timers of the
        // previous cycle are cancelled here, and anything that still wakes
        // up under the old epoch must be a no-op
        let cycle = {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.task_manager.abort_all();
            if let Some(handle) = state.typing_stop.take() {
                handle.abort();
            }
            state.heartbeat_pending = false;
            state.heartbeat.clear();
            state.close_code = None;
            state.was_manual_disconnect = false;
            state.epoch
        };
        if self.connection.state().await == SessionState::Open {
            // only one live transport per client
            if let Err(e) = self.connection.close().await {
                tracing::debug!("closing previous transport failed: {e}");
            }
        }
        self.set_state(SessionState::Connecting).await;

        let mut attempts = 0;
        let mut opened = None;
        for url in candidates {
            attempts += 1;
            let endpoint = display_endpoint(url);
            self.emit_event(SessionEvent::Connecting {
                endpoint: endpoint.clone(),
                attempt: attempts,
            })
            .await;
            tracing::info!("connecting to {endpoint} (candidate {attempts})");

            match WebSocketFactory::create(url.as_str()).await {
                Ok(stream) => {
                    opened = Some((stream, endpoint));
                    break;
                }
                Err(e) => {
                    let unreachable = ChatError::EndpointUnreachable { endpoint };
                    tracing::warn!("{unreachable} ({e}), trying next candidate");
                    self.emit_event(SessionEvent::TransportError {
                        detail: unreachable.to_string(),
                    })
                    .await;
                }
            }
        }

        let Some((stream, endpoint)) = opened else {
            self.set_state(SessionState::Closed).await;
            return Err(ChatError::AllEndpointsFailed { attempts });
        };

        // a room switch during the handshake supersedes this cycle
        if self.current_epoch().await != cycle {
            tracing::debug!("connection cycle superseded, dropping fresh transport");
            return Ok(());
        }

        let (write_half, mut read_half) = stream.split();
        self.connection.set_writer(write_half).await;

        let router = MessageRouter::new(Arc::clone(&self.state));
        let reader = self.clone();
        {
            let mut state = self.state.write().await;
            state.task_manager.spawn(async move {
                tracing::debug!("read task started");
                while let Some(result) = read_half.next().await {
                    if reader.current_epoch().await != cycle {
                        break;
                    }
                    match result {
                        Ok(Message::Text(text)) => match ServerFrame::parse(&text) {
                            Ok(frame) => router.route(frame).await,
                            Err(e) => tracing::warn!("{e}, dropping frame"),
                        },
                        Ok(Message::Close(frame)) => {
                            let (code, reason) = match frame {
                                Some(f) => (u16::from(f.code), f.reason.to_string()),
                                None => (WS_CLOSE_ABNORMAL, String::new()),
                            };
                            reader.end_session(cycle, code, reason).await;
                            break;
                        }
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                        Ok(other) => tracing::debug!("ignoring non-text frame: {other:?}"),
                        Err(e) => {
                            reader
                                .emit_event(SessionEvent::TransportError {
                                    detail: e.to_string(),
                                })
                                .await;
                            reader
                                .end_session(cycle, WS_CLOSE_ABNORMAL, "transport error".into())
                                .await;
                            break;
                        }
                    }
                }
                // stream ended without a close frame: silent death
                reader
                    .end_session(cycle, WS_CLOSE_ABNORMAL, "connection lost".into())
                    .await;
                tracing::debug!("read task finished");
            });
        }

        let interval = self
            .options
            .heartbeat_interval
            .unwrap_or(HEARTBEAT_INTERVAL_MS);
        HeartbeatMonitor::new(
            Arc::downgrade(&self.connection),
            Arc::clone(&self.state),
            cycle,
        )
        .with_interval(Duration::from_millis(interval))
        .spawn()
        .await;

        self.set_state(SessionState::Open).await;
        self.emit_event(SessionEvent::Open { endpoint, attempts }).await;
        tracing::info!("session open after {attempts} candidate(s)");
        Ok(())
    }

    /// Sends a chat message and returns the local correlation id for the
    /// optimistic entry. Fails with [`ChatError::NotConnected`] unless the
    /// session is open; the message is not queued.
    pub async fn send_message(&self, text: &str, product_id: Option<i64>) -> Result<u64> {
        // register the echo before transmitting; a fast server broadcast
        // must never outrun the pending entry
        let local_id = self
            .state
            .write()
            .await
            .reconciler
            .note_outgoing(text, product_id);

        let frame = ClientFrame::ChatMessage {
            message: text.to_string(),
            product_id,
        };
        if let Err(e) = self.connection.send_frame(&frame).await {
            self.state.write().await.reconciler.forget(local_id);
            return Err(e);
        }
        Ok(local_id)
    }

    /// Announces that the local user is typing and schedules the automatic
    /// stop indicator. Each call replaces the previous pending stop, so a
    /// stream of keystrokes produces one stop two seconds after the last.
    pub async fn begin_typing(&self) -> Result<()> {
        let user_name = self.state.read().await.user.name.clone();
        self.connection
            .send_frame(&ClientFrame::TypingIndicator {
                is_typing: true,
                user_name: user_name.clone(),
            })
            .await?;

        let cycle = self.current_epoch().await;
        let stopper = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(TYPING_STOP_DELAY_MS)).await;
            if stopper.current_epoch().await != cycle || !stopper.is_connected().await {
                return;
            }
            let frame = ClientFrame::TypingIndicator {
                is_typing: false,
                user_name,
            };
            if let Err(e) = stopper.connection.send_frame(&frame).await {
                tracing::debug!("typing stop not sent: {e}");
            }
        });

        let mut state = self.state.write().await;
        if let Some(previous) = state.typing_stop.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Moves the client to another room: closes the current session first
    /// (only one live session per user context), invalidates every timer the
    /// old session owned, rebuilds the candidate list, and connects.
    pub async fn switch_room(&self, room: impl Into<String>) -> Result<()> {
        let room = room.into();
        tracing::info!("switching to room {room}");
        {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.context.room = room;
            state.task_manager.abort_all();
            if let Some(handle) = state.typing_stop.take() {
                handle.abort();
            }
            state.heartbeat_pending = false;
            state.heartbeat.clear();
            state.close_code = None;
            state.typing.reset();
            state.reconciler.clear();
            // the old room's close must not schedule a retry
            state.was_manual_disconnect = true;
        }
        if let Err(e) = self.connection.close().await {
            tracing::debug!("closing previous session failed: {e}");
        }
        self.connect().await
    }

    /// Closes the session. Afterwards no further events are delivered, the
    /// transport is released, and no automatic reconnect happens; call
    /// [`connect`](Self::connect) to start over.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let state = self.connection.state().await;
            if state == SessionState::Closed || state == SessionState::Idle {
                // the watcher may still have a retry scheduled for the last
                // abnormal close; the flag cancels it
                self.set_manual_disconnect(true).await;
                return Ok(());
            }
        }
        tracing::info!("disconnecting");
        self.set_manual_disconnect(true).await;
        {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
            if let Some(handle) = state.typing_stop.take() {
                handle.abort();
            }
            state.heartbeat_pending = false;
            state.heartbeat.clear();
            state.close_code = Some(WS_CLOSE_NORMAL);
            state.typing.reset();
            state.reconciler.clear();
        }
        self.connection.close().await?;
        {
            let mut state = self.state.write().await;
            state.emit(SessionEvent::Closed {
                code: WS_CLOSE_NORMAL,
                reason: "client disconnect".to_string(),
            });
            state.notify_state_change(SessionState::Closed);
        }
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    pub async fn session_state(&self) -> SessionState {
        self.connection.state().await
    }

    /// Room the client currently targets
    pub async fn room(&self) -> String {
        self.state.read().await.context.room.clone()
    }

    /// Liveness diagnostics for the current session
    pub async fn heartbeat_record(&self) -> HeartbeatRecord {
        self.state.read().await.heartbeat
    }

    pub(crate) async fn current_epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    pub(crate) async fn manual_disconnect_requested(&self) -> bool {
        self.state.read().await.was_manual_disconnect
    }

    pub(crate) async fn last_close_was_normal(&self) -> bool {
        self.state
            .read()
            .await
            .close_code
            .is_some_and(is_normal_close)
    }

    pub(crate) async fn emit_event(&self, event: SessionEvent) {
        self.state.write().await.emit(event);
    }

    /// Winds one session down after the transport ended. Safe to reach from
    /// several paths: it is a no-op once the epoch moved on or the session
    /// is already closed.
    async fn end_session(&self, cycle: u64, code: u16, reason: String) {
        if self.current_epoch().await != cycle {
            return;
        }
        if self.connection.state().await == SessionState::Closed {
            return;
        }
        tracing::warn!("session ended: code={code} reason={reason:?}");
        {
            let mut state = self.state.write().await;
            state.close_code = Some(code);
            state.heartbeat_pending = false;
            state.heartbeat.clear();
            if let Some(TypingChange::Hidden { user_name }) = state.typing.reset() {
                state.emit(SessionEvent::TypingChanged {
                    user_name,
                    is_typing: false,
                });
            }
            state.emit(SessionEvent::Closed { code, reason });
        }
        if let Err(e) = self.connection.close().await {
            tracing::debug!("transport release failed: {e}");
        }
        self.set_state(SessionState::Closed).await;
    }

    async fn set_state(&self, new_state: SessionState) {
        self.connection.set_state(new_state).await;
        self.state.read().await.notify_state_change(new_state);
    }

    async fn set_manual_disconnect(&self, manual: bool) {
        let mut state = self.state.write().await;
        state.was_manual_disconnect = manual;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{UserIdentity, UserRole};
    use futures::SinkExt;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    const WAIT: Duration = Duration::from_secs(5);

    /// One well-behaved service connection: welcomes, acks heartbeats,
    /// echoes chat messages back as user 42.
    async fn serve_chat_connection(stream: tokio::net::TcpStream) {
        let Ok(mut ws) = accept_async(stream).await else {
            return;
        };
        let welcome = r#"{"type":"connection_established","message":"ok"}"#;
        let _ = ws.send(Message::Text(welcome.into())).await;
        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let value: serde_json::Value =
                serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
            match value["type"].as_str() {
                Some("heartbeat") => {
                    let ack = r#"{"type":"heartbeat_ack"}"#;
                    let _ = ws.send(Message::Text(ack.into())).await;
                }
                Some("chat_message") => {
                    let reply = serde_json::json!({
                        "type": "chat_message",
                        "id": 1,
                        "message": value["message"],
                        "user_id": 42,
                        "user_name": "Budi",
                        "created_at": chrono::Utc::now().to_rfc3339(),
                    });
                    let _ = ws.send(Message::Text(reply.to_string().into())).await;
                }
                _ => {}
            }
        }
    }

    /// In-process stand-in for the chat service.
    async fn spawn_chat_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_chat_connection(stream));
            }
        });
        port
    }

    /// First connection is dropped right after the handshake, without a
    /// close frame; later connections are served normally.
    async fn spawn_flaky_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut served = 0u32;
            while let Ok((stream, _)) = listener.accept().await {
                served += 1;
                if served == 1 {
                    tokio::spawn(async move {
                        let _ = accept_async(stream).await;
                    });
                } else {
                    tokio::spawn(serve_chat_connection(stream));
                }
            }
        });
        port
    }

    /// First connection never acknowledges heartbeats and is severed once a
    /// replacement arrives; later connections are served normally.
    async fn spawn_silent_then_healthy_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let severed = std::sync::Arc::new(tokio::sync::Notify::new());
        tokio::spawn(async move {
            let mut served = 0u32;
            while let Ok((stream, _)) = listener.accept().await {
                served += 1;
                let severed = std::sync::Arc::clone(&severed);
                if served == 1 {
                    tokio::spawn(async move {
                        let Ok(mut ws) = accept_async(stream).await else {
                            return;
                        };
                        let welcome = r#"{"type":"connection_established"}"#;
                        let _ = ws.send(Message::Text(welcome.into())).await;
                        loop {
                            tokio::select! {
                                _ = severed.notified() => break,
                                frame = ws.next() => {
                                    // swallow frames without acknowledging
                                    if frame.is_none() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                } else {
                    severed.notify_waiters();
                    tokio::spawn(serve_chat_connection(stream));
                }
            }
        });
        port
    }

    /// Port with nothing listening on it
    async fn dead_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn candidate(port: u16) -> Url {
        Url::parse(&format!("ws://127.0.0.1:{port}/ws/chat/user_42/?token=tok")).unwrap()
    }

    fn test_client() -> ChatClient {
        let user = UserIdentity {
            id: 42,
            name: "Budi".to_string(),
            email: None,
            role: UserRole::Buyer,
        };
        let context = EndpointContext::new(false, "127.0.0.1", "user_42", "tok");
        let mut options = ChatClientOptions::new(user);
        options.heartbeat_interval = Some(50);
        options.reconnect_base_delay = Some(200);
        options.max_reconnect_attempts = Some(2);
        ChatClient::new(context, options).unwrap()
    }

    /// Client whose resolver candidates point at a local test server, so the
    /// watcher's automatic reconnects land on it too.
    fn resolver_client(port: u16, reconnect_base_delay: u64) -> ChatClient {
        let user = UserIdentity {
            id: 42,
            name: "Budi".to_string(),
            email: None,
            role: UserRole::Buyer,
        };
        let context =
            EndpointContext::new(false, "127.0.0.1", "user_42", "tok").with_chat_port(port);
        let mut options = ChatClientOptions::new(user);
        options.heartbeat_interval = Some(50);
        options.reconnect_base_delay = Some(reconnect_base_delay);
        options.max_reconnect_attempts = Some(3);
        ChatClient::new(context, options).unwrap()
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        timeout(WAIT, rx.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_fallback_connects_on_third_candidate() {
        let live = spawn_chat_server().await;
        let candidates = vec![
            candidate(dead_port().await),
            candidate(dead_port().await),
            candidate(live),
        ];

        let client = test_client();
        let mut rx = client.subscribe().await;
        client.open(&candidates).await.unwrap();

        assert_eq!(client.session_state().await, SessionState::Open);

        let mut attempts_seen = 0;
        loop {
            match next_event(&mut rx).await {
                SessionEvent::Connecting { attempt, .. } => attempts_seen = attempt,
                SessionEvent::Open { endpoint, attempts } => {
                    assert_eq!(attempts, 3);
                    assert!(endpoint.contains(&live.to_string()));
                    break;
                }
                // the server welcome may land before the open event
                SessionEvent::Established { .. } => {}
                SessionEvent::TransportError { .. } => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(attempts_seen, 3);
    }

    #[tokio::test]
    async fn test_exhausted_candidates_end_the_cycle() {
        let candidates = vec![candidate(dead_port().await), candidate(dead_port().await)];

        let client = test_client();
        let mut rx = client.subscribe().await;
        let result = client.open(&candidates).await;

        assert!(matches!(
            result,
            Err(ChatError::AllEndpointsFailed { attempts: 2 })
        ));
        assert_eq!(client.session_state().await, SessionState::Closed);

        // each failed candidate is reported on the event stream too
        let mut unreachable = 0;
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::TransportError { detail } = event {
                assert!(detail.contains("endpoint unreachable"));
                unreachable += 1;
            }
        }
        assert_eq!(unreachable, 2);
    }

    #[tokio::test]
    async fn test_send_while_not_open_fails_without_queueing() {
        let client = test_client();
        client.connection.set_state(SessionState::Connecting).await;

        let result = client.send_message("hi", None).await;
        assert!(matches!(result, Err(ChatError::NotConnected)));
        // nothing registered for reconciliation either
        assert_eq!(client.state.read().await.reconciler.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_echo_is_confirmed_against_local_id() {
        let live = spawn_chat_server().await;
        let client = test_client();
        let mut rx = client.subscribe().await;
        client.open(&[candidate(live)]).await.unwrap();

        let local_id = client.send_message("halo", None).await.unwrap();

        let confirmed = timeout(WAIT, async {
            loop {
                if let SessionEvent::MessageConfirmed {
                    local_id: confirmed,
                    message,
                } = next_event(&mut rx).await
                {
                    return (confirmed, message);
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(confirmed.0, local_id);
        assert_eq!(confirmed.1.message, "halo");
    }

    #[tokio::test]
    async fn test_heartbeat_ack_is_recorded() {
        let live = spawn_chat_server().await;
        let client = test_client();
        client.open(&[candidate(live)]).await.unwrap();

        timeout(WAIT, async {
            loop {
                let record = client.heartbeat_record().await;
                if record.last_sent.is_some() && record.last_ack.is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();
        assert!(!client.state.read().await.heartbeat_pending);
    }

    #[tokio::test]
    async fn test_no_events_after_disconnect() {
        let live = spawn_chat_server().await;
        let client = test_client();
        let mut rx = client.subscribe().await;
        client.open(&[candidate(live)]).await.unwrap();

        client.disconnect().await.unwrap();
        assert_eq!(client.session_state().await, SessionState::Closed);

        // drain up to the Closed event, then silence
        timeout(WAIT, async {
            loop {
                if let SessionEvent::Closed { code, .. } = next_event(&mut rx).await {
                    assert_eq!(code, WS_CLOSE_NORMAL);
                    break;
                }
            }
        })
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());

        // heartbeat diagnostics are gone with the session
        let record = client.heartbeat_record().await;
        assert!(record.last_sent.is_none() && record.last_ack.is_none());
    }

    #[tokio::test]
    async fn test_manual_disconnect_does_not_reconnect() {
        let live = spawn_chat_server().await;
        let client = test_client();
        client.open(&[candidate(live)]).await.unwrap();

        client.disconnect().await.unwrap();
        // reconnect base delay is 10ms; give the watcher ample room
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(client.session_state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_stale_cycle_timer_is_a_noop() {
        let live = spawn_chat_server().await;
        let client = test_client();
        client.open(&[candidate(live)]).await.unwrap();
        let old_cycle = client.current_epoch().await;

        // a room switch bumps the epoch; anything scheduled under the old
        // cycle must do nothing
        client.state.write().await.epoch += 1;
        client.end_session(old_cycle, WS_CLOSE_ABNORMAL, "late".into()).await;

        assert_eq!(client.session_state().await, SessionState::Open);
    }

    #[tokio::test]
    async fn test_abnormal_close_reopens_with_backoff() {
        let port = spawn_flaky_server().await;
        let client = resolver_client(port, 10);
        let mut rx = client.subscribe().await;
        client.connect().await.unwrap();

        // the first transport dies without a close frame; the watcher must
        // bring the session back on its own
        timeout(WAIT, async {
            let mut saw_abnormal_close = false;
            loop {
                match next_event(&mut rx).await {
                    SessionEvent::Closed { code, .. } => {
                        assert_ne!(code, WS_CLOSE_NORMAL);
                        saw_abnormal_close = true;
                    }
                    SessionEvent::Open { .. } if saw_abnormal_close => break,
                    _ => {}
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(client.session_state().await, SessionState::Open);
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_cancels_scheduled_retry() {
        let client = resolver_client(dead_port().await, 200);
        let mut rx = client.subscribe().await;
        assert!(client.connect().await.is_err());
        assert_eq!(client.session_state().await, SessionState::Closed);

        // the watcher has a retry pending; disconnecting while already
        // closed must still cancel it
        client.disconnect().await.unwrap();
        while rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(client.session_state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_heartbeat_timeout_replacement_is_not_torn_down() {
        let port = spawn_silent_then_healthy_server().await;
        let client = resolver_client(port, 10);
        let mut rx = client.subscribe().await;
        client.connect().await.unwrap();

        // the unacknowledged heartbeat force-closes the first session and
        // the watcher opens a replacement
        timeout(WAIT, async {
            let mut forced_close = false;
            loop {
                match next_event(&mut rx).await {
                    SessionEvent::Closed { code, .. } => {
                        assert_eq!(code, WS_CLOSE_ABNORMAL);
                        forced_close = true;
                    }
                    SessionEvent::Open { .. } if forced_close => break,
                    _ => {}
                }
            }
        })
        .await
        .unwrap();

        // the severed first transport dying afterwards must not disturb
        // the replacement session
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(client.session_state().await, SessionState::Open);
        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, SessionEvent::Closed { .. }),
                "replacement session closed: {event:?}"
            );
        }
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_client_releases_state() {
        let client = test_client();
        let state = Arc::downgrade(&client.state);

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.upgrade().is_none());
    }
}
