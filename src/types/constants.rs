/// Default port the chat service listens on for direct WebSocket connections
pub const DEFAULT_CHAT_PORT: u16 = 8000;

/// Path prefix for the proxied WebSocket route
pub const WS_PATH_PREFIX: &str = "/ws/chat";

/// Path prefix for the bare (unproxied) WebSocket route
pub const BARE_PATH_PREFIX: &str = "/chat";

/// Hostname suffixes of known tunnel/proxy domains. These terminate TLS at
/// the edge and expose the chat port on the same hostname.
pub const KNOWN_TUNNEL_SUFFIXES: [&str; 2] = ["replit.dev", "replit.co"];

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Reconnect backoff base delay (milliseconds)
pub const RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Reconnect backoff delay cap (milliseconds)
pub const RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Maximum consecutive reconnect attempts before giving up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Delay before a typing indicator is automatically retracted (milliseconds)
pub const TYPING_STOP_DELAY_MS: u64 = 2_000;

/// Window inside which a server echo is matched to a pending local message
/// (milliseconds)
pub const ECHO_MATCH_WINDOW_MS: u64 = 30_000;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_GOING_AWAY: u16 = 1001;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;

/// Close codes that do not indicate a transport failure
pub fn is_normal_close(code: u16) -> bool {
    code == WS_CLOSE_NORMAL || code == WS_CLOSE_GOING_AWAY
}
