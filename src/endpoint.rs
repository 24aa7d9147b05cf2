//! Builds the ordered list of endpoint candidates for one connection cycle.
//!
//! The chat service may be reachable on a dedicated port, behind a
//! path-routing proxy, or only on loopback during local development. The
//! resolver is a pure function of the page context: it performs no I/O and
//! the returned list is immutable for the cycle that consumes it.

use url::Url;

use crate::types::constants::{
    BARE_PATH_PREFIX, DEFAULT_CHAT_PORT, KNOWN_TUNNEL_SUFFIXES, WS_PATH_PREFIX,
};
use crate::types::Result;

/// Page context the resolver derives candidates from.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointContext {
    /// Whether the surrounding page is served over HTTPS
    pub secure: bool,
    /// Hostname of the surrounding page
    pub hostname: String,
    /// Logical room to connect to
    pub room: String,
    /// Auth token, passed as a query parameter
    pub token: String,
    /// Port the direct and loopback candidates dial
    pub chat_port: u16,
}

impl EndpointContext {
    pub fn new(
        secure: bool,
        hostname: impl Into<String>,
        room: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            secure,
            hostname: hostname.into(),
            room: room.into(),
            token: token.into(),
            chat_port: DEFAULT_CHAT_PORT,
        }
    }

    /// Overrides the direct-connection port, mainly for local development.
    pub fn with_chat_port(mut self, port: u16) -> Self {
        self.chat_port = port;
        self
    }

    /// Whether the page is served through a known tunnel/proxy domain.
    /// Tunnels terminate TLS at the edge, so candidates must use `wss` and
    /// loopback fallbacks are pointless.
    pub fn is_tunnel_host(&self) -> bool {
        KNOWN_TUNNEL_SUFFIXES
            .iter()
            .any(|suffix| self.hostname.ends_with(suffix))
    }

    /// Ordered, non-empty, deduplicated candidate URIs for one connection
    /// cycle, most likely to succeed first:
    ///
    /// 1. direct same-host custom port
    /// 2. path-proxied route on the page origin
    /// 3. bare path route on the page origin
    /// 4. loopback addresses (local development only)
    pub fn candidates(&self) -> Result<Vec<Url>> {
        let tunnel = self.is_tunnel_host();
        let scheme = if self.secure || tunnel { "wss" } else { "ws" };
        let host = &self.hostname;
        let port = self.chat_port;
        let proxied = format!("{WS_PATH_PREFIX}/{}/", self.room);
        let bare = format!("{BARE_PATH_PREFIX}/{}/", self.room);

        let mut raw = vec![
            format!("{scheme}://{host}:{port}{proxied}"),
            format!("{scheme}://{host}{proxied}"),
            format!("{scheme}://{host}{bare}"),
        ];
        if !tunnel {
            raw.push(format!("ws://127.0.0.1:{port}{proxied}"));
            raw.push(format!("ws://localhost:{port}{proxied}"));
        }
        raw.dedup();

        let mut urls = Vec::with_capacity(raw.len());
        for candidate in raw {
            let mut url = Url::parse(&candidate)?;
            if urls.iter().any(|u: &Url| u.as_str() == url.as_str()) {
                continue;
            }
            url.query_pairs_mut().append_pair("token", &self.token);
            urls.push(url);
        }
        Ok(urls)
    }
}

/// Endpoint rendered for logs and events, with the token query stripped.
pub fn display_endpoint(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}
