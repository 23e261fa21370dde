//! Canonical request descriptor handed to the decision agent.
//!
//! # Data Flow
//! ```text
//! http::request::Parts + peer address + TLS flag
//!     → HostRequest (borrowed view, nothing copied yet)
//!     → DescriptorBuilder::build
//!         → url.rs     (scheme://host + unparsed target)
//!         → query      (verbatim copy)
//!         → method     (copy, then map through the method table)
//!         → client     (peer IP text)
//!         → cookie.rs  (merge policy over repeated Cookie lines)
//!     → RequestDescriptor (immutable, owned by one request)
//! ```
//!
//! # Design Decisions
//! - No normalization: no percent-decoding, no case-folding
//! - Every copy is charged to the request arena; the first failure aborts
//! - `path_info` is never populated

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::http::{header, request::Parts, Method};

use crate::filter::arena::{AllocationError, NulString, RequestArena};
use crate::filter::cookie::{extract_cookie, CookieMergePolicy};
use crate::filter::url::build_url;

/// HTTP method as understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Head,
    Post,
    /// Any method the agent has no dedicated code for.
    Other,
}

impl RequestMethod {
    /// Map a method name. Matching is exact; `get` is not `GET`.
    pub fn from_name(name: &[u8]) -> Self {
        match name {
            b"GET" => Self::Get,
            b"HEAD" => Self::Head,
            b"POST" => Self::Post,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Other => "OTHER",
        }
    }
}

/// Borrowed view of the host server's state for one request.
#[derive(Debug, Clone, Copy)]
pub struct HostRequest<'a> {
    parts: &'a Parts,
    peer: Option<SocketAddr>,
    is_secure: bool,
}

impl<'a> HostRequest<'a> {
    pub fn new(parts: &'a Parts, peer: Option<SocketAddr>, is_secure: bool) -> Self {
        Self {
            parts,
            peer,
            is_secure,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The request target as received: path plus query string.
    pub fn unparsed_target(&self) -> &'a str {
        self.parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn query(&self) -> &'a str {
        self.parts.uri.query().unwrap_or("")
    }

    /// Raw `Host` header value, if the client sent one.
    pub fn host(&self) -> Option<&'a [u8]> {
        self.parts.headers.get(header::HOST).map(|v| v.as_bytes())
    }

    /// Every `Cookie` header line in arrival order.
    pub fn cookie_lines(&self) -> Vec<&'a [u8]> {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .map(|v| v.as_bytes())
            .collect()
    }

    /// Peer IP address as text, empty when the transport has no peer.
    pub fn client_address(&self) -> String {
        self.peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
    }

    pub fn is_secure(&self) -> bool {
        self.is_secure
    }
}

/// What the agent evaluates for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    url: NulString,
    query: NulString,
    method: RequestMethod,
    client_address: NulString,
    cookie: Option<NulString>,
    path_info: Option<NulString>,
}

impl RequestDescriptor {
    pub fn url(&self) -> Cow<'_, str> {
        self.url.to_string_lossy()
    }

    pub fn query(&self) -> Cow<'_, str> {
        self.query.to_string_lossy()
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn client_address(&self) -> Cow<'_, str> {
        self.client_address.to_string_lossy()
    }

    pub fn cookie(&self) -> Option<Cow<'_, str>> {
        self.cookie.as_ref().map(|c| c.to_string_lossy())
    }

    /// Always `None`; reserved for agents that want extra path info.
    pub fn path_info(&self) -> Option<Cow<'_, str>> {
        self.path_info.as_ref().map(|p| p.to_string_lossy())
    }

    /// Terminated fields, for agents reached over a C boundary.
    pub fn raw_url(&self) -> &NulString {
        &self.url
    }

    pub fn raw_cookie(&self) -> Option<&NulString> {
        self.cookie.as_ref()
    }
}

/// Builds descriptors with a fixed cookie merge policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorBuilder {
    cookie_policy: CookieMergePolicy,
}

impl DescriptorBuilder {
    pub fn new(cookie_policy: CookieMergePolicy) -> Self {
        Self { cookie_policy }
    }

    /// Assemble the descriptor. Any allocation failure aborts the build.
    pub fn build(
        &self,
        request: &HostRequest<'_>,
        arena: &mut RequestArena,
    ) -> Result<RequestDescriptor, AllocationError> {
        let url = build_url(
            arena,
            request.is_secure(),
            request.host(),
            request.unparsed_target().as_bytes(),
        )?;
        let query = arena.copy("query", request.query().as_bytes())?;
        let method_name = arena.copy("method", request.method().as_str().as_bytes())?;
        let client_address = arena.copy("client address", request.client_address().as_bytes())?;
        let cookie = extract_cookie(arena, self.cookie_policy, &request.cookie_lines())?;

        let descriptor = RequestDescriptor {
            url,
            query,
            method: RequestMethod::from_name(method_name.as_bytes()),
            client_address,
            cookie,
            path_info: None,
        };

        tracing::debug!(
            url = %descriptor.url,
            query = %descriptor.query,
            method = %method_name,
            path_info = "(null)",
            client_ip = %descriptor.client_address,
            cookie = %descriptor.cookie.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "(null)".into()),
            "Request descriptor built"
        );

        Ok(descriptor)
    }
}
