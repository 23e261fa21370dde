//! Reconstruction of the external URL the client asked for.
//!
//! The URL is `scheme://host` followed by the unparsed request target,
//! which already carries the leading `/` and any query string.
//!
//! Known gaps kept on purpose:
//! - a request without a Host header gets the placeholder host `none`
//! - the port is never appended, even when it is not the scheme default

use crate::filter::arena::{AllocationError, NulString, RequestArena};

/// Host used when the request carries no Host header.
pub const MISSING_HOST: &str = "none";

/// Build the full request URL inside the request arena.
///
/// The buffer is sized exactly: scheme, `://`, host, target and the
/// terminator.
pub fn build_url(
    arena: &mut RequestArena,
    is_secure: bool,
    host: Option<&[u8]>,
    raw_target: &[u8],
) -> Result<NulString, AllocationError> {
    let scheme: &[u8] = if is_secure { b"https" } else { b"http" };
    let host = host.unwrap_or(MISSING_HOST.as_bytes());

    let len = scheme.len() + 3 + host.len() + raw_target.len() + 1;
    let mut buf = arena.allocate("url", len)?;
    buf.extend_from_slice(scheme);
    buf.extend_from_slice(b"://");
    buf.extend_from_slice(host);
    buf.extend_from_slice(raw_target);
    buf.push(0);
    debug_assert_eq!(buf.len(), len);

    NulString::from_vec_with_nul(buf).ok_or(AllocationError {
        site: "url",
        requested: len,
        remaining: arena.remaining(),
    })
}
