//! Collapsing repeated `Cookie` header lines into one value.
//!
//! # Policies
//! - `LastWins` (default): every line is copied, the last copy is kept.
//!   Lines are not merged; a request split over several `Cookie` headers
//!   only exposes its final line to the agent.
//! - `Join`: lines are concatenated with `"; "` as RFC 6265 requires for
//!   HTTP/2 cookie crumbs. Opt-in only.

use serde::{Deserialize, Serialize};

use crate::filter::arena::{AllocationError, NulString, RequestArena};

/// How multiple `Cookie` header lines are reduced to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieMergePolicy {
    #[default]
    LastWins,
    Join,
}

/// Extract the cookie value handed to the agent.
///
/// Zero lines yields `None`; absence of cookies is not an error.
pub fn extract_cookie(
    arena: &mut RequestArena,
    policy: CookieMergePolicy,
    lines: &[&[u8]],
) -> Result<Option<NulString>, AllocationError> {
    match (lines, policy) {
        ([], _) => Ok(None),
        ([line], _) => arena.copy("cookie", line).map(Some),
        (_, CookieMergePolicy::LastWins) => {
            let mut cookie = None;
            for line in lines {
                cookie = Some(arena.copy("cookie", line)?);
            }
            Ok(cookie)
        }
        (_, CookieMergePolicy::Join) => join(arena, lines).map(Some),
    }
}

fn join(arena: &mut RequestArena, lines: &[&[u8]]) -> Result<NulString, AllocationError> {
    let content: usize = lines.iter().map(|l| l.len()).sum();
    let len = content + 2 * (lines.len() - 1) + 1;
    let mut buf = arena.allocate("cookie", len)?;
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            buf.extend_from_slice(b"; ");
        }
        buf.extend_from_slice(line);
    }
    buf.push(0);

    NulString::from_vec_with_nul(buf).ok_or(AllocationError {
        site: "cookie",
        requested: len,
        remaining: arena.remaining(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(policy: CookieMergePolicy, lines: &[&str]) -> Option<String> {
        let mut arena = RequestArena::with_capacity(1024);
        let lines: Vec<&[u8]> = lines.iter().map(|l| l.as_bytes()).collect();
        extract_cookie(&mut arena, policy, &lines)
            .unwrap()
            .map(|c| c.to_string())
    }

    #[test]
    fn test_no_cookie() {
        assert_eq!(extract(CookieMergePolicy::LastWins, &[]), None);
        assert_eq!(extract(CookieMergePolicy::Join, &[]), None);
    }

    #[test]
    fn test_single_line_unchanged() {
        assert_eq!(
            extract(CookieMergePolicy::LastWins, &["a=1; b=2"]),
            Some("a=1; b=2".to_string())
        );
        assert_eq!(
            extract(CookieMergePolicy::Join, &["a=1; b=2"]),
            Some("a=1; b=2".to_string())
        );
    }

    #[test]
    fn test_last_line_wins() {
        assert_eq!(
            extract(CookieMergePolicy::LastWins, &["a=1", "b=2", "c=3"]),
            Some("c=3".to_string())
        );
    }

    #[test]
    fn test_last_wins_copies_every_line() {
        let mut arena = RequestArena::with_capacity(1024);
        let lines: [&[u8]; 2] = [b"a=1", b"b=22"];
        extract_cookie(&mut arena, CookieMergePolicy::LastWins, &lines).unwrap();
        assert_eq!(arena.used(), 4 + 5);
    }

    #[test]
    fn test_join_policy() {
        assert_eq!(
            extract(CookieMergePolicy::Join, &["a=1", "b=2", "c=3"]),
            Some("a=1; b=2; c=3".to_string())
        );
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let mut arena = RequestArena::with_capacity(6);
        let lines: [&[u8]; 2] = [b"a=1", b"b=2"];
        let err = extract_cookie(&mut arena, CookieMergePolicy::LastWins, &lines).unwrap_err();
        assert_eq!(err.site, "cookie");
    }

    #[test]
    fn test_policy_from_config_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: CookieMergePolicy,
        }
        let parsed: Wrapper = toml::from_str("policy = \"join\"").unwrap();
        assert_eq!(parsed.policy, CookieMergePolicy::Join);
        let parsed: Wrapper = toml::from_str("policy = \"last_wins\"").unwrap();
        assert_eq!(parsed.policy, CookieMergePolicy::LastWins);
    }
}
