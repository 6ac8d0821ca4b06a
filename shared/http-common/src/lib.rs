//! Shared HTTP utilities for the Kunde/Verein workspace.
//!
//! Framework-agnostic helpers used by the api-server: problem-detail bodies,
//! request/base URI resolution behind proxies, and the id path check.

use tracing::debug;

// ============================================================================
// Problem Details
// ============================================================================

/// Path prefix of every problem `type` URI.
pub const PROBLEM_PATH: &str = "/problem/";

/// Content type of problem-detail responses.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Kinds of problems reported to REST clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    BadRequest,
    NotFound,
    Constraints,
    Unprocessable,
    Internal,
}

impl ProblemType {
    /// Value appended to [`PROBLEM_PATH`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::BadRequest => "badRequest",
            ProblemType::NotFound => "notFound",
            ProblemType::Constraints => "constraints",
            ProblemType::Unprocessable => "unprocessable",
            ProblemType::Internal => "internal",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ProblemType::BadRequest => 400,
            ProblemType::NotFound => 404,
            ProblemType::Constraints | ProblemType::Unprocessable => 422,
            ProblemType::Internal => 500,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ProblemType::BadRequest => "Bad Request",
            ProblemType::NotFound => "Not Found",
            ProblemType::Constraints | ProblemType::Unprocessable => "Unprocessable Entity",
            ProblemType::Internal => "Internal Server Error",
        }
    }
}

/// Build a problem-detail body.
///
/// Returns: `{"type": "/problem/<type>", "title", "status", "detail", "instance"}`
pub fn problem_json(problem: ProblemType, detail: &str, instance: &str) -> serde_json::Value {
    serde_json::json!({
        "type": format!("{}{}", PROBLEM_PATH, problem.as_str()),
        "title": problem.title(),
        "status": problem.status(),
        "detail": detail,
        "instance": instance,
    })
}

// ============================================================================
// URI Resolution
// ============================================================================

/// The parts of an incoming request needed to rebuild its public URI.
///
/// Header fields hold the raw values of `host`, `x-envoy-original-path`,
/// `x-forwarded-host`, `x-forwarded-proto` and `x-forwarded-prefix`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParts<'a> {
    /// Path as seen by this server, without the query.
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub host: Option<&'a str>,
    pub envoy_original_path: Option<&'a str>,
    pub forwarded_host: Option<&'a str>,
    pub forwarded_proto: Option<&'a str>,
    pub forwarded_prefix: Option<&'a str>,
}

impl RequestParts<'_> {
    fn proto(&self) -> &str {
        self.forwarded_proto.unwrap_or("http")
    }

    /// `proto://host` or an empty string when no host is known, so that the
    /// resulting URIs degrade to absolute paths.
    fn origin(&self, host: Option<&str>) -> String {
        match host {
            Some(host) if !host.is_empty() => format!("{}://{}", self.proto(), host),
            _ => String::new(),
        }
    }
}

/// URI of the request as the client sent it, including the query.
pub fn request_uri(parts: &RequestParts<'_>) -> String {
    if let Some(original) = parts.envoy_original_path {
        return format!("{}{}", parts.origin(parts.host), original);
    }
    let mut uri = match parts.forwarded_host {
        Some(fwd) => format!(
            "{}{}{}",
            parts.origin(Some(fwd)),
            parts.forwarded_prefix.unwrap_or(""),
            parts.path
        ),
        None => format!("{}{}", parts.origin(parts.host), parts.path),
    };
    if let Some(q) = parts.query.filter(|q| !q.is_empty()) {
        uri.push('?');
        uri.push_str(q);
    }
    uri
}

/// URI of the collection the request targets: no query, no trailing slash,
/// and without a trailing `/<id>` segment when `id` is given.
pub fn base_uri(parts: &RequestParts<'_>, id: Option<&str>) -> String {
    let base = match (parts.envoy_original_path, parts.forwarded_host) {
        (Some(original), _) => {
            let path = original.split_once('?').map_or(original, |(p, _)| p);
            format!("{}{}", parts.origin(parts.host), path)
        }
        (None, Some(fwd)) => format!(
            "{}{}{}",
            parts.origin(Some(fwd)),
            parts.forwarded_prefix.unwrap_or(""),
            parts.path
        ),
        (None, None) => format!("{}{}", parts.origin(parts.host), parts.path),
    };

    let mut base = base.trim_end_matches('/').to_string();
    if let Some(id) = id {
        let suffix = format!("/{}", id);
        if base.ends_with(&suffix) {
            base.truncate(base.len() - suffix.len());
        }
    }
    debug!(%base, "base uri");
    base
}

/// URI of a single resource below `base`.
pub fn location(base: &str, id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Whether `s` has the textual shape of a UUID (8-4-4-4-12 hex digits,
/// either case).
pub fn is_id_pattern(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(p, len)| p.len() == len && p.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "00000000-0000-0000-0000-000000000001";

    #[test]
    fn test_problem_json() {
        let p = problem_json(ProblemType::Constraints, "email: Email bad", "http://h/vereine");
        assert_eq!(
            p,
            serde_json::json!({
                "type": "/problem/constraints",
                "title": "Unprocessable Entity",
                "status": 422,
                "detail": "email: Email bad",
                "instance": "http://h/vereine"
            })
        );
        assert_eq!(ProblemType::NotFound.status(), 404);
        assert_eq!(ProblemType::BadRequest.as_str(), "badRequest");
    }

    #[test]
    fn test_request_uri_plain() {
        let parts = RequestParts {
            path: "/kunden",
            query: Some("nachname=Alpha"),
            host: Some("localhost:8080"),
            ..Default::default()
        };
        assert_eq!(request_uri(&parts), "http://localhost:8080/kunden?nachname=Alpha");

        let no_host = RequestParts {
            path: "/kunden",
            ..Default::default()
        };
        assert_eq!(request_uri(&no_host), "/kunden");
    }

    #[test]
    fn test_request_uri_envoy() {
        let parts = RequestParts {
            path: "/vereine/x",
            host: Some("localhost"),
            forwarded_proto: Some("https"),
            envoy_original_path: Some("/api/vereine/x?a=b"),
            ..Default::default()
        };
        assert_eq!(request_uri(&parts), "https://localhost/api/vereine/x?a=b");
    }

    #[test]
    fn test_base_uri_strips_query_slash_and_id() {
        let parts = RequestParts {
            path: &format!("/vereine/{}/", ID),
            host: Some("localhost:8080"),
            ..Default::default()
        };
        assert_eq!(base_uri(&parts, Some(ID)), "http://localhost:8080/vereine");
        assert_eq!(
            base_uri(&parts, None),
            format!("http://localhost:8080/vereine/{}", ID)
        );

        let envoy = RequestParts {
            path: "/vereine",
            host: Some("localhost"),
            forwarded_proto: Some("https"),
            envoy_original_path: Some("/api/vereine/?x=1"),
            ..Default::default()
        };
        assert_eq!(base_uri(&envoy, None), "https://localhost/api/vereine");
    }

    #[test]
    fn test_base_uri_forwarded() {
        let parts = RequestParts {
            path: "/vereine",
            host: Some("internal:8080"),
            forwarded_host: Some("kubernetes.docker.internal"),
            forwarded_proto: Some("https"),
            forwarded_prefix: Some("/gateway"),
            ..Default::default()
        };
        assert_eq!(
            base_uri(&parts, None),
            "https://kubernetes.docker.internal/gateway/vereine"
        );
    }

    #[test]
    fn test_location() {
        assert_eq!(location("/vereine", ID), format!("/vereine/{}", ID));
        assert_eq!(location("http://h/vereine/", "1"), "http://h/vereine/1");
    }

    #[test]
    fn test_is_id_pattern() {
        assert!(is_id_pattern(ID));
        assert!(is_id_pattern("ABCDEF00-0000-0000-0000-0000000000aa"));
        assert!(!is_id_pattern("0000000-0000-0000-0000-000000000001"));
        assert!(!is_id_pattern("zzzzzzzz-0000-0000-0000-000000000001"));
        assert!(!is_id_pattern("not-an-id"));
    }
}
