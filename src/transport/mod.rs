// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transport to the engine's REST API.
//!
//! - [`HttpTransport`]: `reqwest` client with failover, retry and circuit breaking
//! - [`ScriptedTransport`]: records requests and replays canned responses (tests)

pub mod http;
pub mod scripted;
pub mod traits;

pub use http::HttpTransport;
pub use scripted::ScriptedTransport;
pub use traits::{EngineRequest, EngineResponse, Method, RequestBody, Transport, TransportError};

/// Percent-encode a single path segment (index name, document id, template name).
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Join and percent-encode path segments into an absolute path.
pub fn path(segments: &[&str]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        // Commas separate index lists and stay literal
        let encoded: Vec<String> = segment.split(',').map(encode_segment).collect();
        out.push_str(&encoded.join(","));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_encoding() {
        assert_eq!(path(&["books", "_doc", "a/b c"]), "/books/_doc/a%2Fb%20c");
        assert_eq!(path(&["books,authors", "_search"]), "/books,authors/_search");
        assert_eq!(path(&["_alias", "current"]), "/_alias/current");
    }
}
