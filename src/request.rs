use std::collections::HashMap;
use std::net::SocketAddr;

/// Case-insensitive header store that preserves the verbatim key of
/// whichever write last touched a given header name, so a duplicate header
/// retains the last write without silently lower-casing every key on the
/// way in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderMap(Vec<(String, String)>);

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self
            .0
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            *existing = (key, value);
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Enriched, immutable-after-parse request. `method`, `path`, `query`, and
/// `headers` are set by the acceptor when it parses the wire request;
/// `params` is filled in by the router at lookup time; `decoded_body` is
/// left empty by the core and is only ever populated by an external
/// body-decoding middleware.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: crate::http::Method,
    pub(crate) path: String,
    pub(crate) query: HashMap<String, String>,
    pub(crate) headers: HeaderMap,
    pub(crate) params: HashMap<String, String>,
    pub(crate) raw_body: Vec<u8>,
    pub(crate) decoded_body: Option<serde_json::Value>,
    pub(crate) client_address: Option<SocketAddr>,
}

impl Request {
    pub fn new(method: crate::http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            params: HashMap::new(),
            raw_body: Vec::new(),
            decoded_body: None,
            client_address: None,
        }
    }

    pub fn method(&self) -> crate::http::Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Mapping lookup; an absent parameter name returns `""` as an
    /// explicit "missing" sentinel.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn get_query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn get_raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// The decoded body, if some earlier middleware in the chain populated
    /// it. Core middleware never assumes this is `Some`.
    pub fn get_body(&self) -> Option<&serde_json::Value> {
        self.decoded_body.as_ref()
    }

    pub fn set_decoded_body(&mut self, value: serde_json::Value) {
        self.decoded_body = Some(value);
    }

    pub fn client_address(&self) -> Option<SocketAddr> {
        self.client_address
    }
}

/// Parses `a=1&b=2` query strings. Malformed pairs (no `=`, or more than
/// one `=`) are dropped rather than causing the whole parse to fail.
pub fn parse_query_string(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for term in raw.split('&').filter(|t| !t.is_empty()) {
        let mut parts = term.splitn(3, '=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                out.insert(key.to_string(), value.to_string());
            }
            _ => continue,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn duplicate_header_retains_last_write() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Trace", "first");
        headers.insert("x-trace", "second");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-Trace"), Some("second"));
    }

    #[test]
    fn missing_param_returns_empty_string_sentinel() {
        let req = Request::new(Method::Get, "/x");
        assert_eq!(req.param("missing"), "");
    }

    #[test]
    fn query_string_drops_malformed_pairs() {
        let q = parse_query_string("a=1&bad&b=2&c=3=4");
        assert_eq!(q.get("a").map(String::as_str), Some("1"));
        assert_eq!(q.get("b").map(String::as_str), Some("2"));
        assert!(q.get("bad").is_none());
        assert!(q.get("c").is_none());
    }
}
