//! Request Context
//!
//! Host-neutral view of one inbound request: the signals the classifier
//! reads plus what telemetry reports. Hosts build it from their own request
//! type (see the edge server middleware).

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    pub scheme: String,
    /// Authority; falls back to the `Host` header when empty
    pub host: String,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: String,
    /// Inbound headers in arrival order, names as received
    pub headers: Vec<(String, String)>,
    /// Socket peer address
    pub remote_addr: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("GET", "/")
    }
}

impl RequestContext {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            scheme: "http".to_string(),
            host: String::new(),
            path: path.to_string(),
            query: String::new(),
            headers: Vec::new(),
            remote_addr: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.trim_start_matches('?').to_string();
        self
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }

    /// First header with this name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    pub fn referrer(&self) -> &str {
        self.header("referer").unwrap_or("")
    }

    /// `X-Forwarded-For` first hop, then `Client-IP`, then the socket address
    pub fn client_ip(&self) -> String {
        let forwarded = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        if let Some(ip) = self.header("client-ip").map(str::trim).filter(|ip| !ip.is_empty()) {
            return ip.to_string();
        }

        self.remote_addr.clone().unwrap_or_default()
    }

    /// Path plus query, as the request line carried it
    pub fn request_uri(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    pub fn url(&self) -> String {
        let host = if self.host.is_empty() {
            self.header("host").unwrap_or("")
        } else {
            self.host.as_str()
        };
        format!("{}://{}{}", self.scheme, host, self.request_uri())
    }

    /// Headers keyed by `Title-Case` name; repeated headers are comma-joined
    pub fn telemetry_headers(&self) -> BTreeMap<String, String> {
        let mut out: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &self.headers {
            out.entry(normalize_header_name(name))
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }
        out
    }
}

/// `x-forwarded-for` / `X_FORWARDED_FOR` -> `X-Forwarded-For`
pub fn normalize_header_name(name: &str) -> String {
    name.split(|c| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
