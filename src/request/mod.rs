//! URL decomposition and construction of the raw request bytes sent by every
//! worker.

use http::uri::Authority;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

pub const PROGRAM_VERSION: &str = "1.5";

/// Longest URL accepted on the command line.
pub const URL_THRESHOLD: usize = 1500;
const MAX_HOSTNAME_LEN: usize = 64;
const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("{0}: is not a valid URL.")]
    NotAUrl(String),
    #[error("URL is too long.")]
    UrlTooLong,
    #[error("Only HTTP protocol is directly supported, set --proxy for others.")]
    UnsupportedScheme,
    #[error("Invalid URL syntax - hostname don't ends with '/'.")]
    MissingSlash,
    #[error("Invalid URL host `{0}`.")]
    InvalidHost(String),
    #[error("Invalid port in URL host `{0}`.")]
    InvalidPort(String),
    #[error("Hostname `{0}` is too long.")]
    HostTooLong(String),
    #[error("Error in option --proxy {0}: Missing hostname.")]
    ProxyMissingHost(String),
    #[error("Error in option --proxy {0}: Port number is missing.")]
    ProxyMissingPort(String),
    #[error("Error in option --proxy {0}: Invalid port number.")]
    ProxyInvalidPort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum HttpVersion {
    #[serde(rename = "0.9")]
    Http09,
    #[serde(rename = "1.0")]
    Http10,
    #[serde(rename = "1.1")]
    Http11,
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpVersion::Http09 => f.write_str("HTTP/0.9"),
            HttpVersion::Http10 => f.write_str("HTTP/1.0"),
            HttpVersion::Http11 => f.write_str("HTTP/1.1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Head,
    Options,
    Trace,
}

impl Method {
    pub fn as_http(&self) -> http::Method {
        match self {
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Trace => http::Method::TRACE,
        }
    }

    /// Lowest protocol version able to carry this method.
    fn min_version(&self) -> HttpVersion {
        match self {
            Method::Get => HttpVersion::Http09,
            Method::Head => HttpVersion::Http10,
            Method::Options | Method::Trace => HttpVersion::Http11,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_http().as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
}

impl Proxy {
    /// Splits `host:port` at the last colon. A value without any colon is
    /// not a proxy specification and yields `None`.
    pub fn parse(spec: &str) -> Result<Option<Self>, RequestError> {
        let Some(idx) = spec.rfind(':') else {
            return Ok(None);
        };
        if idx == 0 {
            return Err(RequestError::ProxyMissingHost(spec.to_string()));
        }
        let port = &spec[idx + 1..];
        if port.is_empty() {
            return Err(RequestError::ProxyMissingPort(spec.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| RequestError::ProxyInvalidPort(spec.to_string()))?;

        let host = spec[..idx].trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(RequestError::ProxyMissingHost(spec.to_string()));
        }

        Ok(Some(Self {
            host: host.to_string(),
            port,
        }))
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A fully framed request together with the endpoint it must be sent to.
#[derive(Debug, Clone)]
pub struct Request {
    pub host: String,
    pub port: u16,
    pub method: Method,
    pub version: HttpVersion,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    version: HttpVersion,
    reload: bool,
    proxy: Option<Proxy>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::Get,
            version: HttpVersion::Http10,
            reload: false,
            proxy: None,
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    pub fn proxy(mut self, proxy: Option<Proxy>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Protocol version actually used once method and caching requirements
    /// are taken into account.
    pub fn effective_version(&self) -> HttpVersion {
        let mut version = self.version.max(self.method.min_version());
        if self.reload && self.proxy.is_some() {
            version = version.max(HttpVersion::Http10);
        }
        version
    }

    pub fn build(&self, url: &str) -> Result<Request, RequestError> {
        let Some(scheme_end) = url.find("://") else {
            return Err(RequestError::NotAUrl(url.to_string()));
        };
        if url.len() > URL_THRESHOLD {
            return Err(RequestError::UrlTooLong);
        }
        if self.proxy.is_none() && !url[..scheme_end].eq_ignore_ascii_case("http") {
            return Err(RequestError::UnsupportedScheme);
        }

        let rest = &url[scheme_end + 3..];
        let Some(slash) = rest.find('/') else {
            return Err(RequestError::MissingSlash);
        };
        let authority = &rest[..slash];
        let path = &rest[slash..];

        let version = self.effective_version();
        let (host, port, target, host_header) = match &self.proxy {
            Some(proxy) => (proxy.host.clone(), proxy.port, url, None),
            None => {
                let parsed = split_authority(authority)?;
                (parsed.host, parsed.port, path, Some(parsed.header))
            }
        };

        let mut head = format!("{} {}", self.method, target);
        if version > HttpVersion::Http09 {
            head.push(' ');
            head.push_str(&version.to_string());
        }
        head.push_str("\r\n");

        if version > HttpVersion::Http09 {
            head.push_str(&format!("User-Agent: WebBench {}\r\n", PROGRAM_VERSION));
            if let Some(name) = &host_header {
                head.push_str(&format!("Host: {}\r\n", name));
            }
        }
        if self.reload && self.proxy.is_some() {
            head.push_str("Pragma: no-cache\r\n");
        }
        if version > HttpVersion::Http10 {
            head.push_str("Connection: close\r\n");
        }
        if version > HttpVersion::Http09 {
            head.push_str("\r\n");
        }

        Ok(Request {
            host,
            port,
            method: self.method,
            version,
            payload: head.into_bytes(),
        })
    }
}

struct SplitAuthority {
    host: String,
    // Host header value: the name as written, brackets kept, port dropped.
    header: String,
    port: u16,
}

/// Separates an optional `:port` suffix, ignoring colons inside an IPv6
/// literal. An empty or zero port means the default.
fn split_port(authority: &str) -> Result<(&str, u16), RequestError> {
    let host_start = authority.rfind('@').map_or(0, |i| i + 1);
    let port_search = authority.rfind(']').map_or(host_start, |i| i + 1);
    let Some(colon) = authority[port_search..].rfind(':').map(|i| port_search + i) else {
        return Ok((authority, DEFAULT_PORT));
    };

    let port = match &authority[colon + 1..] {
        "" => DEFAULT_PORT,
        digits => match digits.parse::<u16>() {
            Ok(0) => DEFAULT_PORT,
            Ok(port) => port,
            Err(_) => return Err(RequestError::InvalidPort(authority.to_string())),
        },
    };
    Ok((&authority[..colon], port))
}

fn split_authority(authority: &str) -> Result<SplitAuthority, RequestError> {
    let (host_part, port) = split_port(authority)?;
    let parsed: Authority = host_part
        .parse()
        .map_err(|_| RequestError::InvalidHost(authority.to_string()))?;

    let header = parsed.host();
    let host = header.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(RequestError::InvalidHost(authority.to_string()));
    }
    if host.len() >= MAX_HOSTNAME_LEN {
        return Err(RequestError::HostTooLong(host.to_string()));
    }

    Ok(SplitAuthority {
        host: host.to_string(),
        header: header.to_string(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(req: &Request) -> String {
        String::from_utf8(req.payload.clone()).unwrap()
    }

    #[test]
    fn builds_http10_get_by_default() {
        let req = RequestBuilder::new().build("http://example.com/index.html").unwrap();
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 80);
        assert_eq!(
            text(&req),
            "GET /index.html HTTP/1.0\r\nUser-Agent: WebBench 1.5\r\nHost: example.com\r\n\r\n"
        );
    }

    #[test]
    fn http11_adds_connection_close() {
        let req = RequestBuilder::new()
            .version(HttpVersion::Http11)
            .build("http://localhost:8080/")
            .unwrap();
        assert_eq!(req.port, 8080);
        assert_eq!(
            text(&req),
            "GET / HTTP/1.1\r\nUser-Agent: WebBench 1.5\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn http09_is_a_bare_request_line() {
        let req = RequestBuilder::new()
            .version(HttpVersion::Http09)
            .build("http://10.0.0.1/a")
            .unwrap();
        assert_eq!(req.version, HttpVersion::Http09);
        assert_eq!(text(&req), "GET /a\r\n");
    }

    #[test]
    fn methods_raise_the_protocol_version() {
        let head = RequestBuilder::new()
            .method(Method::Head)
            .version(HttpVersion::Http09);
        assert_eq!(head.effective_version(), HttpVersion::Http10);

        let options = RequestBuilder::new().method(Method::Options);
        assert_eq!(options.effective_version(), HttpVersion::Http11);

        let trace = RequestBuilder::new().method(Method::Trace);
        let req = trace.build("http://example.com/").unwrap();
        assert!(text(&req).starts_with("TRACE / HTTP/1.1\r\n"));
    }

    #[test]
    fn reload_through_proxy_sends_absolute_url() {
        let proxy = Proxy::parse("cache.local:3128").unwrap();
        let builder = RequestBuilder::new()
            .version(HttpVersion::Http09)
            .reload(true)
            .proxy(proxy);
        assert_eq!(builder.effective_version(), HttpVersion::Http10);

        let req = builder.build("ftp://example.com/file").unwrap();
        assert_eq!(req.host, "cache.local");
        assert_eq!(req.port, 3128);
        assert_eq!(
            text(&req),
            "GET ftp://example.com/file HTTP/1.0\r\nUser-Agent: WebBench 1.5\r\nPragma: no-cache\r\n\r\n"
        );
    }

    #[test]
    fn zero_port_falls_back_to_default() {
        let req = RequestBuilder::new().build("http://example.com:0/").unwrap();
        assert_eq!(req.port, 80);
    }

    #[test]
    fn empty_port_falls_back_to_default() {
        let req = RequestBuilder::new().build("http://example.com:/").unwrap();
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 80);
    }

    #[test]
    fn ipv6_literal_host() {
        let req = RequestBuilder::new().build("http://[::1]:9000/").unwrap();
        assert_eq!(req.host, "::1");
        assert_eq!(req.port, 9000);
    }

    #[test]
    fn rejects_malformed_urls() {
        let builder = RequestBuilder::new();
        assert_eq!(
            builder.build("example.com/").unwrap_err(),
            RequestError::NotAUrl("example.com/".into())
        );
        assert_eq!(
            builder.build("https://example.com/").unwrap_err(),
            RequestError::UnsupportedScheme
        );
        assert_eq!(
            builder.build("http://example.com").unwrap_err(),
            RequestError::MissingSlash
        );
        let long = format!("http://example.com/{}", "a".repeat(URL_THRESHOLD));
        assert_eq!(builder.build(&long).unwrap_err(), RequestError::UrlTooLong);
        assert_eq!(
            builder.build("http://host:abc/").unwrap_err(),
            RequestError::InvalidPort("host:abc".into())
        );
        assert_eq!(
            builder.build("http://host:99999/").unwrap_err(),
            RequestError::InvalidPort("host:99999".into())
        );
        let host = "h".repeat(MAX_HOSTNAME_LEN);
        assert!(matches!(
            builder.build(&format!("http://{}/", host)),
            Err(RequestError::HostTooLong(_))
        ));
    }

    #[test]
    fn proxy_spec_parsing() {
        assert_eq!(Proxy::parse("noport").unwrap(), None);
        assert_eq!(
            Proxy::parse(":8080").unwrap_err(),
            RequestError::ProxyMissingHost(":8080".into())
        );
        assert_eq!(
            Proxy::parse("host:").unwrap_err(),
            RequestError::ProxyMissingPort("host:".into())
        );
        assert_eq!(
            Proxy::parse("host:8080").unwrap(),
            Some(Proxy {
                host: "host".into(),
                port: 8080
            })
        );
        let v6 = Proxy::parse("[::1]:3128").unwrap().unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.port, 3128);
        assert_eq!(v6.to_string(), "[::1]:3128");
    }
}
