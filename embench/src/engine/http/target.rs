use core::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use bytes::Bytes;
use http::{
    header::{self, HeaderValue},
    uri::{PathAndQuery, Scheme},
    HeaderMap, Method, Request, Uri,
};
use http_body_util::Full;

use crate::error::ConfigurationError;

/// Path of the embeddings endpoint, relative to the base URL.
pub const EMBEDDINGS_PATH: &str = "/v1/embeddings";

/// Resolved request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name or IP address, without brackets.
    host: String,
    port: u16,
    /// Value for the "Host" header.
    authority: HeaderValue,
    /// Origin-form request URI.
    path: Uri,
}

impl Target {
    /// Parses the given base URL and appends `path` to it.
    ///
    /// Only plain "http" URLs are supported.
    pub fn new(url: &str, path: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri = Uri::from_str(url).map_err(|err| invalid(&err.to_string()))?;
        match uri.scheme() {
            Some(scheme) if *scheme == Scheme::HTTP => {}
            Some(scheme) => return Err(ConfigurationError::UnsupportedScheme(scheme.to_string())),
            None => return Err(invalid("missing scheme")),
        }

        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?;
        let host = authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = authority.port_u16().unwrap_or(80);

        let mut joined = format!("{}{path}", uri.path().trim_end_matches('/'));
        if joined.is_empty() {
            joined.push('/');
        }
        if let Some(query) = uri.query() {
            joined.push('?');
            joined.push_str(query);
        }
        let path = PathAndQuery::from_str(&joined).map_err(|err| invalid(&err.to_string()))?;
        let path = Uri::from(path);

        let authority = HeaderValue::from_str(authority.as_str()).map_err(|err| invalid(&err.to_string()))?;

        let m = Self {
            host,
            port,
            authority,
            path,
        };

        Ok(m)
    }

    /// Targets the embeddings endpoint under the given base URL.
    #[inline]
    pub fn embeddings(url: &str) -> Result<Self, ConfigurationError> {
        Self::new(url, EMBEDDINGS_PATH)
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the request path, including query if any.
    #[inline]
    pub fn path(&self) -> &str {
        self.path.path_and_query().map(|v| v.as_str()).unwrap_or("/")
    }

    /// Builds a POST request with JSON body.
    ///
    /// Headers given are applied after the defaults and override them.
    pub fn request(&self, headers: &HeaderMap, body: Bytes) -> Request<Full<Bytes>> {
        let mut req = Request::new(Full::new(body));
        *req.method_mut() = Method::POST;
        *req.uri_mut() = self.path.clone();

        let h = req.headers_mut();
        h.insert(header::HOST, self.authority.clone());
        h.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            h.insert(name, value.clone());
        }

        req
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        write!(f, "http://{}{}", self.authority.to_str().unwrap_or_default(), self.path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_embeddings_path() {
        let t = Target::embeddings("http://localhost:8080").unwrap();

        assert_eq!("localhost", t.host());
        assert_eq!(8080, t.port());
        assert_eq!("/v1/embeddings", t.path());
    }

    #[test]
    fn test_base_path_and_default_port() {
        let t = Target::embeddings("http://example.com/api/").unwrap();

        assert_eq!(80, t.port());
        assert_eq!("/api/v1/embeddings", t.path());
    }

    #[test]
    fn test_root_path_with_query() {
        let t = Target::new("http://example.com/page?id=7", "").unwrap();
        assert_eq!("/page?id=7", t.path());

        let t = Target::new("http://example.com", "").unwrap();
        assert_eq!("/", t.path());
    }

    #[test]
    fn test_ipv6_host() {
        let t = Target::embeddings("http://[::1]:9000").unwrap();

        assert_eq!("::1", t.host());
        assert_eq!(9000, t.port());
    }

    #[test]
    fn test_https_rejected() {
        let err = Target::embeddings("https://example.com").unwrap_err();

        assert!(matches!(err, ConfigurationError::UnsupportedScheme(..)));
    }

    #[test]
    fn test_missing_scheme_rejected() {
        assert!(Target::embeddings("example.com:8080").is_err());
        assert!(Target::embeddings("not a url").is_err());
    }

    #[test]
    fn test_request_headers() {
        let t = Target::embeddings("http://localhost:8080").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer token"));

        let req = t.request(&headers, Bytes::from_static(b"{}"));

        assert_eq!(Method::POST, req.method());
        assert_eq!(req.uri(), "/v1/embeddings");
        assert_eq!("localhost:8080", req.headers()[header::HOST]);
        assert_eq!("application/json", req.headers()[header::CONTENT_TYPE]);
        assert_eq!("Bearer token", req.headers()[header::AUTHORIZATION]);
    }
}
