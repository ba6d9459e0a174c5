//! Stream request building
//!
//! Turns the user-facing stream operations into a resolved request: scheme,
//! host, path, method, and an ordered parameter list. GET parameters become
//! the query string; POST parameters become a form-encoded body.

use std::fmt;

use url::Url;

use crate::config::Framing;
use crate::error::Result;

/// HTTP method for a stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// A fully resolved stream request
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub scheme: String,
    /// Host, optionally with `:port`
    pub host: String,
    /// Absolute path starting with `/`
    pub path: String,
    pub method: Method,
    /// Unencoded parameters in insertion order
    pub params: Vec<(String, String)>,
    /// Framing the decoder should expect
    pub framing: Framing,
}

impl StreamRequest {
    /// Create a request with no parameters
    pub fn new(
        method: Method,
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            method,
            params: Vec::new(),
            framing: Framing::default(),
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append several parameters
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the framing
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Look up a parameter value
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// URL without query string (the OAuth base URL)
    pub fn base_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }

    /// `application/x-www-form-urlencoded` rendering of the parameters
    pub fn encoded_params(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }

    /// Full request URL; GET parameters are placed in the query string
    pub fn url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url())?;
        if self.method == Method::Get && !self.params.is_empty() {
            url.set_query(Some(&self.encoded_params()));
        }
        Ok(url)
    }

    /// Request body; only POST requests carry one
    pub fn body(&self) -> Option<String> {
        match self.method {
            Method::Post => Some(self.encoded_params()),
            Method::Get => None,
        }
    }
}

/// Filter dimensions for the `statuses/filter` stream
///
/// Each dimension is sent as one comma-joined parameter; empty dimensions
/// are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    /// Keywords to track
    pub track: Vec<String>,
    /// User ids to follow
    pub follow: Vec<u64>,
    /// Bounding boxes as `(longitude, latitude)` corner points, south-west first
    pub locations: Vec<(f64, f64)>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.track.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn follow<I>(mut self, user_ids: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        self.follow.extend(user_ids);
        self
    }

    pub fn locations<I>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        self.locations.extend(points);
        self
    }

    /// Whether no filter dimension is set
    pub fn is_empty(&self) -> bool {
        self.track.is_empty() && self.follow.is_empty() && self.locations.is_empty()
    }

    /// Normalized parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.track.is_empty() {
            params.push(("track".to_string(), self.track.join(",")));
        }
        if !self.follow.is_empty() {
            let ids: Vec<String> = self.follow.iter().map(u64::to_string).collect();
            params.push(("follow".to_string(), ids.join(",")));
        }
        if !self.locations.is_empty() {
            let coords: Vec<String> = self
                .locations
                .iter()
                .flat_map(|(lon, lat)| [lon.to_string(), lat.to_string()])
                .collect();
            params.push(("locations".to_string(), coords.join(",")));
        }
        params
    }
}

/// Extra options accepted by every stream operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamParams {
    /// Request `delimited=length` framing
    pub delimited: bool,
    /// Ask the server for stall warnings
    pub stall_warnings: bool,
    /// Pass-through parameters (e.g. `count`, `with`, `replies`)
    pub extra: Vec<(String, String)>,
}

impl StreamParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimited(mut self) -> Self {
        self.delimited = true;
        self
    }

    pub fn stall_warnings(mut self) -> Self {
        self.stall_warnings = true;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Normalized parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = self.extra.clone();
        if self.delimited {
            params.push(("delimited".to_string(), "length".to_string()));
        }
        if self.stall_warnings {
            params.push(("stall_warnings".to_string(), "true".to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_track_body_encoding() {
        let params = FilterParams::new().track(["a", "b c"]);
        let request = StreamRequest::new(Method::Post, "https", "stream.example", "/filter.json")
            .with_params(params.to_params());
        assert_eq!(request.body().as_deref(), Some("track=a%2Cb+c"));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let build = || {
            StreamRequest::new(Method::Post, "https", "h", "/p")
                .with_params(
                    FilterParams::new()
                        .track(["x", "y"])
                        .follow([1, 2])
                        .to_params(),
                )
                .body()
        };
        assert_eq!(build(), build());
        assert_eq!(build().as_deref(), Some("track=x%2Cy&follow=1%2C2"));
    }

    #[test]
    fn test_filter_omits_empty_dimensions() {
        assert!(FilterParams::new().is_empty());
        assert!(FilterParams::new().to_params().is_empty());

        let params = FilterParams::new()
            .locations([(-122.75, 36.8), (-121.75, 37.8)])
            .to_params();
        assert_eq!(
            params,
            vec![("locations".to_string(), "-122.75,36.8,-121.75,37.8".to_string())]
        );
    }

    #[test]
    fn test_get_params_go_in_query() {
        let request = StreamRequest::new(Method::Get, "https", "stream.example", "/sample.json")
            .with_param("delimited", "length");
        assert_eq!(request.body(), None);
        assert_eq!(
            request.url().unwrap().as_str(),
            "https://stream.example/sample.json?delimited=length"
        );
        assert_eq!(request.base_url(), "https://stream.example/sample.json");
    }

    #[test]
    fn test_stream_params() {
        let params = StreamParams::new()
            .param("count", "10")
            .delimited()
            .stall_warnings()
            .to_params();
        assert_eq!(
            params,
            vec![
                ("count".to_string(), "10".to_string()),
                ("delimited".to_string(), "length".to_string()),
                ("stall_warnings".to_string(), "true".to_string()),
            ]
        );
    }
}
