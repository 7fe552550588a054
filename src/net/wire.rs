use crate::http::HttpMethod;

/// A request as read off the socket by the local emulator, before it is
/// turned into an [`EdgeEnv`](crate::edge::EdgeEnv).
#[derive(Debug)]
pub struct RawRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub http_version: (u8, u8),

    // headers, in arrival order with their original case
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self {
            method: HttpMethod::Unknown,
            uri: String::new(),
            http_version: (0, 0),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Case-insensitive lookup of the first header with this name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Result<Option<usize>, std::num::ParseIntError> {
        self.header("Content-Length")
            .map(|v| v.trim().parse::<usize>())
            .transpose()
    }
}

impl Default for RawRequest {
    fn default() -> Self {
        Self::new()
    }
}
