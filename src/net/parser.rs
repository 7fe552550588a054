use crate::config::config;
use crate::http::status::HttpStatus;
use crate::http::*;
use crate::net::wire::RawRequest;

const HTTP_METHOD_MAX_LEN: usize = 7;

/// Progress reported by [`Parser::feed`].
#[derive(PartialEq, Debug)]
pub enum ParserOk {
    Incomplete,
    HeadersDone,
    Done,
}

// To keep parser logic separate from HTTP status codes,
// direct http error codes are not used here but mapped later.
#[derive(PartialEq, Debug)]
pub enum ParserError {
    // 400 Bad Request
    Malformed,

    // 413 Payload Too Large
    PayloadTooLarge,

    // 414 URI Too Long
    UriTooLong,

    // 505 HTTP Version Not Supported
    HttpVersionNotSupported,
}

impl ParserError {
    pub fn into_http_status(self) -> HttpStatus {
        match self {
            ParserError::Malformed => HttpStatus::BadRequest,
            ParserError::PayloadTooLarge => HttpStatus::PayloadTooLarge,
            ParserError::UriTooLong => HttpStatus::UriTooLong,
            ParserError::HttpVersionNotSupported => HttpStatus::HttpVersionNotSupported,
        }
    }
}

#[derive(PartialEq, PartialOrd, Debug)]
enum ParserState {
    RequestLine,
    Headers,
    Body,
    Done,
}

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_path_size: usize,
    pub max_header_size: usize,
    pub max_body_size: usize,
}

impl Limits {
    pub fn from_config() -> Self {
        let cfg = config();
        Self {
            max_path_size: cfg.max_path_size,
            max_header_size: cfg.max_header_size,
            max_body_size: cfg.max_body_size,
        }
    }
}

/// Incremental HTTP/1.x request parser.
///
/// Bytes may arrive in any chunking; [`Parser::feed`] keeps what it could not
/// consume yet and resumes where it stopped.
pub struct Parser {
    buf: Vec<u8>,
    state: ParserState,
    content_length: usize,
    limits: Limits,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_limits(Limits::from_config())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            buf: Vec::new(),
            state: ParserState::RequestLine,
            content_length: 0,
            limits,
        }
    }

    fn parse_request_line(&mut self, req: &mut RawRequest) -> Result<bool, ParserError> {
        // Look for end of request line \r\n
        let Some(line_end) = find(&self.buf, b"\r\n") else {
            // METHOD SP PATH SP HTTP/x.y
            if self.buf.len() > self.limits.max_path_size + HTTP_METHOD_MAX_LEN + 11 {
                return Err(ParserError::UriTooLong);
            }
            return Ok(false);
        };

        // Request line: METHOD PATH HTTP/VERSION
        let request_line = &self.buf[..line_end];
        let parts: Vec<&[u8]> = request_line.split(|&b| b == b' ').collect();
        if parts.len() != 3 || parts[0].len() > HTTP_METHOD_MAX_LEN {
            return Err(ParserError::Malformed);
        }

        let method = std::str::from_utf8(parts[0]).unwrap_or("").to_uppercase();
        let method = match http_method_from_str(&method) {
            HttpMethod::Unknown => return Err(ParserError::Malformed),
            m => m,
        };

        let path = std::str::from_utf8(parts[1]).map_err(|_| ParserError::Malformed)?;
        if path.is_empty() {
            return Err(ParserError::Malformed);
        }
        if path.len() > self.limits.max_path_size {
            return Err(ParserError::UriTooLong);
        }

        let version = std::str::from_utf8(parts[2]).unwrap_or("");
        let (maj, min) = version
            .strip_prefix("HTTP/")
            .and_then(|v| v.split_once('.'))
            .and_then(|(maj, min)| Some((maj.parse::<u8>().ok()?, min.parse::<u8>().ok()?)))
            .ok_or(ParserError::Malformed)?;

        if !(maj == 1 && (min == 0 || min == 1)) {
            return Err(ParserError::HttpVersionNotSupported);
        }

        req.method = method;
        req.uri = path.to_string();
        req.http_version = (maj, min);

        // Successfully parsed request line
        // Update parser state and remove parsed line from buf
        self.buf.drain(..line_end + 2);
        self.state = ParserState::Headers;
        Ok(true)
    }

    fn parse_headers(&mut self, req: &mut RawRequest) -> Result<bool, ParserError> {
        // A request without headers ends right after the request line.
        let headers_end = if self.buf.starts_with(b"\r\n") {
            Some(0)
        } else {
            find(&self.buf, b"\r\n\r\n").map(|i| i + 2)
        };

        let Some(headers_end) = headers_end else {
            if self.buf.len() > self.limits.max_header_size {
                return Err(ParserError::Malformed);
            }
            return Ok(false);
        };

        if headers_end > self.limits.max_header_size {
            return Err(ParserError::Malformed);
        }

        // Parse headers line by line
        for line in self.buf[..headers_end].split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            let line = std::str::from_utf8(line).map_err(|_| ParserError::Malformed)?;
            let (name, value) = line.split_once(':').ok_or(ParserError::Malformed)?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ParserError::Malformed);
            }
            req.headers.push((name.to_string(), value.trim().to_string()));
        }

        if req.header("Host").is_none() {
            return Err(ParserError::Malformed);
        }

        self.content_length = req
            .content_length()
            .map_err(|_| ParserError::Malformed)?
            .unwrap_or(0);
        if self.content_length > self.limits.max_body_size {
            return Err(ParserError::PayloadTooLarge);
        }

        // Successfully parsed headers
        // Update parser state and remove parsed headers (and the blank line) from buf
        self.buf.drain(..headers_end + 2);
        self.state = if self.content_length == 0 {
            ParserState::Done
        } else {
            ParserState::Body
        };
        Ok(true)
    }

    fn parse_body(&mut self, req: &mut RawRequest) -> ParserOk {
        let to_copy = std::cmp::min(self.buf.len(), self.content_length - req.body.len());
        req.body.extend(self.buf.drain(..to_copy));

        if req.body.len() == self.content_length {
            self.state = ParserState::Done;
            return ParserOk::Done;
        }

        ParserOk::Incomplete
    }

    pub fn feed(&mut self, data: &[u8], req: &mut RawRequest) -> Result<ParserOk, ParserError> {
        self.buf.extend_from_slice(data);

        // Iteratively parse request based on current state while data is available
        loop {
            match self.state {
                ParserState::RequestLine => {
                    if !self.parse_request_line(req)? {
                        return Ok(ParserOk::Incomplete);
                    }
                }
                ParserState::Headers => {
                    if !self.parse_headers(req)? {
                        return Ok(ParserOk::Incomplete);
                    }
                    return Ok(ParserOk::HeadersDone);
                }
                ParserState::Body => return Ok(self.parse_body(req)),
                ParserState::Done => return Ok(ParserOk::Done),
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
