use crate::config::config;
use crate::http::HttpMethod;
use crate::http::HttpVersion;
use crate::http::status::HttpStatus;
use crate::net::wire::RawRequest;

#[derive(Debug, PartialEq)]
pub enum ValidatorError {
    Error,
    HttpVersionNotSupported,
    PayloadTooLarge,
    MalformedHeaderField,
    MissingContentLength,
    BodyNotAllowed,
    MandatoryBody,
}

impl ValidatorError {
    pub fn into_http_status(self) -> HttpStatus {
        match self {
            ValidatorError::Error => HttpStatus::BadRequest,
            ValidatorError::HttpVersionNotSupported => HttpStatus::HttpVersionNotSupported,
            ValidatorError::PayloadTooLarge => HttpStatus::PayloadTooLarge,
            ValidatorError::MalformedHeaderField => HttpStatus::BadRequest,
            ValidatorError::MandatoryBody => HttpStatus::BadRequest,
            ValidatorError::BodyNotAllowed => HttpStatus::BadRequest,
            ValidatorError::MissingContentLength => HttpStatus::LengthRequired,
        }
    }
}

pub struct Validator;

impl Validator {
    fn validate_http_version(v: (u8, u8)) -> Result<(), ValidatorError> {
        match HttpVersion::from_pair(v) {
            Some(http_v) if http_v <= config().http_version => Ok(()),
            Some(_) => Err(ValidatorError::HttpVersionNotSupported),
            None => Err(ValidatorError::Error),
        }
    }

    fn validate_http_method(
        content_length: Option<usize>,
        method: &HttpMethod,
    ) -> Result<(), ValidatorError> {
        match method {
            HttpMethod::Get | HttpMethod::Head => match content_length {
                Some(n) if n > 0 => Err(ValidatorError::BodyNotAllowed),
                _ => Ok(()),
            },

            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => match content_length {
                None => Err(ValidatorError::MissingContentLength),
                Some(0) => Err(ValidatorError::MandatoryBody),
                Some(_) => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Checks a request once its headers are known, before the body is read.
    pub fn validate_request(req: &RawRequest) -> Result<(), ValidatorError> {
        Self::validate_http_version(req.http_version)?;

        let content_length = req
            .content_length()
            .map_err(|_| ValidatorError::MalformedHeaderField)?;

        Self::validate_http_method(content_length, &req.method)?;

        if content_length.is_some_and(|n| n > config().max_body_size) {
            return Err(ValidatorError::PayloadTooLarge);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn request(method: HttpMethod, headers: &[(&str, &str)]) -> RawRequest {
        let mut req = RawRequest::new();
        req.method = method;
        req.uri = "/".to_string();
        req.http_version = (1, 1);
        req.headers = headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        req
    }

    #[test]
    fn test_method_body_rules() {
        let get = request(HttpMethod::Get, &[("Host", "a")]);
        assert_eq!(Validator::validate_request(&get), Ok(()));

        let get_with_body = request(HttpMethod::Get, &[("Host", "a"), ("Content-Length", "3")]);
        assert_eq!(
            Validator::validate_request(&get_with_body),
            Err(ValidatorError::BodyNotAllowed)
        );

        let post = request(HttpMethod::Post, &[("Host", "a")]);
        assert_eq!(
            Validator::validate_request(&post),
            Err(ValidatorError::MissingContentLength)
        );

        let bad_length = request(HttpMethod::Post, &[("Host", "a"), ("Content-Length", "x")]);
        assert_eq!(
            Validator::validate_request(&bad_length).map_err(ValidatorError::into_http_status),
            Err(HttpStatus::BadRequest)
        );
    }
}
