use std::fs;
use std::io::ErrorKind::*;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::config;
use crate::edge::ResponseChannel;
use crate::error::Result;
use crate::handler::responses;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::HttpStatus;

/// Serves `req.path` from `origin`, or from the configured root when the
/// platform did not publish a static origin.
pub fn serve<C: ResponseChannel>(
    origin: Option<&str>,
    req: &Request,
    res: &mut Response<C>,
) -> Result<()> {
    let root = origin.unwrap_or(&config().static_files_root);
    let Some(full_path) = sanitize_path(root, &req.path) else {
        return responses::error_page(res, HttpStatus::Forbidden);
    };
    debug!("serving static file: {}", full_path.display());

    let bytes = match fs::read(&full_path) {
        Ok(bytes) => bytes,
        Err(err) => {
            let status = match err.kind() {
                NotFound | IsADirectory => HttpStatus::NotFound,
                PermissionDenied => HttpStatus::Forbidden,
                _ => HttpStatus::InternalServerError,
            };
            return responses::error_page(res, status);
        }
    };

    // The edge delivers text bodies; binary assets come from the CDN origin.
    let body = match String::from_utf8(bytes) {
        Ok(body) => body,
        Err(_) => {
            warn!("refusing to serve binary file {}", full_path.display());
            return responses::error_page(res, HttpStatus::UnsupportedMediaType);
        }
    };

    let mime = guess_mime(&req.path);
    if mime == "text/html" {
        return responses::render_html(req, res, body);
    }

    res.set("Content-Type", mime)?;
    res.send(Some(body))
}

/// Joins the request path under `root`, refusing anything that would escape it.
fn sanitize_path(root: &str, path: &str) -> Option<PathBuf> {
    let mut full_path = PathBuf::from(root);
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => full_path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(full_path)
}

fn guess_mime(path: &str) -> &str {
    match path.rsplit('.').next() {
        Some("htm") | Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("svg") => "image/svg+xml",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
