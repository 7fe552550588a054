use crate::amp::sanitize_amp_html;
use crate::config::config;
use crate::edge::ResponseChannel;
use crate::error::Result;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::HttpStatus;

/// Whether the request asked for AMP markup.
pub fn amp_requested(req: &Request) -> bool {
    req.query.get(config().amp_query_param.as_str()).is_some()
}

/// Sends an HTML page, rewritten for AMP when the request asks for it.
pub fn render_html<C: ResponseChannel>(
    req: &Request,
    res: &mut Response<C>,
    body: String,
) -> Result<()> {
    let body = if amp_requested(req) {
        sanitize_amp_html(&body)?
    } else {
        body
    };

    res.set("Content-Type", "text/html; charset=utf-8")?;
    res.send(Some(body))
}

pub fn welcome<C: ResponseChannel>(req: &Request, res: &mut Response<C>) -> Result<()> {
    let body = format!(
        "<!doctype html><html><head><title>{0}</title></head><body><h1>Welcome to {0}!</h1></body></html>",
        config().server_name
    );
    res.status(HttpStatus::Ok.code(), HttpStatus::Ok.reason());
    render_html(req, res, body)
}

pub fn error_page<C: ResponseChannel>(res: &mut Response<C>, status: HttpStatus) -> Result<()> {
    let body = format!("<h1>{} {}</h1>", status.code(), status.reason());

    res.status(status.code(), status.reason());
    res.set("Content-Type", "text/html")?;
    res.send(Some(body))
}
