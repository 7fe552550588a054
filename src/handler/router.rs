use crate::edge::{EdgeEnv, ResponseChannel};
use crate::error::Result;
use crate::handler::responses;
use crate::handler::static_files;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::HttpStatus;

pub fn route<C: ResponseChannel>(
    env: &EdgeEnv,
    req: &Request,
    res: &mut Response<C>,
) -> Result<()> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/") => responses::welcome(req, res),

        ("GET", _) => static_files::serve(env.static_origin_path.as_deref(), req, res),
        _ => responses::error_page(res, HttpStatus::MethodNotAllowed),
    }
}
