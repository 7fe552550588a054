use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder};
use std::io::Write;
use tracing::warn;

use crate::edge::local::Outgoing;
use crate::error::Result;
use crate::http::request::Request;

// Algorithms the emulator can encode bodies with, as listed in MDN
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionAlgorithm {
    Gzip,
    Deflate,
}

impl CompressionAlgorithm {
    pub fn as_str(&self) -> &str {
        match self {
            CompressionAlgorithm::Gzip => "gzip",
            CompressionAlgorithm::Deflate => "deflate",
        }
    }

    /// Picks an algorithm from an `Accept-Encoding` value, preferring gzip.
    pub fn negotiate(accept_encoding: &str) -> Option<Self> {
        let offered = accept_encoding
            .split(',')
            .map(|e| e.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .collect::<Vec<_>>();

        [CompressionAlgorithm::Gzip, CompressionAlgorithm::Deflate]
            .into_iter()
            .find(|algo| offered.iter().any(|e| e == algo.as_str()))
    }
}

pub fn apply(req: &Request, res: &mut Outgoing) {
    if res.body.is_empty() || res.header("Content-Encoding").is_some() {
        return;
    }
    let Some(algo) = req
        .header("Accept-Encoding")
        .and_then(CompressionAlgorithm::negotiate)
    else {
        return;
    };

    if let Err(err) = compress_body(res, algo) {
        warn!("compression error: {}", err);
    }
}

fn compress_body(res: &mut Outgoing, algo: CompressionAlgorithm) -> Result<()> {
    res.body = match algo {
        CompressionAlgorithm::Gzip => {
            let mut e = GzEncoder::new(Vec::new(), Compression::default());
            e.write_all(&res.body)?;
            e.finish()?
        }
        CompressionAlgorithm::Deflate => {
            let mut e = DeflateEncoder::new(Vec::new(), Compression::default());
            e.write_all(&res.body)?;
            e.finish()?
        }
    };

    res.set_header("Content-Encoding", algo.as_str())
}
