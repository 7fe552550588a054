//! Local emulator of the edge runtime.
//!
//! This module is responsible only for networking concerns:
//! - accepting TCP connections,
//! - reading raw bytes from the network,
//! - writing raw bytes back to the client.
//!
//! Turning the bytes into an edge environment, running the adapter and
//! rendering (or AMP-sanitizing) the page is delegated to
//! [`handler::handle_request`](crate::handler::handle_request).
//!
//! ## Request handling flow
//!
//! 1. Accept a TCP connection
//! 2. Read raw data from the stream, bounded by the configured read timeout
//! 3. Incrementally parse the data into a [`RawRequest`]
//!    (delegated to [`Parser`])
//! 4. Validate the request once its headers are known
//!    (delegated to [`Validator`])
//! 5. Produce an [`Outgoing`] response through the adapter
//! 6. Serialize and write the response back to the client
//!
//! Errors at any stage result in an HTTP error response.

use async_std::io;
use async_std::net::{TcpListener, TcpStream};
use async_std::prelude::*;
use async_std::task;
use tracing::{debug, warn};

use crate::config::config;
use crate::edge::local::Outgoing;
use crate::handler;
use crate::net::parser::*;
use crate::net::validator::{Validator, ValidatorError};
use crate::net::wire::RawRequest;

pub struct Server;

/// Errors that can occur while reading and parsing an HTTP request from the stream
/// used to interrupt the flow and return appropriate responses.
enum ReadError {
    Io(std::io::Error),
    ConnectionClosed,
    Parser(ParserError),
    Validator(ValidatorError),
}

impl Server {
    /// Binds to the configured address and port and serves forever,
    /// spawning one task per client.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind((config().address, config().port)).await?;
        config().log_info();

        while let Ok((stream, addr)) = listener.accept().await {
            debug!("accepted connection from {}", addr);
            task::spawn(async move {
                if let Err(err) = Self::handle_client(stream).await {
                    warn!("error while handling {}: {}", addr, err);
                }
            });
        }

        Ok(())
    }

    /// Reads and incrementally parses an HTTP request from the TCP stream.
    ///
    /// Once all headers are read the request is validated; the body, if any,
    /// is read afterwards.
    async fn read_request(stream: &mut TcpStream) -> Result<RawRequest, ReadError> {
        let mut parser = Parser::new();
        let mut req = RawRequest::new();
        let mut buffer = vec![0; config().buffer_size];

        loop {
            let n = match io::timeout(config().read_timeout, stream.read(&mut buffer)).await {
                Ok(0) => return Err(ReadError::ConnectionClosed),
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::Io(e)),
            };

            match parser.feed(&buffer[..n], &mut req).map_err(ReadError::Parser)? {
                // The parser needs more data to make progress.
                ParserOk::Incomplete => continue,
                ParserOk::HeadersDone => {
                    // Validate the request early, before reading the body.
                    Validator::validate_request(&req).map_err(ReadError::Validator)?;

                    // Body bytes may already be buffered.
                    if parser.feed(&[], &mut req).map_err(ReadError::Parser)? == ParserOk::Done {
                        break;
                    }
                }
                ParserOk::Done => break, // request is fully parsed
            }
        }

        Ok(req)
    }

    /// Writes the given response back to the TCP stream.
    async fn write_response(stream: &mut TcpStream, mut response: Outgoing) -> std::io::Result<()> {
        let bytes = response
            .to_bytes(&config().server_name)
            .map_err(std::io::Error::other)?;
        io::timeout(config().write_timeout, async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        })
        .await
    }

    /// Handles a single client connection.
    /// Reads the HTTP request, processes it via the handler, and writes back the response.
    async fn handle_client(mut stream: TcpStream) -> std::io::Result<()> {
        let response = match Self::read_request(&mut stream).await {
            Ok(r) => handler::handle_request(&r),
            Err(ReadError::Io(err)) => {
                warn!("I/O error while reading request: {:?}", err);
                return Ok(());
            }
            Err(ReadError::ConnectionClosed) => return Ok(()),
            Err(ReadError::Parser(err)) => handler::handle_error(err.into_http_status()),
            Err(ReadError::Validator(err)) => handler::handle_error(err.into_http_status()),
        };

        Self::write_response(&mut stream, response).await
    }
}
