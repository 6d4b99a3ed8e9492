//! TCP Client
//!
//! Thin synchronous client for the line protocol, grounded in
//! `network::connection::Connection`'s buffered-stream handling, mirrored
//! for the outbound side. Used by `atlaskv-cli` and by the clustering
//! layer's replication fan-out.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{AtlasError, Result};
use crate::protocol::{Response, Status};

/// A connection to one AtlasKV server.
pub struct Client {
    reader: BufReader<TcpStream>,
    stream: TcpStream,
}

impl Client {
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| AtlasError::Network(format!("failed to connect to {addr}: {e}")))?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { reader, stream })
    }

    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<Response> {
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()?;

        let mut response_line = String::new();
        let bytes_read = self.reader.read_line(&mut response_line)?;
        if bytes_read == 0 {
            return Err(AtlasError::Network("server closed the connection".into()));
        }

        parse_response(response_line.trim_end_matches(['\r', '\n']))
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = self.send_line(&format!("GET|{}", encode(key)))?;
        match response.status {
            Status::Ok => Ok(response.payload),
            Status::NotFound => Ok(None),
            Status::Error => Err(protocol_error(response)),
        }
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        let response = self.send_line(&format!("PUT|{}|{}", encode(key), encode(value)))?;
        self.as_bool(response)
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let response = self.send_line(&format!("DELETE|{}", encode(key)))?;
        self.as_bool(response)
    }

    pub fn ping(&mut self) -> Result<bool> {
        let response = self.send_line("PING")?;
        Ok(response.status == Status::Ok)
    }

    /// Used by the clustering layer: fire a replication line and ignore
    /// the response status (callers treat replication as best-effort).
    pub fn replicate_put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.send_line(&format!("REPLICATE|{}|{}", encode(key), encode(value)))?;
        Ok(())
    }

    pub fn replicate_delete(&mut self, key: &[u8]) -> Result<()> {
        self.send_line(&format!("REPLICATE_DEL|{}", encode(key)))?;
        Ok(())
    }

    fn as_bool(&self, response: Response) -> Result<bool> {
        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            Status::Error => Err(protocol_error(response)),
        }
    }
}

fn encode(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn protocol_error(response: Response) -> AtlasError {
    let message = response.payload.as_deref().map(String::from_utf8_lossy).unwrap_or_default();
    AtlasError::Protocol(message.into_owned())
}

fn parse_response(line: &str) -> Result<Response> {
    if line == "NOT_FOUND" {
        return Ok(Response::not_found());
    }
    if let Some(rest) = line.strip_prefix("ERROR|") {
        return Ok(Response::error(rest));
    }
    if line == "ERROR" {
        return Ok(Response::error(""));
    }
    if let Some(rest) = line.strip_prefix("OK|") {
        return Ok(Response::ok(Some(rest.as_bytes().to_vec())));
    }
    if line == "OK" {
        return Ok(Response::ok(None));
    }
    Err(AtlasError::Protocol(format!("unrecognized response line: {line}")))
}
