//! Protocol codec
//!
//! Reads and writes single lines of the pipe-delimited wire protocol
//! over any buffered reader/writer.

use std::io::{BufRead, Write};

use crate::error::{AtlasError, Result};

use super::{Command, Response, Status};

/// Read one command line and parse it. Returns `Err(AtlasError::Io)` with
/// `UnexpectedEof` kind if the stream is closed before a full line
/// arrives.
pub fn read_command<R: BufRead>(reader: &mut R) -> Result<Command> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line)?;
    if bytes_read == 0 {
        return Err(AtlasError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed",
        )));
    }

    parse_command(line.trim_end_matches(['\r', '\n']))
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split('|');
    let verb = parts.next().unwrap_or("");

    match verb {
        "GET" => {
            let key = next_field(&mut parts, "GET")?;
            Ok(Command::Get { key: key.into_bytes() })
        }
        "PUT" => {
            let key = next_field(&mut parts, "PUT")?;
            let value = next_field(&mut parts, "PUT")?;
            Ok(Command::Put { key: key.into_bytes(), value: value.into_bytes() })
        }
        "DELETE" => {
            let key = next_field(&mut parts, "DELETE")?;
            Ok(Command::Delete { key: key.into_bytes() })
        }
        "RANGE" => {
            let start = next_field(&mut parts, "RANGE")?;
            let end = next_field(&mut parts, "RANGE")?;
            Ok(Command::Range { start: start.into_bytes(), end: end.into_bytes() })
        }
        "BATCH" => {
            let fields: Vec<&str> = parts.collect();
            if fields.is_empty() || fields.len() % 2 != 0 {
                return Err(AtlasError::Protocol("BATCH requires an even number of key/value fields".into()));
            }
            let mut keys = Vec::with_capacity(fields.len() / 2);
            let mut values = Vec::with_capacity(fields.len() / 2);
            for pair in fields.chunks(2) {
                keys.push(pair[0].as_bytes().to_vec());
                values.push(pair[1].as_bytes().to_vec());
            }
            Ok(Command::BatchPut { keys, values })
        }
        "PING" => Ok(Command::Ping),
        "REPLICATE" => {
            let key = next_field(&mut parts, "REPLICATE")?;
            let value = next_field(&mut parts, "REPLICATE")?;
            Ok(Command::Replicate { key: key.into_bytes(), value: value.into_bytes() })
        }
        "REPLICATE_DEL" => {
            let key = next_field(&mut parts, "REPLICATE_DEL")?;
            Ok(Command::ReplicateDelete { key: key.into_bytes() })
        }
        other => Err(AtlasError::Protocol(format!("unknown command verb: {other}"))),
    }
}

fn next_field<'a>(parts: &mut std::str::Split<'a, char>, verb: &str) -> Result<String> {
    parts
        .next()
        .map(|s| s.to_string())
        .ok_or_else(|| AtlasError::Protocol(format!("{verb} is missing a required field")))
}

/// Write one response line, terminated with `\n`, and flush.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let line = encode_response(response);
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn encode_response(response: &Response) -> String {
    match response.status {
        Status::NotFound => "NOT_FOUND".to_string(),
        Status::Error => {
            let message = response.payload.as_deref().map(String::from_utf8_lossy).unwrap_or_default();
            format!("ERROR|{message}")
        }
        Status::Ok => match &response.payload {
            Some(payload) => format!("OK|{}", String::from_utf8_lossy(payload)),
            None => "OK".to_string(),
        },
    }
}
