//! Protocol Module
//!
//! Line-oriented, pipe-delimited wire protocol for client-server
//! communication. Each line is one request or one response, terminated
//! by `\n`.
//!
//! ## Requests
//! ```text
//! GET|key
//! PUT|key|value
//! DELETE|key
//! RANGE|start|end
//! BATCH|k1|v1|k2|v2|...
//! PING
//! REPLICATE|key|value
//! REPLICATE_DEL|key
//! ```
//!
//! ## Responses
//! ```text
//! OK                  success, no payload
//! OK|payload          success carrying a value, or k1=v1|k2=v2|... for RANGE
//! NOT_FOUND           GET found no live value
//! ERROR|message       the command failed
//! ```

mod command;
mod response;
mod codec;

pub use command::Command;
pub use response::{Response, Status};
pub use codec::{read_command, write_response};
