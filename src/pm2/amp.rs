//! # AMP framing used by the PM2 publish socket.
//!
//! PM2 broadcasts its bus over an axon pub/sub socket. Every message is an
//! "amp" frame:
//!
//! ```text
//! ┌──────────────┬────────────┬─────────┬────────────┬─────────┬───
//! │ ver<<4 | argc│ len (u32be)│ payload │ len (u32be)│ payload │ ...
//! └──────────────┴────────────┴─────────┴────────────┴─────────┴───
//!     1 byte        4 bytes     len        4 bytes     len
//! ```
//!
//! Payload prefixes: `j:` JSON, `s:` UTF-8 string, anything else raw bytes.
//! A bus message is `[s:<topic>, j:<data>]`.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::BridgeError;

/// Only protocol version emitted by axon.
pub const AMP_VERSION: u8 = 1;

/// Frames larger than this are rejected (the stream is then unusable).
pub const DEFAULT_MAX_ARG_LEN: usize = 8 * 1024 * 1024;

const HEADER_LEN: usize = 1;
const LEN_PREFIX: usize = 4;
#[cfg(test)]
const MAX_ARGS: usize = 15;

/// One decoded argument.
#[derive(Debug, Clone, PartialEq)]
pub enum AmpArg {
    Json(serde_json::Value),
    Text(String),
    Blob(Bytes),
}

impl AmpArg {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AmpArg::Text(s) => Some(s),
            _ => None,
        }
    }

    fn parse(payload: Bytes) -> Result<Self, BridgeError> {
        match payload.get(..2) {
            Some(b"j:") => serde_json::from_slice(&payload[2..])
                .map(AmpArg::Json)
                .map_err(|e| BridgeError::decode(format!("json argument: {e}"))),
            Some(b"s:") => String::from_utf8(payload[2..].to_vec())
                .map(AmpArg::Text)
                .map_err(|e| BridgeError::decode(format!("string argument: {e}"))),
            _ => Ok(AmpArg::Blob(payload)),
        }
    }

    #[cfg(test)]
    fn encoded(&self) -> Result<Vec<u8>, BridgeError> {
        Ok(match self {
            AmpArg::Json(v) => {
                let mut out = b"j:".to_vec();
                serde_json::to_writer(&mut out, v)
                    .map_err(|e| BridgeError::decode(format!("json argument: {e}")))?;
                out
            }
            AmpArg::Text(s) => [b"s:".as_slice(), s.as_bytes()].concat(),
            AmpArg::Blob(b) => b.to_vec(),
        })
    }
}

/// One amp message.
#[derive(Debug, Clone, PartialEq)]
pub struct AmpMessage {
    pub args: Vec<AmpArg>,
}

impl AmpMessage {
    pub fn new(args: Vec<AmpArg>) -> Self {
        Self { args }
    }

    /// First argument as a topic string, as axon pub sockets send it.
    pub fn topic(&self) -> Option<&str> {
        self.args.first()?.as_text()
    }
}

/// Stateless codec for amp frames.
#[derive(Debug, Clone)]
pub struct AmpCodec {
    max_arg_len: usize,
}

impl AmpCodec {
    pub fn new(max_arg_len: usize) -> Self {
        Self { max_arg_len }
    }
}

impl Default for AmpCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARG_LEN)
    }
}

impl Decoder for AmpCodec {
    type Item = AmpMessage;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<AmpMessage>, BridgeError> {
        let Some(&header) = src.first() else {
            return Ok(None);
        };
        let version = header >> 4;
        if version != AMP_VERSION {
            return Err(BridgeError::decode(format!(
                "unsupported amp version {version}"
            )));
        }
        let argc = usize::from(header & 0x0f);

        // Walk the length prefixes first; only consume once the frame is complete.
        let mut offset = HEADER_LEN;
        for _ in 0..argc {
            if src.len() < offset + LEN_PREFIX {
                src.reserve(offset + LEN_PREFIX - src.len());
                return Ok(None);
            }
            let mut prefix = &src[offset..offset + LEN_PREFIX];
            let len = prefix.get_u32() as usize;
            if len > self.max_arg_len {
                return Err(BridgeError::decode(format!(
                    "argument of {len} bytes exceeds limit of {}",
                    self.max_arg_len
                )));
            }
            offset += LEN_PREFIX + len;
            if src.len() < offset {
                src.reserve(offset - src.len());
                return Ok(None);
            }
        }

        let mut frame = src.split_to(offset).freeze();
        frame.advance(HEADER_LEN);
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            let len = frame.get_u32() as usize;
            args.push(AmpArg::parse(frame.split_to(len))?);
        }
        Ok(Some(AmpMessage { args }))
    }
}

// PM2 is only ever read from; frames are written by tests.
#[cfg(test)]
impl tokio_util::codec::Encoder<AmpMessage> for AmpCodec {
    type Error = BridgeError;

    fn encode(&mut self, msg: AmpMessage, dst: &mut BytesMut) -> Result<(), BridgeError> {
        use bytes::BufMut;

        if msg.args.len() > MAX_ARGS {
            return Err(BridgeError::decode(format!(
                "amp frames carry at most {MAX_ARGS} arguments, got {}",
                msg.args.len()
            )));
        }
        dst.put_u8((AMP_VERSION << 4) | msg.args.len() as u8);
        for arg in &msg.args {
            let payload = arg.encoded()?;
            if payload.len() > self.max_arg_len {
                return Err(BridgeError::decode(format!(
                    "argument of {} bytes exceeds limit of {}",
                    payload.len(),
                    self.max_arg_len
                )));
            }
            dst.put_u32(payload.len() as u32);
            dst.extend_from_slice(&payload);
        }
        Ok(())
    }
}
