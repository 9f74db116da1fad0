// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Request/response wire protocol.
//!
//! Every frame is a single JSON document.
//!
//! | Request | Meaning |
//! |---|---|
//! | `0` | PEEK: return the head message |
//! | `1` | POP: return the head message and remove it |
//! | `2` | DEQUEUE_ONLY: remove the head message |
//!
//! A response is either the message itself or one of the integer codes
//! [`NO_DATA`], [`ACKNOWLEDGED`] and [`REJECTED`].
//!
//! Messages are JSON by convention. A payload that is valid JSON is sent
//! byte for byte, so key order and number precision are kept. A payload that
//! is not valid JSON is sent as a JSON string. A payload consisting of exactly one of the integer codes
//! cannot be told apart from that code by the client.

use std::fmt;

use serde::de::IgnoredAny;
use serde_json::Value;
use snafu::ResultExt;

use crate::error::{DecodeRequestSnafu, DecodeResponseSnafu, Result, UnknownOpcodeSnafu};

/// No message is available.
pub const NO_DATA: i64 = 0;
/// The operation was carried out.
pub const ACKNOWLEDGED: i64 = 1;
/// The request could not be served.
pub const REJECTED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Peek,
    Pop,
    DequeueOnly,
}

impl Opcode {
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Peek => 0,
            Self::Pop => 1,
            Self::DequeueOnly => 2,
        }
    }

    /// Decodes a request frame.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let code: i64 = serde_json::from_slice(frame).context(DecodeRequestSnafu)?;
        Self::try_from(code)
    }

    #[must_use]
    pub fn encode(self) -> Vec<u8> { self.code().to_string().into_bytes() }
}

impl TryFrom<i64> for Opcode {
    type Error = crate::Error;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Peek),
            1 => Ok(Self::Pop),
            2 => Ok(Self::DequeueOnly),
            code => UnknownOpcodeSnafu { code }.fail(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Peek => "PEEK",
            Self::Pop => "POP",
            Self::DequeueOnly => "DEQUEUE_ONLY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The JSON text of a message.
    Message(Vec<u8>),
    NoData,
    Acknowledged,
    Rejected,
}

impl Response {
    /// Wraps a stored payload for sending.
    #[must_use]
    pub fn message(payload: &[u8]) -> Self {
        if is_json(payload) {
            return Self::Message(payload.to_vec());
        }
        let text = Value::String(String::from_utf8_lossy(payload).into_owned());
        Self::Message(text.to_string().into_bytes())
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Message(text) => text.clone(),
            Self::NoData => NO_DATA.to_string().into_bytes(),
            Self::Acknowledged => ACKNOWLEDGED.to_string().into_bytes(),
            Self::Rejected => REJECTED.to_string().into_bytes(),
        }
    }

    /// Decodes a response frame on the client side.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        serde_json::from_slice::<IgnoredAny>(frame).context(DecodeResponseSnafu)?;
        Ok(match serde_json::from_slice::<i64>(frame).ok() {
            Some(NO_DATA) => Self::NoData,
            Some(ACKNOWLEDGED) => Self::Acknowledged,
            Some(REJECTED) => Self::Rejected,
            _ => Self::Message(frame.to_vec()),
        })
    }
}

/// Checks the syntax only; numbers are never converted.
fn is_json(payload: &[u8]) -> bool { serde_json::from_slice::<IgnoredAny>(payload).is_ok() }

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case(b"0", Opcode::Peek ; "peek")]
    #[test_case(b"1", Opcode::Pop ; "pop")]
    #[test_case(b"2", Opcode::DequeueOnly ; "dequeue only")]
    #[test_case(b" 2\n", Opcode::DequeueOnly ; "surrounding whitespace")]
    fn test_decode_opcode(frame: &[u8], expected: Opcode) {
        assert_eq!(Opcode::decode(frame).unwrap(), expected);
    }

    #[test_case(b"3" ; "out of range")]
    #[test_case(b"-1" ; "negative")]
    #[test_case(b"\"0\"" ; "string")]
    #[test_case(b"1.5" ; "float")]
    #[test_case(b"" ; "empty")]
    fn test_decode_bad_opcode(frame: &[u8]) {
        let err = Opcode::decode(frame).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_encode_opcode() {
        assert_eq!(Opcode::Pop.encode(), b"1");
        assert_eq!(Opcode::DequeueOnly.to_string(), "DEQUEUE_ONLY");
    }

    #[test]
    fn test_message_keeps_json_payloads() {
        let payload = br#"{"metadata": {"node_id": "n1"}}"#;
        let response = Response::message(payload);
        assert_eq!(response.encode(), payload);
        assert_eq!(Response::decode(payload).unwrap(), response);
    }

    #[test_case(br#"{"id":123456789012345678901234567890}"# ; "integer wider than u64")]
    #[test_case(br#"{"b":1,"a":2}"# ; "unsorted keys")]
    #[test_case(br#"{"x":1e400}"# ; "number beyond f64")]
    #[test_case(br#"[0.10000000000000000001, -0]"# ; "decimal precision")]
    fn test_message_is_sent_verbatim(payload: &[u8]) {
        let frame = Response::message(payload).encode();
        assert_eq!(frame, payload);
        assert_eq!(Response::decode(&frame).unwrap(), Response::Message(payload.to_vec()));
    }

    #[test]
    fn test_message_wraps_opaque_payloads() {
        let response = Response::message(b"not json");
        assert_eq!(response.encode(), json!("not json").to_string().into_bytes());
    }

    #[test_case(Response::NoData, b"0" ; "no data")]
    #[test_case(Response::Acknowledged, b"1" ; "acknowledged")]
    #[test_case(Response::Rejected, b"-1" ; "rejected")]
    fn test_status_codes(response: Response, frame: &[u8]) {
        assert_eq!(response.encode(), frame);
        assert_eq!(Response::decode(frame).unwrap(), response);
    }
}
