//! The "t++" in-band control protocol.
//!
//! terminal++ applications talk to the terminal through DCS envelopes of
//! the form `ESC P + <kind> ; <payload> BEL`, used for capability
//! negotiation and out-of-band file transfer. The engine answers the
//! capabilities handshake itself and forwards every other kind to the
//! application unchanged.

use std::fmt;

use crate::parser::Parse;

/// Kinds of t++ sequences, wire-encoded as decimal integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TppKind {
    /// Capability negotiation; answered by the terminal itself.
    Capabilities,
    /// Open a new file for transfer.
    NewFile,
    /// A chunk of transferred data.
    Data,
    /// Query transfer progress.
    TransferStatus,
    /// Ask the terminal's host to open a transferred file.
    OpenFile,
    /// A kind this terminal does not know; forwarded verbatim.
    Other(u32),
}

impl TppKind {
    /// Decodes the wire number.
    #[must_use]
    pub fn from_wire(value: u32) -> Self {
        match value {
            0 => TppKind::Capabilities,
            1 => TppKind::NewFile,
            2 => TppKind::Data,
            3 => TppKind::TransferStatus,
            4 => TppKind::OpenFile,
            other => TppKind::Other(other),
        }
    }

    /// The wire number of this kind.
    #[must_use]
    pub fn wire(self) -> u32 {
        match self {
            TppKind::Capabilities => 0,
            TppKind::NewFile => 1,
            TppKind::Data => 2,
            TppKind::TransferStatus => 3,
            TppKind::OpenFile => 4,
            TppKind::Other(other) => other,
        }
    }
}

impl fmt::Display for TppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TppKind::Capabilities => write!(f, "Capabilities"),
            TppKind::NewFile => write!(f, "NewFile"),
            TppKind::Data => write!(f, "Data"),
            TppKind::TransferStatus => write!(f, "TransferStatus"),
            TppKind::OpenFile => write!(f, "OpenFile"),
            TppKind::Other(n) => write!(f, "Other({n})"),
        }
    }
}

/// A complete t++ envelope: the kind plus its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TppSequence {
    /// The parsed kind.
    pub kind: TppKind,
    /// Payload bytes between the kind separator and the terminating BEL.
    pub payload: Vec<u8>,
}

impl TppSequence {
    /// Parses a t++ envelope from a window starting right after `ESC P +`.
    ///
    /// The whole envelope up to the terminating BEL must be present;
    /// otherwise the parse is incomplete and the caller re-delivers the
    /// bytes. The consumed count includes the BEL.
    pub fn parse(input: &[u8]) -> Parse<TppSequence> {
        // The payload may not contain BEL, so the terminator search is a
        // plain scan.
        let Some(end) = input.iter().position(|&b| b == 0x07) else {
            return Parse::Incomplete;
        };
        let consumed = end + 1;
        let mut x = 0;
        if !input[x..end].first().is_some_and(u8::is_ascii_digit) {
            return Parse::Invalid(consumed);
        }
        let mut kind: u32 = 0;
        while x < end && input[x].is_ascii_digit() {
            kind = kind
                .saturating_mul(10)
                .saturating_add(u32::from(input[x] - b'0'));
            x += 1;
        }
        if x < end && input[x] == b';' {
            x += 1;
        }
        Parse::Complete(
            TppSequence {
                kind: TppKind::from_wire(kind),
                payload: input[x..end].to_vec(),
            },
            consumed,
        )
    }
}

/// The terminal's reply to a [`TppKind::Capabilities`] request.
#[must_use]
pub fn capabilities_reply() -> &'static [u8] {
    b"\x1bP+0;0\x07"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_capabilities_request() {
        match TppSequence::parse(b"0;\x07rest") {
            Parse::Complete(seq, n) => {
                assert_eq!(seq.kind, TppKind::Capabilities);
                assert!(seq.payload.is_empty());
                assert_eq!(n, 3);
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn parse_data_with_payload() {
        match TppSequence::parse(b"2;42;AAAA\x07") {
            Parse::Complete(seq, n) => {
                assert_eq!(seq.kind, TppKind::Data);
                assert_eq!(seq.payload, b"42;AAAA");
                assert_eq!(n, 10);
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn parse_unknown_kind() {
        match TppSequence::parse(b"9;x\x07") {
            Parse::Complete(seq, _) => assert_eq!(seq.kind, TppKind::Other(9)),
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_envelope_requests_more_bytes() {
        assert_eq!(TppSequence::parse(b"2;partial"), Parse::Incomplete);
        assert_eq!(TppSequence::parse(b""), Parse::Incomplete);
    }

    #[test]
    fn envelope_without_kind_is_invalid() {
        match TppSequence::parse(b";x\x07") {
            Parse::Invalid(n) => assert_eq!(n, 3),
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[test]
    fn kind_wire_round_trip() {
        for n in 0..8u32 {
            assert_eq!(TppKind::from_wire(n).wire(), n);
        }
    }

    #[test]
    fn capabilities_reply_shape() {
        let reply = capabilities_reply();
        assert!(reply.starts_with(b"\x1bP+"));
        assert!(reply.ends_with(b"\x07"));
    }
}
