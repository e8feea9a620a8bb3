//! Parser for the streamed progress protocol.
//!
//! The scoring tool reports one frame per line as `FRAME/TOTAL: SCORE`,
//! e.g. `42/500: 87.341`.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ProtocolError;
use crate::model::ParsedPacket;

fn packet_re() -> &'static Regex {
    static PACKET_RE: OnceLock<Regex> = OnceLock::new();
    PACKET_RE
        .get_or_init(|| Regex::new(r"^(\d+)/(\d+): (-?\d+(\.\d+)?)$").expect("packet regex compiles"))
}

/// Parse one trimmed, non-empty progress line.
///
/// Returns the offending line inside the error on any mismatch; never yields
/// a partial packet.
pub fn parse_packet(line: &str) -> Result<ParsedPacket, ProtocolError> {
    let err = || ProtocolError {
        line: line.to_string(),
    };
    let caps = packet_re().captures(line).ok_or_else(err)?;
    let frame: u64 = caps[1].parse().map_err(|_| err())?;
    let total_frames: u64 = caps[2].parse().map_err(|_| err())?;
    let score: f64 = caps[3].parse().map_err(|_| err())?;
    Ok(ParsedPacket {
        frame,
        total_frames,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_packet() {
        let pkt = parse_packet("10/100: 42.5").unwrap();
        assert_eq!(pkt.frame, 10);
        assert_eq!(pkt.total_frames, 100);
        assert_eq!(pkt.score, 42.5);
    }

    #[test]
    fn parses_integer_and_negative_scores() {
        assert_eq!(parse_packet("0/1: 100").unwrap().score, 100.0);
        assert_eq!(parse_packet("7/9: -3.25").unwrap().score, -3.25);
    }

    #[test]
    fn rejects_everything_off_grammar() {
        for bad in [
            "abc",
            "",
            "1/2:3",     // missing space after colon
            "1/2: x",    // non-numeric score
            "1/2: 3.",   // trailing dot
            "1/2: .5",   // leading dot
            "1/2: 1e3",  // exponent form
            "-1/2: 3.0", // negative frame index
            " 1/2: 3.0", // leading whitespace (caller trims)
            "1/2: 3.0 extra",
        ] {
            let err = parse_packet(bad).unwrap_err();
            assert_eq!(err.line, bad, "offending line is carried in the error");
        }
    }

    #[test]
    fn overflowing_frame_index_is_a_protocol_error() {
        assert!(parse_packet("99999999999999999999999/1: 1.0").is_err());
    }
}
