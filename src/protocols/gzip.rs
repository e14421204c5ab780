//! Gzip framing for request and response bodies.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use protocols::Error;
use std::io::{self, Read, Write};

/// The content coding token for gzip.
pub const GZIP: &str = "gzip";

/// Compress `payload` into a gzip member.
pub fn compress(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::fast());
    enc.write_all(payload)?;
    enc.finish()
}

/// Decompress a gzip framed body. Any framing or checksum failure is a
/// malformed request.
pub fn decompress(body: &[u8]) -> Result<Vec<u8>, Error> {
    let mut dec = GzDecoder::new(body);
    let mut buffer = Vec::with_capacity(body.len() * 4);
    dec.read_to_end(&mut buffer)
        .map_err(|e| Error::Malformed(format!("invalid gzip data: {}", e)))?;
    Ok(buffer)
}

/// Whether an `Accept-Encoding` value names gzip.
///
/// The header is a comma separated list. Each entry is trimmed and must be
/// exactly `gzip`; matching is case-sensitive and quality parameters are not
/// interpreted.
pub fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding
        .split(',')
        .any(|encoding| encoding.trim() == GZIP)
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn round_trip_is_identity() {
        fn inner(payload: Vec<u8>) -> TestResult {
            let compressed = compress(&payload).unwrap();
            assert_eq!(payload, decompress(&compressed).unwrap());
            TestResult::passed()
        }
        QuickCheck::new().quickcheck(inner as fn(Vec<u8>) -> TestResult);
    }

    #[test]
    fn garbage_is_malformed() {
        match decompress(b"{\"id\":\"x\"}") {
            Err(Error::Malformed(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(decompress(&[0x1f, 0x8b]).is_err());
    }

    #[test]
    fn accept_encoding_negotiation() {
        assert!(accepts_gzip("gzip"));
        assert!(accepts_gzip("deflate, gzip"));
        assert!(accepts_gzip("  gzip  ,br"));
        assert!(!accepts_gzip(""));
        assert!(!accepts_gzip("GZIP"));
        assert!(!accepts_gzip("deflate, br"));
        assert!(!accepts_gzip("gzip;q=1.0"));
        assert!(!accepts_gzip("x-gzip"));
    }
}
