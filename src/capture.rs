//! Size-bounded capture of the printed document
//!
//! `Page.printToPDF` returns the document base64-encoded. This module
//! decodes it and enforces the job's size cap; oversized output is
//! discarded whole rather than truncated.

use crate::RenderError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

/// Decode the print payload, failing with `SizeExceeded` if the decoded
/// document is larger than `max_size` bytes.
pub fn decode_bounded(data: &str, max_size: u64) -> Result<Vec<u8>, RenderError> {
    let pdf = STANDARD.decode(data).map_err(|e| RenderError::Protocol {
        method: "Page.printToPDF".to_string(),
        message: format!("invalid base64 payload: {e}"),
    })?;

    if pdf.len() as u64 > max_size {
        debug!(
            "Discarding oversized PDF: {} > {}",
            crate::format_bytes(pdf.len()),
            crate::format_bytes(max_size as usize)
        );
        return Err(RenderError::SizeExceeded {
            size: pdf.len(),
            max_size,
        });
    }

    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderError;

    #[test]
    fn test_decode_within_limit() {
        let encoded = STANDARD.encode(b"%PDF-1.4 fake document");
        let pdf = decode_bounded(&encoded, 1024).unwrap();
        assert_eq!(&pdf[..4], b"%PDF");
    }

    #[test]
    fn test_decode_exceeds_limit() {
        let encoded = STANDARD.encode(vec![0u8; 200]);
        match decode_bounded(&encoded, 100) {
            Err(RenderError::SizeExceeded { size, max_size }) => {
                assert_eq!(size, 200);
                assert_eq!(max_size, 100);
            }
            other => panic!("expected SizeExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_exact_limit_ok() {
        let encoded = STANDARD.encode(vec![0u8; 100]);
        assert!(decode_bounded(&encoded, 100).is_ok());
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert!(matches!(
            decode_bounded("not base64!!!", 1024),
            Err(RenderError::Protocol { .. })
        ));
    }
}
