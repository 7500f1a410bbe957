//! Banner probe payloads and banner text capture.
//!
//! Payloads are opaque template strings. The only interpretation applied is
//! substituting the `#host#` placeholder with the literal scan host before
//! the bytes go on the wire.

/// Placeholder replaced with the scanned host in every payload.
pub const HOST_PLACEHOLDER: &str = "#host#";

/// Upper bound on a single read from a connected service.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Probes sent to every open port unless configured otherwise.
pub const DEFAULT_PAYLOADS: &[&str] = &["HEAD / HTTP/1.0\r\nHost: #host#\r\n\r\n"];

/// Render a payload template for `host`.
pub fn render_payload(template: &str, host: &str) -> Vec<u8> {
    template.replace(HOST_PLACEHOLDER, host).into_bytes()
}

/// Owned copies of [`DEFAULT_PAYLOADS`].
pub fn default_payloads() -> Vec<String> {
    DEFAULT_PAYLOADS.iter().map(|p| p.to_string()).collect()
}

/// Turn one received chunk into banner text.
///
/// Invalid UTF-8 is replaced rather than rejected; surrounding whitespace
/// is trimmed.
pub fn decode_banner(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_payload_substitutes_every_placeholder() {
        let rendered = render_payload("GET / HTTP/1.1\r\nHost: #host#\r\nX-Echo: #host#\r\n\r\n", "example.org");
        assert_eq!(
            rendered,
            b"GET / HTTP/1.1\r\nHost: example.org\r\nX-Echo: example.org\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn test_render_payload_without_placeholder() {
        assert_eq!(render_payload("\r\n\r\n", "h"), b"\r\n\r\n".to_vec());
    }

    #[test]
    fn test_decode_banner_trims() {
        assert_eq!(decode_banner(b"SSH-2.0-OpenSSH_8.9\r\n"), "SSH-2.0-OpenSSH_8.9");
        assert_eq!(decode_banner(b"  220 ready \n"), "220 ready");
    }

    #[test]
    fn test_decode_banner_lossy() {
        assert_eq!(decode_banner(b"ok\xff"), "ok\u{fffd}");
    }

    #[test]
    fn test_default_payloads_carry_placeholder() {
        assert!(default_payloads().iter().all(|p| p.contains(HOST_PLACEHOLDER)));
    }
}
