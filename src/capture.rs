//! Bounded capture of sandbox output streams
//!
//! Each stream is read into a buffer capped at the configured ceiling. On
//! overflow the capturer notifies the runner so the sandbox can be torn down,
//! then keeps draining and discarding so the child never wedges on a full
//! pipe before the kill lands.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Notify;

/// Marker appended where captured output was cut off
pub(crate) const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

/// One captured stream, cut off at the configured ceiling
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl CapturedOutput {
    /// Lossy text with the truncation marker applied
    pub fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Read `reader` to EOF, keeping at most `cap` bytes
pub(crate) async fn capture_stream<R>(
    mut reader: R,
    cap: usize,
    overflow: Arc<Notify>,
) -> CapturedOutput
where
    R: AsyncRead + Unpin,
{
    let mut out = CapturedOutput::default();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if out.truncated {
                    continue;
                }
                let room = cap.saturating_sub(out.bytes.len());
                if n > room {
                    out.bytes.extend_from_slice(&buf[..room]);
                    out.truncated = true;
                    overflow.notify_one();
                } else {
                    out.bytes.extend_from_slice(&buf[..n]);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_capture_under_cap() {
        let overflow = Arc::new(Notify::new());
        let captured = capture_stream(&b"hello\n"[..], 1024, overflow).await;
        assert_eq!(captured.bytes, b"hello\n");
        assert!(!captured.truncated);
        assert_eq!(captured.into_text(), "hello\n");
    }

    #[tokio::test]
    async fn test_capture_at_exact_cap_is_not_truncated() {
        let overflow = Arc::new(Notify::new());
        let captured = capture_stream(&b"abcd"[..], 4, overflow).await;
        assert_eq!(captured.bytes, b"abcd");
        assert!(!captured.truncated);
    }

    #[tokio::test]
    async fn test_overflow_truncates_and_notifies() {
        let overflow = Arc::new(Notify::new());
        let notified = overflow.clone();
        let captured = capture_stream(&b"abcdefgh"[..], 4, overflow).await;
        assert_eq!(captured.bytes, b"abcd");
        assert!(captured.truncated);
        assert!(captured.into_text().ends_with(TRUNCATION_MARKER));

        // the notification must already be pending
        tokio::time::timeout(Duration::from_millis(100), notified.notified())
            .await
            .expect("overflow notification not delivered");
    }

    #[tokio::test]
    async fn test_remainder_is_drained_after_overflow() {
        let big = vec![b'x'; 64 * 1024];
        let overflow = Arc::new(Notify::new());
        let captured = capture_stream(&big[..], 16, overflow).await;
        assert_eq!(captured.bytes.len(), 16);
        assert!(captured.truncated);
    }
}
