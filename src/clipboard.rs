use anyhow::{anyhow, Result};
use arboard::Clipboard;

/// Best-effort clipboard write. Whether one exists at all is decided once at
/// startup by whoever builds the session.
pub trait ClipboardSink {
    fn copy(&mut self, text: &str) -> Result<()>;
}

pub struct SystemClipboard {
    inner: Clipboard,
}

impl SystemClipboard {
    /// Returns `None` when no clipboard is reachable (headless session, no display).
    pub fn probe() -> Option<Self> {
        match Clipboard::new() {
            Ok(inner) => Some(Self { inner }),
            Err(e) => {
                tracing::info!(error = %e, "clipboard unavailable");
                None
            }
        }
    }
}

impl ClipboardSink for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text.to_string())
            .map_err(|e| anyhow!("Failed to set clipboard: {e}"))
    }
}
