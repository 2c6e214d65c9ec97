//! Opening post URLs on the desktop

use crate::error::{Error, Result};

/// Something that can show a URL to the user.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// The platform's default browser.
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        webbrowser::open(url)
            .map_err(|e| Error::Content(format!("failed to open browser for {url}: {e}")))
    }
}

/// Records opened URLs instead of launching anything. Optionally requests
/// poll loop shutdown after each open so tests can stop after one post.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingBrowser {
    pub opened: std::sync::Mutex<Vec<String>>,
    pub stop_after_open: Option<tokio::sync::watch::Sender<bool>>,
    pub fail: bool,
}

#[cfg(test)]
impl UrlOpener for RecordingBrowser {
    fn open(&self, url: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Content(format!("no display to open {url}")));
        }
        self.opened.lock().unwrap().push(url.to_string());
        if let Some(stop) = &self.stop_after_open {
            let _ = stop.send(true);
        }
        Ok(())
    }
}
