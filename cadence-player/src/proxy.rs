//! Loopback proxy boundary
//!
//! A partial file grows while the decoder reads it, and most platform
//! decoders reject a local file that ends mid-stream. The download
//! subsystem provides a loopback range server that fronts the partial
//! file; the engine only starts it, asks it for a URL, and stops it.

use crate::error::Result;
use std::path::Path;

/// A running loopback range server
pub trait ProxyHandle: Send + Sync {
    /// URL the decoder should open to read `path` through the proxy
    fn url_for(&self, path: &Path) -> String;

    /// Stop serving; idempotent
    fn stop(&self);
}

/// Factory for loopback range servers
///
/// Started lazily when the engine first configures a partial source and
/// stopped once the source is a complete file, on promotion, and at
/// teardown.
pub trait ProxyServer: Send + Sync {
    fn start(&self) -> Result<Box<dyn ProxyHandle>>;
}

/// Pass-through "proxy" that hands the decoder the raw file path
///
/// For decoder backends that can read a growing file directly (or for
/// tests); keeps the engine logic identical whether or not a real range
/// server is wired in.
pub struct PassthroughProxy;

struct PassthroughHandle;

impl ProxyHandle for PassthroughHandle {
    fn url_for(&self, path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn stop(&self) {}
}

impl ProxyServer for PassthroughProxy {
    fn start(&self) -> Result<Box<dyn ProxyHandle>> {
        Ok(Box::new(PassthroughHandle))
    }
}
