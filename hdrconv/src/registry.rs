//! Format registry: name lookup and content sniffing over format handlers.
//!
//! The registry is an explicit value built once and passed by reference to
//! whatever needs lookup. Handlers are tried in registration order.
//!
//! # Example
//!
//! ```ignore
//! use hdrconv::registry::FormatRegistry;
//!
//! let registry = FormatRegistry::with_defaults();
//! let mut file = std::fs::File::open("photo.jpg")?;
//! let handler = registry.identify(&mut file)?;
//! let container = handler.read(&mut file)?;
//! ```

use crate::formats::{FormatHandler, HeicPqHandler, ReadSeek, UltraHdrHandler};
use hdrconv_core::{Error, Result};
use std::io::{Seek, SeekFrom};

/// Ordered collection of format handlers.
#[derive(Default)]
pub struct FormatRegistry {
    handlers: Vec<Box<dyn FormatHandler>>,
}

impl FormatRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers: Ultra HDR JPEG, then HEIC.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(UltraHdrHandler::new()));
        registry.register(Box::new(HeicPqHandler::new()));
        registry
    }

    /// Register a handler. A handler with the same name is replaced in place.
    pub fn register(&mut self, handler: Box<dyn FormatHandler>) {
        match self.handlers.iter().position(|h| h.name() == handler.name()) {
            Some(i) => self.handlers[i] = handler,
            None => self.handlers.push(handler),
        }
    }

    /// Handler registered under `name`.
    pub fn get(&self, name: &str) -> Result<&dyn FormatHandler> {
        self.handlers
            .iter()
            .find(|h| h.name() == name)
            .map(|h| h.as_ref())
            .ok_or_else(|| Error::UnknownFormat(name.to_string()))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// First handler that recognizes the stream.
    ///
    /// The stream position is restored after every attempt, including the
    /// one that succeeds. A handler whose `identify` fails with an error is
    /// treated as not matching.
    pub fn identify(&self, stream: &mut dyn ReadSeek) -> Result<&dyn FormatHandler> {
        let start = stream.stream_position()?;
        for handler in &self.handlers {
            let matched = handler.identify(stream);
            stream.seek(SeekFrom::Start(start))?;
            match matched {
                Ok(true) => {
                    log::debug!("identified stream as {}", handler.name());
                    return Ok(handler.as_ref());
                }
                Ok(false) => {}
                Err(e) => log::debug!("{} identify failed: {}", handler.name(), e),
            }
        }
        Err(Error::UnidentifiedFormat)
    }
}

impl core::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
