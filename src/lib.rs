//! # Strike
//!
//! Declarative UI trees rendered on the server, streamed to the browser as
//! HTML, then pushed a second time as a JSON payload so that individual
//! "island" subtrees can be hydrated by the client runtime.
//!
//! The pipeline is render-once, push-once:
//!
//! ```text
//! h!(...) → Node tree → to_html  → <!doctype html>… (flush)
//!                     → to_payload → <script>__rsc.push(…)</script>
//! ```
//!
//! Construction and rendering are strictly separate stages. The builder
//! classifies its arguments into a typed record before any serializer sees
//! the tree, and the serializers never build nodes.

pub mod app;
pub mod builder;
pub mod component;
pub mod html;
pub mod island;
pub mod node;
pub mod notes;
pub mod payload;
pub mod server;
pub mod stream;
pub mod utils;

use std::time::Duration;

use thiserror::Error;

pub use builder::{h, Arg, Builder, DEFAULT_MAX_DEPTH};
pub use component::{
    component, Component, ComponentFn, ComponentInput, IntoRender, IntoTag, Tag,
};
pub use html::to_html;
pub use island::{island, slot, ISLAND_STYLES, ISLAND_TAG, SLOT_TAG};
pub use node::{Child, Handler, Markup, Node, PropValue, Props, FRAGMENT};
pub use payload::{from_payload, to_payload};
pub use stream::{render, BufferedTransport, RenderReport, StreamState, Transport};

// ---------------------------------------------------------------------------
// Render Mode
// ---------------------------------------------------------------------------

/// Request header that selects the payload-only response shape.
pub const RSC_HEADER: &str = "RSC";

/// Response shape, negotiated per request by the [`RSC_HEADER`] flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// HTML shell, flush, then the payload push script.
    FullPage,
    /// Only the JSON payload, no HTML.
    PayloadOnly,
}

impl RenderMode {
    /// Pick the mode from the raw value of the `RSC` header, if present.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("1") => RenderMode::PayloadOnly,
            _ => RenderMode::FullPage,
        }
    }

    /// Content type written for this response shape.
    pub fn content_type(self) -> &'static str {
        match self {
            RenderMode::FullPage => stream::HTML_CONTENT_TYPE,
            RenderMode::PayloadOnly => stream::PAYLOAD_CONTENT_TYPE,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderOptions
// ---------------------------------------------------------------------------

/// Describes HOW a single request is rendered.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Pause after the HTML shell is flushed, before the payload push.
    /// Pacing only; zero is always correct.
    pub flush_delay: Duration,
    /// Maximum nesting of component expansions while building the tree.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            flush_delay: Duration::ZERO,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RenderOptions {
    /// Builder configured with this request's expansion limit.
    pub fn builder(&self) -> Builder {
        Builder::with_max_depth(self.max_depth)
    }
}

// ---------------------------------------------------------------------------
// StrikeError
// ---------------------------------------------------------------------------

/// Errors that abort a render. None of them are retried.
#[derive(Debug, Error)]
pub enum StrikeError {
    /// Malformed builder arguments or a component contract violation.
    #[error("Construction error: {0}")]
    Construction(String),

    /// A value in the tree cannot be written as HTML or as payload JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Writing to the output stream failed.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The note source could not answer a query.
    #[error("Lookup error: {0}")]
    Lookup(String),
}

impl StrikeError {
    /// Short kind name, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            StrikeError::Construction(_) => "construction",
            StrikeError::Serialization(_) => "serialization",
            StrikeError::Transport(_) => "transport",
            StrikeError::Lookup(_) => "lookup",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = StrikeError> = std::result::Result<T, E>;
