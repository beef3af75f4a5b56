//! Speech backend implementations
//!
//! Contains concrete implementations of the `SpeechBackend` trait:
//! - `web` - HTTP services (Google Translate, IBM Watson, custom templates)
//! - `native` - locally installed speech engine
//! - `caching` - on-disk cache decorator around any of the above

pub mod caching;
pub mod native;
pub mod web;

pub use caching::CachingProvider;
pub use native::{EspeakEngine, NativeSynthesisBackend, SpeechEngine, SynthesisJob};
pub use web::{AuthScheme, WebBackend, WebEndpoint};
