//! TTS Cache - cached text-to-speech conversion
//!
//! Converts text into decoded audio through pluggable speech backends and
//! keeps the results in an on-disk WAV cache, so repeated requests skip the
//! backend entirely.
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the `SpeechBackend` trait (port)
//! - `providers` module contains concrete implementations (adapters)
//! - `registry` resolves a configured provider name to a ready backend
//!
//! # Supported Providers
//!
//! - `google` and `watson` web services, plus a generic URL template (`web`)
//! - `native`: a locally installed engine (espeak-ng by default)
//!
//! # Example
//!
//! ```ignore
//! use tts_cache::{ConversionRequest, ProviderRegistry, TtsConfig, spawn_conversion};
//!
//! let mut config = TtsConfig::for_provider("google");
//! config.persist_results = true;
//!
//! let registry = ProviderRegistry::with_builtins();
//! let backend = registry.create(&config)?;
//!
//! let request = ConversionRequest::from_config(&config, "Hello, world!");
//! let asset = spawn_conversion(backend, request).await?;
//! println!("{} ms of audio", asset.duration_ms());
//! ```

pub mod cache_key;
pub mod codec;
pub mod config;
pub mod converter;
pub mod error;
pub mod handle;
pub mod ports;
pub mod providers;
pub mod registry;
pub mod types;

pub use cache_key::{cache_key_for, derive_cache_key};
pub use config::{NativeConfig, TtsConfig, WebConfig};
pub use converter::AudioConverter;
pub use error::SpeechError;
pub use handle::{ConversionHandle, ConversionResult, spawn_conversion};
pub use ports::SpeechBackend;
pub use providers::{CachingProvider, NativeSynthesisBackend, WebBackend, WebEndpoint};
pub use registry::{BackendConstructor, ProviderRegistry};
pub use types::{AudioAsset, AudioFormat, ConversionRequest, VoiceGender};
