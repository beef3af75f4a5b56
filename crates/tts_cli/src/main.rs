//! tts-cache CLI
//!
//! Converts text to WAV files through the configured speech provider,
//! using and filling the on-disk cache.

#![allow(clippy::print_stdout)]

mod settings;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tts_cache::{
    ConversionRequest, ProviderRegistry, TtsConfig, codec, derive_cache_key, spawn_conversion,
};

/// tts-cache CLI
#[derive(Parser)]
#[command(name = "tts-cache")]
#[command(author, version, about = "Cached text-to-speech conversion", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "TTS_CONFIG_FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the request identity
#[derive(Args, Default)]
struct VoiceArgs {
    /// Provider name (e.g. google, watson, web, native)
    #[arg(short, long)]
    provider: Option<String>,

    /// Language code
    #[arg(short, long)]
    language: Option<String>,

    /// Voice name or gender
    #[arg(long)]
    voice: Option<String>,
}

impl VoiceArgs {
    fn apply(self, config: &mut TtsConfig) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(voice) = self.voice {
            config.voice = voice;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert text into a WAV file
    ///
    /// Example: tts-cache convert "Good morning" -o morning.wav -p google --persist
    Convert {
        /// Text to speak
        text: String,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        voice: VoiceArgs,

        /// Ignore existing cache entries
        #[arg(long)]
        no_cache: bool,

        /// Store the result in the cache
        #[arg(long)]
        persist: bool,
    },

    /// Print the cache file a conversion would use
    Key {
        /// Text to speak
        text: String,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// List registered providers
    Providers,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter_from_verbosity(
            cli.verbose,
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(
        provider = %config.provider,
        config_file = ?cli.config,
        cache_dir = %config.cache_dir().display(),
        "Configuration loaded"
    );
    let registry = ProviderRegistry::with_builtins();

    match cli.command {
        Commands::Convert {
            text,
            output,
            voice,
            no_cache,
            persist,
        } => {
            voice.apply(&mut config);
            if no_cache {
                config.use_cache = false;
            }
            if persist {
                config.persist_results = true;
            }

            let backend = registry.create(&config)?;
            let request = ConversionRequest::from_config(&config, text);
            debug!(
                provider = %request.provider_id,
                language = %request.language,
                use_cache = config.use_cache,
                persist = config.persist_results,
                "Starting conversion"
            );

            // Dropping the handle on Ctrl-C cancels the conversion
            let asset = tokio::select! {
                result = spawn_conversion(backend, request) => result?,
                _ = tokio::signal::ctrl_c() => anyhow::bail!("Interrupted"),
            };

            let wav = codec::encode_wav(&asset)?;
            tokio::fs::write(&output, wav)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(path = %output.display(), samples = asset.samples().len(), "Audio written");

            println!(
                "🔊 Wrote {} ({} ms, {} Hz, {} ch)",
                output.display(),
                asset.duration_ms(),
                asset.sample_rate(),
                asset.channel_count()
            );
        },

        Commands::Key { text, voice } => {
            voice.apply(&mut config);
            let key = derive_cache_key(&config.provider, &config.language, &config.voice, &text);
            println!("{}", config.cache_dir().join(key).display());
        },

        Commands::Providers => {
            for name in registry.provider_names() {
                let marker = if name == config.provider { "*" } else { " " };
                println!("{marker} {name}");
            }
        },
    }

    Ok(())
}
