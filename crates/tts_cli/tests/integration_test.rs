//! Integration tests for CLI
//!
//! These tests verify command parsing without running conversions.

#![allow(clippy::panic)] // Allow panic! in tests for clear failure messages

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

// Mock CLI structure for testing (mirrors main.rs)
#[derive(Parser)]
#[command(name = "tts-cache")]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct VoiceArgs {
    #[arg(short, long)]
    provider: Option<String>,
    #[arg(short, long)]
    language: Option<String>,
    #[arg(long)]
    voice: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    Convert {
        text: String,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        voice: VoiceArgs,
        #[arg(long)]
        no_cache: bool,
        #[arg(long)]
        persist: bool,
    },
    Key {
        text: String,
        #[command(flatten)]
        voice: VoiceArgs,
    },
    Providers,
}

fn parse_args(args: &[&str]) -> Result<Cli, clap::Error> {
    let os_args: Vec<OsString> = args.iter().map(OsString::from).collect();
    Cli::try_parse_from(os_args)
}

#[test]
fn cli_parses_convert_command() {
    let cli = parse_args(&["tts-cache", "convert", "Hello, world!", "-o", "hello.wav"]).unwrap();
    if let Commands::Convert {
        text,
        output,
        voice,
        no_cache,
        persist,
    } = cli.command
    {
        assert_eq!(text, "Hello, world!");
        assert_eq!(output, PathBuf::from("hello.wav"));
        assert!(voice.provider.is_none());
        assert!(!no_cache);
        assert!(!persist);
    } else {
        panic!("Expected Convert command");
    }
}

#[test]
fn cli_parses_convert_with_overrides() {
    let cli = parse_args(&[
        "tts-cache",
        "convert",
        "Guten Morgen",
        "--output",
        "out.wav",
        "-p",
        "native",
        "-l",
        "de-DE",
        "--voice",
        "female",
        "--no-cache",
        "--persist",
    ])
    .unwrap();

    if let Commands::Convert {
        voice,
        no_cache,
        persist,
        ..
    } = cli.command
    {
        assert_eq!(voice.provider.as_deref(), Some("native"));
        assert_eq!(voice.language.as_deref(), Some("de-DE"));
        assert_eq!(voice.voice.as_deref(), Some("female"));
        assert!(no_cache);
        assert!(persist);
    } else {
        panic!("Expected Convert command");
    }
}

#[test]
fn cli_convert_requires_output() {
    let result = parse_args(&["tts-cache", "convert", "Hello"]);
    assert!(result.is_err());
}

#[test]
fn cli_convert_requires_text() {
    let result = parse_args(&["tts-cache", "convert", "-o", "out.wav"]);
    assert!(result.is_err());
}

#[test]
fn cli_parses_key_command() {
    let cli = parse_args(&["tts-cache", "key", "Hello", "-p", "google"]).unwrap();
    if let Commands::Key { text, voice } = cli.command {
        assert_eq!(text, "Hello");
        assert_eq!(voice.provider.as_deref(), Some("google"));
    } else {
        panic!("Expected Key command");
    }
}

#[test]
fn cli_parses_providers_command() {
    let cli = parse_args(&["tts-cache", "providers"]).unwrap();
    assert!(matches!(cli.command, Commands::Providers));
}

#[test]
fn cli_accepts_global_flags_after_subcommand() {
    let cli = parse_args(&["tts-cache", "providers", "-vv", "--config", "tts.toml"]).unwrap();
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config, Some(PathBuf::from("tts.toml")));
}

#[test]
fn cli_verbose_flag_counts() {
    let cli = parse_args(&["tts-cache", "-vvv", "providers"]).unwrap();
    assert_eq!(cli.verbose, 3);
}

#[test]
fn cli_rejects_unknown_command() {
    let result = parse_args(&["tts-cache", "speak"]);
    assert!(result.is_err());
}

#[test]
fn cli_requires_subcommand() {
    let result = parse_args(&["tts-cache"]);
    assert!(result.is_err());
}
