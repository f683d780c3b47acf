// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use dualang::app_config::{self, Config, SynthesisEngine, TranslationStrategy};
use dualang::app_controller::{Controller, DrillReport, FromAudioRequest, FromTextRequest};
use dualang::audio::ExportFormat;
use dualang::pipeline::CancelFlag;

/// CLI Wrapper for TranslationStrategy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationStrategy {
    Deepl,
    Openai,
    Ollama,
    Fake,
}

impl From<CliTranslationStrategy> for TranslationStrategy {
    fn from(cli_strategy: CliTranslationStrategy) -> Self {
        match cli_strategy {
            CliTranslationStrategy::Deepl => TranslationStrategy::DeepL,
            CliTranslationStrategy::Openai => TranslationStrategy::OpenAI,
            CliTranslationStrategy::Ollama => TranslationStrategy::Ollama,
            CliTranslationStrategy::Fake => TranslationStrategy::Fake,
        }
    }
}

/// CLI Wrapper for SynthesisEngine to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSynthesisEngine {
    Google,
    Openai,
    Tone,
}

impl From<CliSynthesisEngine> for SynthesisEngine {
    fn from(cli_engine: CliSynthesisEngine) -> Self {
        match cli_engine {
            CliSynthesisEngine::Google => SynthesisEngine::Google,
            CliSynthesisEngine::Openai => SynthesisEngine::OpenAI,
            CliSynthesisEngine::Tone => SynthesisEngine::Tone,
        }
    }
}

/// CLI Wrapper for ExportFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliExportFormat {
    Mp3,
    Wav,
    Ogg,
    Flac,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(cli_format: CliExportFormat) -> Self {
        match cli_format {
            CliExportFormat::Mp3 => ExportFormat::Mp3,
            CliExportFormat::Wav => ExportFormat::Wav,
            CliExportFormat::Ogg => ExportFormat::Ogg,
            CliExportFormat::Flac => ExportFormat::Flac,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by both drill commands
#[derive(clap::Args, Debug)]
struct DrillArgs {
    /// Output file or directory (defaults to the input's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sound played between blocks (defaults to a short chime)
    #[arg(long)]
    transition_sound: Option<PathBuf>,

    /// How many times the original line is played per block
    #[arg(long)]
    target_repeat: Option<usize>,

    /// How many times the translation is played per block
    #[arg(long)]
    translation_repeat: Option<usize>,

    /// Silence after each played segment, in milliseconds
    #[arg(long, value_name = "MS")]
    silent_interval: Option<u64>,

    /// Language of the translation (e.g., 'en', 'fr')
    #[arg(long)]
    tr_lang: Option<String>,

    /// Speech synthesis engine
    #[arg(long, value_enum)]
    tts_engine: Option<CliSynthesisEngine>,

    /// Output audio format (an output file extension takes precedence)
    #[arg(long, value_enum)]
    format: Option<CliExportFormat>,

    /// Encoder bitrate, e.g. 192k
    #[arg(long)]
    bitrate: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct FromAudioArgs {
    /// Audio file or video container
    #[arg(value_name = "MEDIA")]
    media: PathBuf,

    /// Subtitle file (.srt, .ass, .vtt); looked up next to the media when omitted
    #[arg(value_name = "SUBTITLE")]
    subtitle: Option<PathBuf>,

    /// Number of subtitles to skip
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Maximum number of subtitles to drill
    #[arg(long)]
    limit: Option<usize>,

    /// Translation strategy
    #[arg(long, value_enum)]
    tr_strategy: Option<CliTranslationStrategy>,

    /// Audio track to use (1-based number or language code), skips the prompt
    #[arg(long)]
    track: Option<String>,

    /// Append the whole audio track after the drill
    #[arg(long, overrides_with = "no_full_track")]
    full_track: bool,

    /// Do not append the whole audio track after the drill
    #[arg(long)]
    no_full_track: bool,

    #[command(flatten)]
    drill: DrillArgs,
}

#[derive(Parser, Debug)]
struct FromTextArgs {
    /// JSON array of sentence objects keyed by language
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Language of the sentences being learned
    #[arg(long)]
    target_lang: Option<String>,

    /// JSON key of the target-language text (defaults to the target language)
    #[arg(long)]
    target_key: Option<String>,

    /// JSON key of the translation text (defaults to the translation language)
    #[arg(long)]
    tr_key: Option<String>,

    #[command(flatten)]
    drill: DrillArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a drill from a media file and its subtitles
    #[command(name = "fromaudio")]
    FromAudio(FromAudioArgs),

    /// Build a drill from a JSON sentence list
    #[command(name = "fromtext")]
    FromText(FromTextArgs),

    /// Generate shell completions for dualang
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// dualang - bilingual listening drills from subtitled media
///
/// Plays every subtitle line in the original language, then its spoken
/// translation, separated by a short transition sound.
#[derive(Parser, Debug)]
#[command(name = "dualang")]
#[command(version)]
#[command(about = "Bilingual listen-and-repeat drills from subtitled media")]
#[command(long_about = "dualang cuts a media file along its subtitles and interleaves every line with a spoken translation.

EXAMPLES:
    dualang fromaudio movie.mkv                          # Subtitles looked up next to the movie
    dualang fromaudio movie.mkv movie.ja.srt -o drills/  # Explicit subtitles and output directory
    dualang fromaudio song.mp3 --offset 10 --limit 20    # Drill lines 11 to 30
    dualang fromaudio movie.mkv --track 2 --no-full-track
    dualang fromaudio movie.mkv --tr-strategy fake --tts-engine tone   # Offline dry run
    dualang fromtext sentences.json --target-lang ja --tr-lang en
    dualang completions bash > dualang.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys may also come from DEEPL_API_KEY and
    OPENAI_API_KEY.

TRANSLATION STRATEGIES:
    deepl   - DeepL API (requires API key)
    openai  - OpenAI chat completions (requires API key)
    ollama  - Local Ollama server (default: llama3.2:3b)
    fake    - Placeholder text, no network")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Info until the config and flags are known
    if CustomLogger::init(LevelFilter::Info).is_err() {
        eprintln!("Failed to initialize logger");
    }

    let cli = CommandLineOptions::parse();
    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "dualang", &mut std::io::stdout());
            return ExitCode::SUCCESS;
        }
        Commands::FromAudio(args) => run_from_audio(args).await,
        Commands::FromText(args) => run_from_text(args).await,
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the config and apply the flags shared by both commands
fn load_config(args: &DrillArgs) -> Result<Config> {
    let cli_level = if args.verbose {
        Some(app_config::LogLevel::Debug)
    } else {
        args.log_level.clone().map(Into::into)
    };
    if let Some(level) = &cli_level {
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&args.config_path)?;

    if let Some(path) = &args.transition_sound {
        config.drill.transition_sound = Some(path.clone());
    }
    if let Some(count) = args.target_repeat {
        config.drill.target_repeat = count;
    }
    if let Some(count) = args.translation_repeat {
        config.drill.translation_repeat = count;
    }
    if let Some(ms) = args.silent_interval {
        config.drill.interval_ms = ms;
    }
    if let Some(lang) = &args.tr_lang {
        config.translation_language = lang.clone();
    }
    if let Some(engine) = &args.tts_engine {
        config.synthesis.engine = engine.clone().into();
    }
    if let Some(format) = &args.format {
        config.audio.format = format.clone().into();
    }
    if let Some(bitrate) = &args.bitrate {
        config.audio.bitrate = bitrate.clone();
    }

    match cli_level {
        Some(level) => config.log_level = level,
        None => log::set_max_level(config.log_level.to_level_filter()),
    }
    Ok(config)
}

/// Cancel flag raised by Ctrl-C
fn install_interrupt_handler() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current subtitle");
            flag.cancel();
        }
    });
    cancel
}

async fn run_from_audio(args: FromAudioArgs) -> Result<DrillReport> {
    let mut config = load_config(&args.drill)?;
    if let Some(strategy) = &args.tr_strategy {
        config.translation.strategy = strategy.clone().into();
    }
    if args.no_full_track {
        config.drill.append_full_track = false;
    } else if args.full_track {
        config.drill.append_full_track = true;
    }

    let controller = Controller::with_config(config)?.with_progress(true);
    let request = FromAudioRequest {
        media: args.media,
        subtitle: args.subtitle,
        output: args.drill.output,
        offset: args.offset,
        limit: args.limit,
        track: args.track,
    };
    let cancel = install_interrupt_handler();
    controller.run_from_audio(&request, &cancel).await
}

async fn run_from_text(args: FromTextArgs) -> Result<DrillReport> {
    let mut config = load_config(&args.drill)?;
    if let Some(lang) = &args.target_lang {
        config.source_language = lang.clone();
    }
    // Sentence drills never call a translation service
    config.translation.strategy = TranslationStrategy::Fake;

    let controller = Controller::with_config(config)?.with_progress(true);
    let request = FromTextRequest {
        input: args.input,
        output: args.drill.output,
        target_key: args.target_key,
        translation_key: args.tr_key,
    };
    let cancel = install_interrupt_handler();
    controller.run_from_text(&request, &cancel).await
}
