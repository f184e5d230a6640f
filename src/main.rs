use clap::{Args, Parser, Subcommand};
use log::info;
use speechless::audio::FfmpegCodec;
use speechless::config::{CloudRunConfig, LocalRunConfig, DEFAULT_CHUNK_SIZE_MB};
use speechless::export::OutputFormat;
use speechless::segmenter::SizePolicy;
use speechless::staging::{StagingConfig, DEFAULT_BLOB_PATH, DEFAULT_BUCKET};
use speechless::transcription::{
    list_models, LongRunningConfig, RecognitionConfig, RemoteTranscriptionConfig,
    DEFAULT_TRANSCRIPTIONS_URL,
};
use speechless::{logging, Stage, TranscribeError};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "speechless", version)]
#[command(about = "Transcribe long recordings with remote speech-to-text services")]
struct Cli {
    /// Debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split locally and transcribe each chunk through an OpenAI-compatible API.
    Local(LocalArgs),
    /// Stage in Cloud Storage and run Google long-running recognition.
    Cloud(CloudArgs),
    /// List models offered by an OpenAI-compatible server.
    Models(ModelsArgs),
}

#[derive(Args)]
struct ToolArgs {
    /// ffmpeg binary used for non-WAV sources.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,

    #[arg(long, default_value = "ffprobe")]
    ffprobe: String,
}

impl ToolArgs {
    fn codec(&self) -> FfmpegCodec {
        FfmpegCodec::new(Some(self.ffmpeg.clone()), Some(self.ffprobe.clone()))
    }
}

#[derive(Args)]
struct LocalArgs {
    /// Audio file to transcribe.
    file: PathBuf,

    /// Per-chunk size ceiling in MB (1 MB = 1024 * 1024 bytes).
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE_MB)]
    chunk_size_mb: f64,

    /// Full URL of the audio/transcriptions endpoint.
    #[arg(long, default_value = DEFAULT_TRANSCRIPTIONS_URL)]
    api_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, default_value = "whisper-1")]
    model: String,

    /// Response format requested from the API (srt, vtt, text, json, verbose_json).
    #[arg(long, default_value = "srt")]
    response_format: String,

    /// Chunks submitted at once. Output order does not depend on it.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Measure each chunk and re-split any that exceed the ceiling.
    #[arg(long)]
    enforce_size: bool,

    /// Write chunks here instead of next to the source.
    #[arg(long)]
    chunk_dir: Option<PathBuf>,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Args)]
struct CloudArgs {
    /// Audio or video file to transcribe.
    file: PathBuf,

    #[arg(long, default_value = DEFAULT_BUCKET)]
    bucket: String,

    /// Object name prefix, used verbatim.
    #[arg(long, default_value = DEFAULT_BLOB_PATH)]
    blob_path: String,

    #[arg(long, default_value = "he-IL")]
    language: String,

    #[arg(long, default_value_t = 2)]
    channels: u16,

    #[arg(long, default_value = "ENCODING_UNSPECIFIED")]
    encoding: String,

    /// Where the converted FLAC is written before upload.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Key the object by content hash and skip re-uploading identical audio.
    #[arg(long)]
    dedup: bool,

    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,

    /// Output format: text, srt or vtt.
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Print right-to-left text in logical order.
    #[arg(long)]
    no_bidi: bool,

    /// OAuth access token for Cloud Storage and Speech-to-Text.
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Speech-to-Text API key, sent as the `key` query parameter.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    speech_api_key: Option<String>,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Args)]
struct ModelsArgs {
    /// Server host, e.g. http://localhost:8000
    #[arg(long, default_value = "https://api.openai.com")]
    api_url: String,

    /// Path of the models listing.
    #[arg(long)]
    models_path: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl LocalArgs {
    fn into_config(self) -> (PathBuf, LocalRunConfig) {
        let api = RemoteTranscriptionConfig::new(self.api_url, self.model, self.api_key)
            .with_response_format(self.response_format);
        let config = LocalRunConfig {
            chunk_size_mb: self.chunk_size_mb,
            api,
            concurrency: self.concurrency,
            size_policy: if self.enforce_size {
                SizePolicy::Enforce
            } else {
                SizePolicy::Estimate
            },
            output_dir: self.chunk_dir,
            ffmpeg: self.tools.codec(),
        };
        (self.file, config)
    }
}

impl CloudArgs {
    fn into_config(self) -> (PathBuf, CloudRunConfig) {
        let config = CloudRunConfig {
            staging: StagingConfig {
                bucket: self.bucket,
                blob_path: self.blob_path,
                work_dir: self.work_dir,
                dedup: self.dedup,
            },
            speech: LongRunningConfig {
                api_key: self.speech_api_key,
                poll_interval: Duration::from_secs(self.poll_interval_secs),
                ..LongRunningConfig::default()
            },
            recognition: RecognitionConfig {
                language_code: self.language,
                encoding: self.encoding,
                channel_count: self.channels,
            },
            format: self.format,
            bidi: !self.no_bidi,
            ffmpeg: self.tools.codec(),
            ..CloudRunConfig::default()
        }
        .with_access_token(self.access_token);
        (self.file, config)
    }
}

async fn run(command: Command) -> speechless::Result<String> {
    match command {
        Command::Local(args) => {
            let (file, config) = args.into_config();
            info!("[speechless] local transcription of {}", file.display());
            config.pipeline_for(&file)?.run(&file).await
        }
        Command::Cloud(args) => {
            let (file, config) = args.into_config();
            info!("[speechless] cloud transcription of {}", file.display());
            config.pipeline()?.run(&file).await
        }
        Command::Models(args) => {
            let ids = list_models(
                &args.api_url,
                args.models_path.as_deref(),
                args.api_key.as_deref(),
            )
            .await?;
            Ok(ids.join("\n"))
        }
    }
}

fn print_output(text: &str) -> speechless::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match logging::init_logger(logging::level_from_flags(cli.verbose, cli.quiet)) {
        Ok(path) => info!("[speechless] logging to {}", path.display()),
        Err(e) => eprintln!("warning: logging disabled: {}", e),
    }

    let result = match run(cli.command).await {
        Ok(text) => print_output(&text),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(e: &TranscribeError) {
    match e.stage() {
        Stage::Setup => eprintln!("error: {}", e),
        stage => eprintln!("error during {}: {}", stage, e),
    }
}
