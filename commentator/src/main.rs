mod config;
use crate::config::{present, LlmArgs, PipelineConfig, ServiceArgs};
mod ffmpeg;
mod io;
mod llm;
use crate::llm::{ChatClient, Narrator};
mod mux;
use crate::mux::FfmpegMuxer;
mod ocr;
use crate::ocr::{OcrSpaceReader, ScoreReader, TesseractReader};
mod pipeline;
use crate::pipeline::{Collaborators, Commentator};
mod status;
use crate::status::RunState;
mod tts;
use crate::tts::{EdgeTtsSpeech, ElevenLabsSpeech, SpeechChain, SpeechSynthesizer};
mod video;
use crate::video::FfmpegSplitter;
mod vision;
use crate::vision::{InferenceClient, RecordedOutputs, VisionModels};

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cricket_timeline::{compile_analyst_prompt, Timeline};
use log::warn;

/// Scoreboard OCR backend
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum OcrEngine {
    /// OCR.Space hosted API (needs OCRSPACE_API_KEY)
    Ocrspace,
    /// Local tesseract binary
    Tesseract,
}

/// Live-style commentary for recorded cricket video
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Narrate a match video and mux the commentary onto it
    Run {
        /// Input video file (mp4)
        video: PathBuf,

        /// The video has no on-screen scoreboard; skip OCR
        #[arg(long)]
        no_scorecard: bool,

        /// Directory for frames, clips and every intermediate artifact
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        /// Replay a saved model_outputs.json instead of calling the inference sidecar
        #[arg(long)]
        recorded_outputs: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OcrEngine::Ocrspace)]
        ocr: OcrEngine,

        /// Run OCR and the vision models on every Nth extracted frame
        #[arg(long, default_value_t = 4)]
        subsample: usize,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        services: ServiceArgs,
    },

    /// Ask a question about the moment `--at` seconds into an analysed match
    Ask {
        question: String,

        /// Seconds into the video
        #[arg(long)]
        at: f64,

        /// Timeline written by a previous run
        #[arg(long, default_value = "timeline_for_llm.json")]
        timeline: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

fn score_reader(engine: OcrEngine, services: &ServiceArgs) -> Result<Option<Box<dyn ScoreReader>>> {
    match engine {
        OcrEngine::Ocrspace => match present(&services.ocrspace_api_key) {
            Some(key) => Ok(Some(Box::new(OcrSpaceReader::new(key)?))),
            None => {
                warn!("OCRSPACE_API_KEY is not set, scoreboard reading is disabled");
                Ok(None)
            }
        },
        OcrEngine::Tesseract => Ok(Some(Box::new(TesseractReader::new()))),
    }
}

fn speech_chain(services: &ServiceArgs) -> Result<SpeechChain> {
    let mut providers: Vec<Box<dyn SpeechSynthesizer>> = Vec::new();
    match present(&services.elevenlabs_api_key) {
        Some(key) => providers.push(Box::new(ElevenLabsSpeech::new(
            key,
            &services.elevenlabs_voice_id,
        )?)),
        None => warn!("ELEVENLABS_API_KEY is not set, using edge-tts only"),
    }
    providers.push(Box::new(EdgeTtsSpeech::default()));
    Ok(SpeechChain::new(providers))
}

#[allow(clippy::too_many_arguments)]
fn run(
    video: PathBuf,
    no_scorecard: bool,
    work_dir: PathBuf,
    recorded_outputs: Option<PathBuf>,
    ocr: OcrEngine,
    subsample: usize,
    llm: LlmArgs,
    services: ServiceArgs,
) -> Result<()> {
    if !video.is_file() {
        return Err(anyhow::anyhow!("Video not found: {}", video.display()));
    }
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create work directory: {}", work_dir.display()))?;

    let config = PipelineConfig {
        frame_subsample: subsample,
        work_dir,
        ..PipelineConfig::default()
    };

    let vision: Box<dyn VisionModels> = match recorded_outputs {
        Some(path) => Box::new(RecordedOutputs::from_file(path)?),
        None => Box::new(InferenceClient::new(&services.inference_url)?),
    };
    let chat = ChatClient::new(&llm)?;
    let speech = speech_chain(&services)?;
    println!("Speech providers: {}", speech.provider_names().join(", "));

    let collaborators = Collaborators {
        splitter: Box::new(FfmpegSplitter::new(config.frame_rate, config.clip_length)),
        score_reader: score_reader(ocr, &services)?,
        vision,
        narrator: Box::new(chat.clone()),
        summarizer: Box::new(chat),
        speech,
        muxer: Box::new(FfmpegMuxer),
    };

    println!("Processing: {}", video.display());
    let mut commentator = Commentator::new(config, collaborators);
    let mut print_progress = |message: &str| println!("  {}", message);
    commentator.run(&video, !no_scorecard, &mut print_progress);

    let status = commentator.status();
    match (status.state, &status.result_path) {
        (RunState::Completed, Some(result_path)) => {
            println!("Commentary video written to {}", result_path.display());
            Ok(())
        }
        _ => Err(anyhow::anyhow!("Pipeline failed: {}", status.message)),
    }
}

fn ask(question: &str, at: f64, timeline_path: PathBuf, llm: LlmArgs) -> Result<()> {
    let timeline = Timeline::load(&timeline_path)?;
    let context = timeline
        .context_at(at)
        .with_context(|| format!("Failed to render the event at {}s", at))?;
    let prompt = compile_analyst_prompt(question, at, &context);

    let answer = ChatClient::new(&llm)?
        .generate(&prompt)
        .context("Analyst question failed")?;
    println!("{}", answer);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            video,
            no_scorecard,
            work_dir,
            recorded_outputs,
            ocr,
            subsample,
            llm,
            services,
        } => run(
            video,
            no_scorecard,
            work_dir,
            recorded_outputs,
            ocr,
            subsample,
            llm,
            services,
        ),
        Command::Ask {
            question,
            at,
            timeline,
            llm,
        } => ask(&question, at, timeline, llm),
    }
}
