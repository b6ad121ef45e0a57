use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use cricket_timeline::{
    build_timeline, compile_commentary_prompt, score_lookup, LengthGovernor, ModelOutputs,
    ScoreReading, Summarizer,
};
use log::{error, info, warn};
use serde::Serialize;

use crate::config::{
    PipelineConfig, COMMENTARY_AUDIO, COMMENTARY_FINAL_TXT, COMMENTARY_RAW_TXT,
    LATENCY_REPORT_JSON, MODEL_OUTPUTS_JSON, PROMPT_TXT, SCORE_JSON, TIMELINE_JSON, FINAL_VIDEO,
};
use crate::io::{write_json, write_text};
use crate::llm::Narrator;
use crate::mux::Muxer;
use crate::ocr::{process_score_frames, ScoreReader};
use crate::status::{ProgressSink, RunStatus};
use crate::tts::SpeechChain;
use crate::video::{sampled_frame_paths, Splitter};
use crate::vision::{run_on_clips, run_on_frames, VisionModels};

/// The external services one pipeline run talks to.
pub struct Collaborators {
    pub splitter: Box<dyn Splitter>,
    /// `None` disables scoreboard reading even when the video has one.
    pub score_reader: Option<Box<dyn ScoreReader>>,
    pub vision: Box<dyn VisionModels>,
    pub narrator: Box<dyn Narrator>,
    pub summarizer: Box<dyn Summarizer>,
    pub speech: SpeechChain,
    pub muxer: Box<dyn Muxer>,
}

#[derive(Serialize, Debug, Default)]
struct LatencyReport {
    stages: Vec<StageLatency>,
    total_seconds: f64,
}

#[derive(Serialize, Debug)]
struct StageLatency {
    stage: &'static str,
    seconds: f64,
}

impl LatencyReport {
    fn record(&mut self, stage: &'static str, started: Instant) {
        let seconds = started.elapsed().as_secs_f64();
        self.total_seconds += seconds;
        self.stages.push(StageLatency { stage, seconds });
    }
}

fn notify(status: &mut RunStatus, sink: &mut dyn ProgressSink, message: &str) {
    info!("[PIPELINE] {}", message);
    status.progress(message);
    sink.notify(message);
}

/// Turns a match video into the same video with spoken commentary.
pub struct Commentator {
    config: PipelineConfig,
    services: Collaborators,
    governor: LengthGovernor,
    status: RunStatus,
    models_loaded: bool,
}

impl Commentator {
    pub fn new(config: PipelineConfig, services: Collaborators) -> Commentator {
        Commentator {
            config,
            services,
            governor: LengthGovernor::default(),
            status: RunStatus::default(),
            models_loaded: false,
        }
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Run the pipeline once. The status starts fresh and ends either
    /// `Completed` with the result path or `Error` with the failure chain.
    pub fn run(&mut self, video: &Path, has_scorecard: bool, sink: &mut dyn ProgressSink) -> &RunStatus {
        self.status.begin();
        match self.process_video(video, has_scorecard, sink) {
            Ok(result_path) => {
                info!("[PIPELINE] Done: {}", result_path.display());
                self.status.complete(result_path);
            }
            Err(e) => {
                error!("[PIPELINE] Error: {:#}", e);
                sink.notify(&format!("Processing Error: {:#}", e));
                self.status.fail(&format!("{:#}", e));
            }
        }
        &self.status
    }

    /// Every intermediate artifact is written to the work directory and stays
    /// there when a later step fails.
    pub fn process_video(
        &mut self,
        video: &Path,
        has_scorecard: bool,
        sink: &mut dyn ProgressSink,
    ) -> Result<PathBuf> {
        let config = &self.config;
        let services = &mut self.services;
        let status = &mut self.status;
        let mut latency = LatencyReport::default();

        notify(status, sink, "Step 1/7: Analyzing video structure...");
        let started = Instant::now();
        let split = services
            .splitter
            .split(video, &config.frames_dir(), &config.clips_dir())
            .with_context(|| format!("Failed to split {}", video.display()))?;
        let sampled = sampled_frame_paths(&split.frames, config.frame_subsample);
        info!(
            "Using {} of {} frames (every {}th)",
            sampled.len(),
            split.frames.len(),
            config.frame_subsample
        );
        latency.record("split", started);

        let readings: Vec<ScoreReading> = match services.score_reader.as_deref() {
            Some(reader) if has_scorecard => {
                notify(status, sink, "Step 2/7: Reading scoreboard data...");
                let started = Instant::now();
                let readings = process_score_frames(reader, &sampled, config.frame_rate);
                latency.record("scoreboard_ocr", started);
                readings
            }
            _ => {
                if has_scorecard {
                    warn!("No scoreboard reader configured, commentary will not quote the score");
                }
                notify(status, sink, "Step 2/7: OCR Skipped");
                Vec::new()
            }
        };
        write_json(config.artifact(SCORE_JSON), &readings)?;
        let scores = score_lookup(readings);

        notify(status, sink, "Step 3/7: Loading AI models...");
        if !self.models_loaded {
            let started = Instant::now();
            services.vision.load().context("Failed to load vision models")?;
            self.models_loaded = true;
            latency.record("load_models", started);
        }

        notify(status, sink, "Step 4/7: Detecting events (Visual AI)...");
        let started = Instant::now();
        let outputs = ModelOutputs {
            frames: run_on_frames(services.vision.as_ref(), &sampled, config.frame_rate)?,
            clips: run_on_clips(services.vision.as_ref(), &split.clips),
        };
        write_json(config.artifact(MODEL_OUTPUTS_JSON), &outputs)?;
        let timeline = build_timeline(&outputs.frames, &outputs.clips, &scores);
        timeline.save(config.artifact(TIMELINE_JSON))?;
        info!("Timeline has {} events", timeline.len());
        latency.record("vision", started);

        notify(status, sink, "Step 5/7: Generating Commentary Script...");
        let started = Instant::now();
        let prompt = compile_commentary_prompt(&timeline);
        write_text(config.artifact(PROMPT_TXT), &prompt)?;

        let raw = match services.narrator.generate(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                notify(status, sink, "Commentary generation failed.");
                return Err(anyhow::Error::new(e).context("Commentary generation failed"));
            }
        };
        write_text(config.artifact(COMMENTARY_RAW_TXT), &raw)?;

        let narration = match self.governor.enforce(&raw, &*services.summarizer) {
            Ok(narration) => narration,
            Err(e) => {
                notify(status, sink, "Commentary generation failed.");
                return Err(anyhow::Error::new(e).context("Commentary generation failed"));
            }
        };
        info!(
            "Final commentary: {} chars after {} summaries ({:?})",
            narration.text.chars().count(),
            narration.rounds,
            narration.state
        );
        write_text(config.artifact(COMMENTARY_FINAL_TXT), &narration.text)?;
        latency.record("commentary", started);

        notify(status, sink, "Step 6/7: Synthesizing Audio Voice...");
        let started = Instant::now();
        let audio = config.artifact(COMMENTARY_AUDIO);
        match services.speech.speak(&narration.text, &audio) {
            Ok(provider) => info!("Commentary voiced by {}", provider),
            Err(e) => {
                notify(status, sink, "TTS generation failed. Check API keys.");
                return Err(e);
            }
        }
        latency.record("speech", started);

        notify(status, sink, "Step 7/7: Finalizing production...");
        let started = Instant::now();
        let final_video = config.artifact(FINAL_VIDEO);
        if let Err(e) = services.muxer.merge(video, &audio, &final_video) {
            notify(status, sink, "Merge failed.");
            return Err(e.context("Merge failed"));
        }
        latency.record("mux", started);

        write_json(config.artifact(LATENCY_REPORT_JSON), &latency)?;
        Ok(final_video)
    }
}
