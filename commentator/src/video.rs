use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cricket_timeline::frame_index_from_filename;
use log::info;
use serde::{Deserialize, Serialize};

use crate::ffmpeg::{self, create_ffmpeg_command};
use crate::io::{overwrite_dir, write_json};

/// One extracted clip and the window of the source video it covers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClipWindow {
    pub clip_index: usize,
    pub clip_name: String,
    pub clip_path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Serialize, Debug)]
struct ClipManifest<'a> {
    clips: &'a [ClipWindow],
    total_clips: usize,
    total_saved_frames: usize,
}

/// Everything the splitter produced, frames in extraction order.
#[derive(Debug, Clone, Default)]
pub struct SplitOutput {
    pub frames: Vec<PathBuf>,
    pub clips: Vec<ClipWindow>,
}

pub trait Splitter {
    fn split(&self, video: &Path, frames_dir: &Path, clips_dir: &Path) -> Result<SplitOutput>;
}

/// Still frames at a fixed rate plus back-to-back clips of a fixed length.
#[derive(Debug, Clone)]
pub struct FfmpegSplitter {
    pub frame_rate: f64,
    pub clip_length: f64,
}

impl FfmpegSplitter {
    pub fn new(frame_rate: f64, clip_length: f64) -> FfmpegSplitter {
        FfmpegSplitter {
            frame_rate,
            clip_length,
        }
    }

    fn extract_frames(&self, video: &Path, frames_dir: &Path) -> Result<()> {
        let fps = format!("fps={}", self.frame_rate);
        let mut ffmpeg = create_ffmpeg_command();
        ffmpeg
            .input(video)
            .video_filter(vec![fps.as_str()])
            .args(["-q:v", "2"])
            .output(frames_dir.join("frame_%06d.jpg"));
        ffmpeg.run("extract frames")
    }

    fn extract_clips(&self, video: &Path, clips_dir: &Path) -> Result<()> {
        let segment_time = format!("{}", self.clip_length);
        // a keyframe at every boundary so segments cut exactly on the window
        let key_frames = format!("expr:gte(t,n_forced*{})", self.clip_length);
        let mut ffmpeg = create_ffmpeg_command();
        ffmpeg
            .input(video)
            .args(["-an", "-c:v", "libx264", "-preset", "veryfast"])
            .args(["-force_key_frames", &key_frames])
            .args(["-f", "segment", "-segment_time", &segment_time])
            .args(["-segment_start_number", "0", "-reset_timestamps", "1"])
            .output(clips_dir.join("clip_%06d.mp4"));
        ffmpeg.run("extract clips")
    }
}

impl Splitter for FfmpegSplitter {
    fn split(&self, video: &Path, frames_dir: &Path, clips_dir: &Path) -> Result<SplitOutput> {
        let duration = ffmpeg::media_duration(video)?;
        info!(
            "Splitting {} ({:.1}s) into {} fps frames and {}s clips",
            video.display(),
            duration,
            self.frame_rate,
            self.clip_length
        );

        overwrite_dir(frames_dir)?;
        overwrite_dir(clips_dir)?;
        self.extract_frames(video, frames_dir)?;
        self.extract_clips(video, clips_dir)?;

        let frames = list_files(frames_dir, "frame_", ".jpg")?;
        let clip_paths = list_files(clips_dir, "clip_", ".mp4")?;
        let clips = clip_windows(&clip_paths, self.clip_length);

        write_json(
            clips_dir.join("metadata.json"),
            &ClipManifest {
                clips: &clips,
                total_clips: clips.len(),
                total_saved_frames: frames.len(),
            },
        )?;
        info!(
            "Saved {} frames into {}, {} clips into {}",
            frames.len(),
            frames_dir.display(),
            clips.len(),
            clips_dir.display()
        );

        Ok(SplitOutput { frames, clips })
    }
}

/// Files in `dir` named `<prefix>...<suffix>`, sorted by name.
pub fn list_files(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy())
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(suffix))
        })
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

/// Windows for clips numbered from zero, each `clip_length` seconds long.
pub fn clip_windows(clip_paths: &[PathBuf], clip_length: f64) -> Vec<ClipWindow> {
    clip_paths
        .iter()
        .filter_map(|path| {
            let clip_name = path.file_name()?.to_string_lossy().to_string();
            let clip_index = clip_name
                .strip_prefix("clip_")
                .and_then(|s| s.strip_suffix(".mp4"))
                .and_then(|s| s.parse::<usize>().ok())?;
            let start_time = clip_index as f64 * clip_length;
            Some(ClipWindow {
                clip_index,
                clip_name,
                clip_path: path.clone(),
                start_time,
                end_time: start_time + clip_length,
            })
        })
        .collect()
}

/// Every `step`-th frame, starting with the first. A step of 0 or 1 keeps all.
pub fn sampled_frame_paths(frames: &[PathBuf], step: usize) -> Vec<PathBuf> {
    frames.iter().step_by(step.max(1)).cloned().collect()
}

/// Seconds of video played by the end of an extracted frame, from its
/// 1-based file number: `frame_000040.jpg` at 1 fps is 40s.
pub fn frame_end_time_from_path(frame: &Path, frame_rate: f64) -> Option<f64> {
    frame_index_from_filename(frame).map(|index| (index + 1) as f64 / frame_rate)
}
