use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::ffmpeg::{create_ffmpeg_command, Ffmpeg, COMMENTARY_MIX};

/// Puts the commentary track onto the video.
pub trait Muxer {
    /// Lay the commentary over the video's own audio.
    fn mix(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Use the commentary as the only audio track.
    fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Mix, or replace the audio when mixing fails (a video without sound
    /// has nothing to mix with). Fails only when both attempts fail.
    fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        info!("Merging {} + {} -> {}", video.display(), audio.display(), output.display());
        match self.mix(video, audio, output) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Mixing failed (maybe the video has no audio?), replacing instead: {:#}", e);
                self.replace_audio(video, audio, output)
                    .context("Fallback audio replacement failed")
            }
        }
    }
}

pub fn mix_command(video: &Path, audio: &Path, output: &Path) -> Ffmpeg {
    let mut ffmpeg = create_ffmpeg_command();
    ffmpeg
        .input(video)
        .input(audio)
        .args(["-filter_complex", COMMENTARY_MIX])
        .args(["-map", "0:v", "-map", "[aout]"])
        .args(["-c:v", "copy", "-c:a", "aac"])
        .output(output);
    ffmpeg
}

pub fn replace_audio_command(video: &Path, audio: &Path, output: &Path) -> Ffmpeg {
    let mut ffmpeg = create_ffmpeg_command();
    ffmpeg
        .input(video)
        .input(audio)
        .args(["-c:v", "copy", "-c:a", "aac"])
        .args(["-map", "0:v", "-map", "1:a"])
        .output(output);
    ffmpeg
}

#[derive(Debug, Default)]
pub struct FfmpegMuxer;

impl Muxer for FfmpegMuxer {
    fn mix(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        mix_command(video, audio, output).run("mix commentary into the match audio")
    }

    fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        replace_audio_command(video, audio, output).run("replace the audio track")
    }
}
