use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Original match audio under the commentary, commentary on top,
/// cut when the video's own audio ends.
pub const COMMENTARY_MIX: &str =
    "[0:a]volume=0.4[a1];[1:a]volume=1.0[a2];[a1][a2]amix=inputs=2:duration=first[aout]";

#[derive(Debug)]
pub struct Ffmpeg {
    cmd: Command,
}

impl Ffmpeg {
    pub fn cmd(self) -> Command {
        self.cmd
    }

    pub fn args<Iter, Str>(&mut self, args: Iter) -> &mut Ffmpeg
    where
        Iter: IntoIterator<Item = Str>,
        Str: AsRef<OsStr>,
    {
        self.cmd.args(args);
        self
    }

    pub fn input<P: AsRef<Path>>(&mut self, file: P) -> &mut Ffmpeg {
        self.cmd.arg("-i").arg(file.as_ref());
        self
    }

    pub fn video_filter(&mut self, filters: Vec<&str>) -> &mut Ffmpeg {
        self.cmd.arg("-vf");
        self.cmd.arg(filters.join(","));
        self
    }

    /// Overwrite `file` with the command's output.
    pub fn output<P: AsRef<Path>>(&mut self, file: P) -> &mut Ffmpeg {
        self.cmd.arg("-y").arg(file.as_ref());
        self
    }

    /// Run to completion, failing with ffmpeg's stderr when it exits non-zero.
    pub fn run(self, what: &str) -> Result<()> {
        let output = self
            .cmd()
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to start ffmpeg to {}", what))?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "ffmpeg failed to {}: {}",
                what,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

pub fn create_ffmpeg_command() -> Ffmpeg {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "warning"]);
    cmd.stdout(Stdio::null());
    Ffmpeg { cmd }
}

pub fn create_ffprobe_command() -> Command {
    let mut cmd = Command::new("ffprobe");
    cmd.args(["-hide_banner", "-loglevel", "warning"]);
    cmd
}

/// Container duration in seconds.
pub fn media_duration(input_file: &Path) -> Result<f64> {
    let output = create_ffprobe_command()
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .arg(input_file)
        .output()
        .with_context(|| format!("Failed to run ffprobe on {}", input_file.display()))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "Failed to get video information for {}",
            input_file.display()
        ));
    }

    let info: serde_json::Value = serde_json::from_slice(&output.stdout)
        .with_context(|| "Failed to parse ffprobe output")?;
    parse_format_duration(&info)
}

fn parse_format_duration(info: &serde_json::Value) -> Result<f64> {
    info["format"]["duration"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Missing duration in video metadata"))?
        .parse::<f64>()
        .with_context(|| "Failed to parse duration as a number")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_duration() {
        let info = serde_json::json!({"format": {"duration": "312.480000"}});
        assert_eq!(parse_format_duration(&info).unwrap(), 312.48);

        let missing = serde_json::json!({"format": {}});
        assert!(parse_format_duration(&missing).is_err());
    }

    #[test]
    fn test_builder_args() {
        let mut ffmpeg = create_ffmpeg_command();
        ffmpeg
            .input("match.mp4")
            .video_filter(vec!["fps=1"])
            .output("frames/frame_%06d.jpg");
        let cmd = ffmpeg.cmd();
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-loglevel",
                "warning",
                "-i",
                "match.mp4",
                "-vf",
                "fps=1",
                "-y",
                "frames/frame_%06d.jpg"
            ]
        );
    }
}
