//! Trim: cut a `[start, stop)` range of a song into a new file.
//!
//! Export is delegated to ffmpeg; this module builds the invocation.

use crate::error::TrimError;
use crate::track;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRequest {
    pub start: Duration,
    pub stop: Duration,
}

impl TrimRequest {
    pub fn new(start: Duration, stop: Duration) -> Result<Self, TrimError> {
        if start >= stop {
            return Err(TrimError::InvalidRange { start, stop });
        }
        Ok(TrimRequest { start, stop })
    }

    pub fn length(&self) -> Duration {
        self.stop - self.start
    }
}

/// File name of the trimmed copy of `song`: `<name>-trimmed<ext>`.
pub fn trimmed_name(song: &str) -> String {
    let ext = match track::extension(song) {
        "" => ".mp3",
        ext => ext,
    };
    format!("{}-trimmed{}", track::song_name(song), ext)
}

/// Build the ffmpeg argument list extracting `request` from `input` into
/// `output`. The output format follows the output extension.
pub fn build_trim_args(input: &Path, output: &Path, request: &TrimRequest) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.display().to_string(),
        "-ss".into(),
        format!("{:.3}", request.start.as_secs_f64()),
        "-to".into(),
        format!("{:.3}", request.stop.as_secs_f64()),
    ];

    let is_wav = output
        .extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if is_wav {
        args.push("-acodec".into());
        args.push("pcm_s16le".into());
    } else {
        args.push("-q:a".into());
        args.push("2".into());
    }

    args.push(output.display().to_string());
    args
}

/// Something that can cut a range out of an audio file.
pub trait Trimmer {
    fn trim(&self, input: &Path, output: &Path, request: &TrimRequest) -> Result<(), TrimError>;
}

/// Runs the system `ffmpeg` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegTrimmer;

impl Trimmer for FfmpegTrimmer {
    fn trim(&self, input: &Path, output: &Path, request: &TrimRequest) -> Result<(), TrimError> {
        let args = build_trim_args(input, output, request);
        let status = Command::new("ffmpeg").args(&args).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(TrimError::Failed(status.code().unwrap_or(-1)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn request_requires_start_before_stop() {
        assert!(TrimRequest::new(secs(5), secs(5)).is_err());
        assert!(TrimRequest::new(secs(6), secs(5)).is_err());
        assert_eq!(TrimRequest::new(secs(5), secs(60)).unwrap().length(), secs(55));
    }

    #[test]
    fn trimmed_name_keeps_extension() {
        assert_eq!(trimmed_name("Song.mp3"), "Song-trimmed.mp3");
        assert_eq!(trimmed_name("a.b.flac"), "a.b-trimmed.flac");
        assert_eq!(trimmed_name("raw"), "raw-trimmed.mp3");
    }

    #[test]
    fn build_args_trim_range() {
        let req = TrimRequest::new(Duration::from_millis(5250), secs(60)).unwrap();
        let args = build_trim_args(Path::new("in.mp3"), Path::new("out.mp3"), &req);
        let ss = args.iter().position(|a| a == "-ss").expect("-ss present");
        assert_eq!(args[ss + 1], "5.250");
        let to = args.iter().position(|a| a == "-to").expect("-to present");
        assert_eq!(args[to + 1], "60.000");
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp3"));
        assert!(args.contains(&"-q:a".to_string()));
    }

    #[test]
    fn build_args_wav_output() {
        let req = TrimRequest::new(secs(0), secs(1)).unwrap();
        let args = build_trim_args(Path::new("in.mp3"), Path::new("out.WAV"), &req);
        assert!(args.contains(&"pcm_s16le".to_string()));
        assert!(!args.contains(&"-q:a".to_string()));
    }
}
