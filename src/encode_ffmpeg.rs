use std::{
    io::Read as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
};

use anyhow::Context as _;

use crate::foundation::error::{ZoomError, ZoomResult};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Number of frames that will be pushed; fixes the output duration.
    pub num_frames: u64,
    /// Replaced if it already exists.
    pub out_path: PathBuf,
    /// Optional audio track, trimmed to the video duration.
    pub audio: Option<PathBuf>,
}

// Translucent frame pixels are flattened over opaque black.
const BACKGROUND_RGBA: [u8; 4] = [0, 0, 0, 255];

impl EncodeConfig {
    pub fn validate(&self) -> ZoomResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ZoomError::config("encode width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(ZoomError::config("encode fps must be non-zero"));
        }
        if self.num_frames == 0 {
            return Err(ZoomError::config("cannot encode a video without frames"));
        }
        if let Some(audio) = &self.audio
            && !audio.is_file()
        {
            return Err(ZoomError::config(format!(
                "audio file '{}' does not exist",
                audio.display()
            )));
        }
        Ok(())
    }

    pub fn duration_s(&self) -> f64 {
        self.num_frames as f64 / f64::from(self.fps)
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ZoomResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Streams RGBA frames into a system `ffmpeg` producing an H.264 MP4.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    frames_written: u64,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig) -> ZoomResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(ZoomError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
        ]);

        if let Some(audio) = &cfg.audio {
            cmd.arg("-i").arg(audio);
            cmd.args([
                "-map", "0:v:0", "-map", "1:a:0", "-c:a", "aac", "-shortest",
            ]);
        } else {
            cmd.arg("-an");
        }

        // yuv420p needs even dimensions; odd sizes lose their last row/column.
        cmd.args([
            "-vf",
            "scale=trunc(iw/2)*2:trunc(ih/2)*2",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-t",
            &format!("{:.6}", cfg.duration_s()),
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ZoomError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ZoomError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ZoomError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            cfg,
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            frames_written: 0,
        })
    }

    /// Push one straight-alpha frame.
    pub fn encode_frame(&mut self, frame: &image::RgbaImage) -> ZoomResult<()> {
        if frame.width() != self.cfg.width || frame.height() != self.cfg.height {
            return Err(ZoomError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }

        flatten_to_opaque_rgba8(&mut self.scratch, frame.as_raw(), BACKGROUND_RGBA)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ZoomError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            ZoomError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> ZoomResult<()> {
        drop(self.stdin.take());

        let status = self
            .child
            .wait()
            .map_err(|e| ZoomError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ZoomError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ZoomError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ZoomError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if self.frames_written != self.cfg.num_frames {
            tracing::warn!(
                written = self.frames_written,
                expected = self.cfg.num_frames,
                "video has a different frame count than configured"
            );
        }
        Ok(())
    }
}

/// Encode an ordered, contiguous list of frame files into a video.
#[tracing::instrument(skip_all, fields(out = %cfg.out_path.display(), frames = frame_paths.len()))]
pub fn assemble_video(frame_paths: &[PathBuf], cfg: EncodeConfig) -> ZoomResult<()> {
    tracing::info!("writing video");
    if let Some(audio) = &cfg.audio {
        tracing::info!(audio = %audio.display(), "adding audio");
    }
    let mut enc = FfmpegEncoder::new(cfg)?;
    for path in frame_paths {
        let frame = image::open(path)
            .with_context(|| format!("read frame '{}'", path.display()))?
            .to_rgba8();
        enc.encode_frame(&frame)?;
    }
    enc.finish()
}

fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8], bg_rgba: [u8; 4]) -> ZoomResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ZoomError::encode(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (mul_div255(s[0] as u16, a) + mul_div255(bg_r, inv)).min(255) as u8;
        d[1] = (mul_div255(s[1] as u16, a) + mul_div255(bg_g, inv)).min(255) as u8;
        d[2] = (mul_div255(s[2] as u16, a) + mul_div255(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_config(width: u32, height: u32, fps: u32, num_frames: u64) -> EncodeConfig {
        EncodeConfig {
            width,
            height,
            fps,
            num_frames,
            out_path: PathBuf::from("out.mp4"),
            audio: None,
        }
    }

    #[test]
    fn config_validation_catches_bad_values() {
        let ok = mp4_config(10, 10, 30, 5);
        assert!(ok.validate().is_ok());
        assert!(
            EncodeConfig {
                width: 0,
                ..ok.clone()
            }
            .validate()
            .is_err()
        );
        assert!(EncodeConfig { fps: 0, ..ok.clone() }.validate().is_err());
        assert!(
            EncodeConfig {
                num_frames: 0,
                ..ok.clone()
            }
            .validate()
            .is_err()
        );
        assert!(
            EncodeConfig {
                audio: Some(PathBuf::from("/no/such/track.mp3")),
                ..ok
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn duration_follows_frame_count() {
        let cfg = mp4_config(10, 10, 10, 20);
        assert_eq!(cfg.duration_s(), 2.0);
    }

    #[test]
    fn flatten_straight_over_black_produces_expected_rgb() {
        let src = vec![255u8, 0u8, 0u8, 128u8];
        let mut dst = vec![0u8; 4];
        flatten_to_opaque_rgba8(&mut dst, &src, [0, 0, 0, 255]).unwrap();
        assert_eq!(dst, vec![128u8, 0u8, 0u8, 255u8]);
    }

    #[test]
    fn flatten_opaque_is_identity() {
        let src = vec![1u8, 2, 3, 255];
        let mut dst = vec![0u8; 4];
        flatten_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
        assert_eq!(dst, src);
    }
}
