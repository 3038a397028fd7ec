//! ffmpeg subprocess backend.
//!
//! Sources are decoded to raw RGBA / f32le on stdout. The video track is
//! encoded by one ffmpeg process fed through a bounded channel; audio is
//! spooled to a raw file. Both land in a temporary directory next to the
//! destination and are muxed into place on finalize, so an aborted export
//! never leaves a partial file at the destination.

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, SendTimeoutError, Sender};
use reel_common::config::ExportDefaults;
use reel_common::error::{ExportError, ExportResult};
use reel_project_model::export::{ContainerFormat, VideoCodec};
use serde::Deserialize;
use tempfile::TempDir;

use crate::cancel::{CancelToken, CancelWaker};
use crate::frame::PixelBuffer;
use crate::media::{
    AudioChunk, AudioReader, AudioSink, AudioStreamInfo, ContainerWriter, DecodedFrame,
    FrameSink, MediaBackend, MediaInfo, OutputConfig, VideoDecoder, VideoStreamInfo,
    WriterHandles,
};

/// Raw frames queued between the frame writer and the encoder's stdin.
const ENCODER_QUEUE: usize = 8;
const AUDIO_CHUNK_FRAMES: usize = 1024;
/// How long a full encoder queue is waited on between cancel checks.
const FEED_WAIT: Duration = Duration::from_millis(20);

/// [`MediaBackend`] driving the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &ExportDefaults) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone())
    }

    fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-nostdin", "-v", "error"]);
        cmd
    }
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg) && command_exists(&self.ffprobe)
    }

    fn probe(&self, path: &Path) -> ExportResult<MediaInfo> {
        if !path.exists() {
            return Err(ExportError::source_track_missing(path.display().to_string()));
        }
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| ExportError::decode(path.display().to_string(), format!("Failed to start ffprobe: {e}")))?;
        if !output.status.success() {
            return Err(ExportError::decode(
                path.display().to_string(),
                format!(
                    "ffprobe failed (status {}): {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        parse_probe(&String::from_utf8_lossy(&output.stdout))
            .map_err(|msg| ExportError::decode(path.display().to_string(), msg))
    }

    fn open_video(
        &self,
        path: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> ExportResult<Box<dyn VideoDecoder>> {
        let label = stream_label(path);
        let video = self
            .probe(path)?
            .video
            .ok_or_else(|| ExportError::source_track_missing(label.clone()))?;
        if video.width == 0 || video.height == 0 || video.fps <= 0.0 {
            return Err(ExportError::decode(label, "video stream has no usable size or rate"));
        }

        let mut cmd = self.ffmpeg();
        cmd.args(["-ss", &format!("{start_secs:.6}"), "-t", &format!("{duration_secs:.6}")])
            .arg("-i")
            .arg(path)
            .args(["-map", "0:v:0", "-an"])
            // Constant rate so frame n sits at n / fps.
            .args(["-vf", &format!("fps={}", video.fps)])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-"]);
        let (process, stdout) = FfmpegProcess::spawn_reader(cmd, &label)
            .map_err(|msg| ExportError::decode(label.clone(), msg))?;

        tracing::debug!(
            stream = %label,
            width = video.width,
            height = video.height,
            fps = video.fps,
            start_secs,
            duration_secs,
            "Opened video decoder"
        );
        Ok(Box::new(RawVideoDecoder {
            label,
            process: Some(process),
            stdout: BufReader::new(stdout),
            width: video.width,
            height: video.height,
            fps: video.fps,
            index: 0,
        }))
    }

    fn open_audio(
        &self,
        path: &Path,
        start_secs: f64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> ExportResult<Box<dyn AudioReader>> {
        let label = stream_label(path);
        if self.probe(path)?.audio.is_none() {
            return Err(ExportError::source_track_missing(label));
        }

        let mut cmd = self.ffmpeg();
        cmd.args(["-ss", &format!("{start_secs:.6}"), "-t", &format!("{duration_secs:.6}")])
            .arg("-i")
            .arg(path)
            .args(["-map", "0:a:0", "-vn"])
            .args(["-f", "f32le", "-ac", "2", "-ar", &sample_rate.to_string(), "-"]);
        let (process, stdout) = FfmpegProcess::spawn_reader(cmd, &label)
            .map_err(|msg| ExportError::decode(label.clone(), msg))?;

        Ok(Box::new(RawAudioReader {
            label,
            process: Some(process),
            stdout: BufReader::new(stdout),
            sample_rate,
            frames_read: 0,
        }))
    }

    fn load_image(&self, path: &Path) -> ExportResult<PixelBuffer> {
        let label = stream_label(path);
        let video = self
            .probe(path)?
            .video
            .ok_or_else(|| ExportError::decode(label.clone(), "not an image"))?;
        let output = self
            .ffmpeg()
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .output()
            .map_err(|e| ExportError::decode(label.clone(), format!("Failed to start ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(ExportError::decode(
                label,
                format!(
                    "image decode failed (status {}): {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        PixelBuffer::from_rgba(video.width, video.height, output.stdout)
    }

    fn create_writer(&self, config: &OutputConfig) -> ExportResult<WriterHandles> {
        if config.codec == VideoCodec::ProRes && config.format != ContainerFormat::Mov {
            return Err(ExportError::invalid("ProRes output requires a MOV container"));
        }
        if config.width == 0 || config.height == 0 || config.fps <= 0.0 {
            return Err(ExportError::invalid("output size and rate must be positive"));
        }
        let parent = match config.destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(".reel-export-")
            .tempdir_in(&parent)?;
        let video_path = staging
            .path()
            .join(format!("video.{}", config.format.extension()));

        let mut cmd = self.ffmpeg();
        cmd.args(["-y", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{}x{}", config.width, config.height)])
            .args(["-r", &config.fps.to_string()])
            .args(["-i", "-"])
            .args(video_codec_args(config.codec, config.video_bitrate))
            .args(container_args(config.format))
            .arg(&video_path);
        let (process, stdin) =
            FfmpegProcess::spawn_writer(cmd, "encoder").map_err(ExportError::encode)?;
        tracing::info!(
            pid = process.id(),
            codec = ?config.codec,
            width = config.width,
            height = config.height,
            fps = config.fps,
            bitrate = ?config.video_bitrate,
            "Video encoder started"
        );

        let encoder = Arc::new(Mutex::new(Some(process)));
        let (sender, receiver) = bounded::<Vec<u8>>(ENCODER_QUEUE);
        let feeder = std::thread::Builder::new()
            .name("reel-encoder-feed".to_string())
            .spawn(move || -> std::io::Result<()> {
                let mut stdin = BufWriter::new(stdin);
                for frame in receiver {
                    stdin.write_all(&frame)?;
                }
                stdin.flush()
            })?;

        let video = FfmpegFrameSink {
            sender: Some(sender),
            feeder: Some(feeder),
            encoder: encoder.clone(),
            frame_bytes: PixelBuffer::bytes_for(config.width, config.height),
            finished: false,
        };

        let (audio, audio_path): (Option<Box<dyn AudioSink>>, _) = match config.audio {
            Some(_) => {
                let path = staging.path().join("audio.f32le");
                let file = std::fs::File::create(&path)?;
                (
                    Some(Box::new(RawAudioSink {
                        file: Some(BufWriter::new(file)),
                    })),
                    Some(path),
                )
            }
            None => (None, None),
        };

        let container = FfmpegContainer {
            ffmpeg: self.clone(),
            config: config.clone(),
            staging,
            video_path,
            audio_path,
            encoder,
        };
        Ok(WriterHandles {
            video: Box::new(video),
            audio,
            container: Box::new(container),
        })
    }
}

/// A running ffmpeg child with its stderr drained on a side thread.
struct FfmpegProcess {
    label: String,
    child: Child,
    stderr: Option<JoinHandle<String>>,
    /// Disconnects once stderr hits EOF, which is when the child exits.
    exited: Receiver<()>,
}

/// Turns a cancel into a message a `select!` can wait on.
struct ChannelWaker(Sender<()>);

impl CancelWaker for ChannelWaker {
    fn wake(&self) {
        let _ = self.0.try_send(());
    }
}

impl FfmpegProcess {
    fn spawn(mut cmd: Command, label: &str, stdin: Stdio, stdout: Stdio) -> Result<Self, String> {
        tracing::debug!(cmd = ?cmd, "Spawning ffmpeg");
        let mut child = cmd
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Failed to start ffmpeg: {e}"))?;
        let (exit_tx, exited) = bounded(0);
        let stderr = child.stderr.take().map(|pipe| drain_stderr(pipe, exit_tx));
        Ok(Self {
            label: label.to_string(),
            child,
            stderr,
            exited,
        })
    }

    fn spawn_reader(cmd: Command, label: &str) -> Result<(Self, ChildStdout), String> {
        let mut process = Self::spawn(cmd, label, Stdio::null(), Stdio::piped())?;
        let stdout = process
            .child
            .stdout
            .take()
            .ok_or_else(|| "Failed to capture ffmpeg stdout".to_string())?;
        Ok((process, stdout))
    }

    fn spawn_writer(cmd: Command, label: &str) -> Result<(Self, ChildStdin), String> {
        let mut process = Self::spawn(cmd, label, Stdio::piped(), Stdio::null())?;
        let stdin = process
            .child
            .stdin
            .take()
            .ok_or_else(|| "Failed to capture ffmpeg stdin".to_string())?;
        Ok((process, stdin))
    }

    fn id(&self) -> u32 {
        self.child.id()
    }

    /// Wait for exit; a non-zero status becomes the error text.
    fn wait(mut self) -> Result<(), String> {
        let status = self
            .child
            .wait()
            .map_err(|e| format!("Failed to wait on ffmpeg: {e}"))?;
        let stderr_output = self
            .stderr
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(format!(
                "ffmpeg {} failed (status {}): {}",
                self.label,
                status,
                stderr_output.trim()
            ))
        }
    }

    /// [`Self::wait`], except a cancel kills the child and returns early.
    fn wait_or_cancel(self, cancel: &CancelToken) -> ExportResult<()> {
        let (wake_tx, wake_rx) = bounded(1);
        let waker = Arc::new(ChannelWaker(wake_tx));
        cancel.register(&waker);
        select! {
            recv(self.exited) -> _ => {}
            recv(wake_rx) -> _ => {
                tracing::info!(process = %self.label, "Cancelled while waiting on ffmpeg");
                // Dropping `self` kills the child.
                return Err(ExportError::Cancelled);
            }
        }
        self.wait().map_err(ExportError::encode)
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            tracing::debug!(pid = self.child.id(), process = %self.label, "Killing ffmpeg");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

// Drain stderr concurrently so ffmpeg never blocks on a full pipe.
// `exit_tx` is dropped at EOF.
fn drain_stderr(stderr: ChildStderr, exit_tx: Sender<()>) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let _exit_tx = exit_tx;
        let mut reader = BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    })
}

/// Fill `buf` unless the stream ends first; returns the bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

struct RawVideoDecoder {
    label: String,
    process: Option<FfmpegProcess>,
    stdout: BufReader<ChildStdout>,
    width: u32,
    height: u32,
    fps: f64,
    index: u64,
}

impl RawVideoDecoder {
    fn end_of_stream(&mut self) -> ExportResult<Option<DecodedFrame>> {
        if let Some(process) = self.process.take() {
            process
                .wait()
                .map_err(|msg| ExportError::decode(self.label.clone(), msg))?;
            tracing::debug!(stream = %self.label, frames = self.index, "Video decoder finished");
        }
        Ok(None)
    }
}

impl VideoDecoder for RawVideoDecoder {
    fn next_frame(&mut self) -> ExportResult<Option<DecodedFrame>> {
        if self.process.is_none() {
            return Ok(None);
        }
        let mut data = vec![0u8; PixelBuffer::bytes_for(self.width, self.height)];
        let read = read_full(&mut self.stdout, &mut data)
            .map_err(|e| ExportError::decode(self.label.clone(), e.to_string()))?;
        if read == 0 {
            return self.end_of_stream();
        }
        if read < data.len() {
            return Err(ExportError::decode(
                self.label.clone(),
                format!("truncated frame {} ({read} of {} bytes)", self.index, data.len()),
            ));
        }
        let image = PixelBuffer::from_rgba(self.width, self.height, data)?;
        let frame = DecodedFrame {
            pts_secs: self.index as f64 / self.fps,
            image: Arc::new(image),
        };
        self.index += 1;
        Ok(Some(frame))
    }
}

struct RawAudioReader {
    label: String,
    process: Option<FfmpegProcess>,
    stdout: BufReader<ChildStdout>,
    sample_rate: u32,
    frames_read: u64,
}

impl AudioReader for RawAudioReader {
    fn next_chunk(&mut self) -> ExportResult<Option<AudioChunk>> {
        if self.process.is_none() {
            return Ok(None);
        }
        // Stereo f32: 8 bytes per sample frame.
        let mut bytes = vec![0u8; AUDIO_CHUNK_FRAMES * 8];
        let read = read_full(&mut self.stdout, &mut bytes)
            .map_err(|e| ExportError::decode(self.label.clone(), e.to_string()))?;
        let whole = read - read % 8;
        if whole == 0 {
            if let Some(process) = self.process.take() {
                process
                    .wait()
                    .map_err(|msg| ExportError::decode(self.label.clone(), msg))?;
            }
            return Ok(None);
        }
        let samples: Vec<f32> = bytes[..whole]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let chunk = AudioChunk {
            sample_rate: self.sample_rate,
            channels: 2,
            start_secs: self.frames_read as f64 / self.sample_rate as f64,
            samples,
        };
        self.frames_read += (whole / 8) as u64;
        Ok(Some(chunk))
    }
}

struct FfmpegFrameSink {
    sender: Option<Sender<Vec<u8>>>,
    feeder: Option<JoinHandle<std::io::Result<()>>>,
    encoder: Arc<Mutex<Option<FfmpegProcess>>>,
    frame_bytes: usize,
    finished: bool,
}

impl FfmpegFrameSink {
    fn take_encoder(&self) -> Option<FfmpegProcess> {
        self.encoder.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl FrameSink for FfmpegFrameSink {
    fn append(
        &mut self,
        index: u64,
        _pts_secs: f64,
        frame: &PixelBuffer,
        cancel: &CancelToken,
    ) -> ExportResult<()> {
        if frame.data().len() != self.frame_bytes {
            return Err(ExportError::encode_at(index, "frame size differs from encoder input"));
        }
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ExportError::encode_at(index, "encoder input already closed"))?;
        let mut data = frame.data().to_vec();
        loop {
            match sender.send_timeout(data, FEED_WAIT) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => {
                    cancel.check()?;
                    data = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(ExportError::encode_at(index, "encoder stopped accepting frames"));
                }
            }
        }
    }

    fn finish(&mut self) -> ExportResult<()> {
        drop(self.sender.take());
        let fed = match self.feeder.take() {
            Some(task) => task
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("encoder feed thread panicked"))),
            None => Ok(()),
        };
        let exited = match self.take_encoder() {
            Some(process) => process.wait(),
            None => Ok(()),
        };
        self.finished = true;
        // The exit status explains a broken pipe better than the pipe does.
        exited.map_err(ExportError::encode)?;
        fed.map_err(|e| ExportError::encode(format!("writing to encoder: {e}")))?;
        tracing::debug!("Video encoder finished");
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.sender.take());
            // Killing the encoder unblocks the feed thread.
            drop(self.take_encoder());
        }
    }
}

struct RawAudioSink {
    file: Option<BufWriter<std::fs::File>>,
}

impl AudioSink for RawAudioSink {
    fn append(&mut self, chunk: &AudioChunk) -> ExportResult<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ExportError::encode("audio track already finished"))?;
        for sample in &chunk.samples {
            file.write_all(&sample.to_le_bytes())?;
        }
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}

struct FfmpegContainer {
    ffmpeg: FfmpegBackend,
    config: OutputConfig,
    staging: TempDir,
    video_path: PathBuf,
    audio_path: Option<PathBuf>,
    encoder: Arc<Mutex<Option<FfmpegProcess>>>,
}

impl ContainerWriter for FfmpegContainer {
    fn finalize(self: Box<Self>, cancel: &CancelToken) -> ExportResult<()> {
        cancel.check()?;
        if self
            .encoder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
        {
            return Err(ExportError::encode("video track was not finished"));
        }
        let muxed = match (&self.audio_path, self.config.audio) {
            (Some(audio_path), Some(audio)) => {
                let out = self
                    .staging
                    .path()
                    .join(format!("muxed.{}", self.config.format.extension()));
                let mut cmd = self.ffmpeg.ffmpeg();
                cmd.arg("-y")
                    .arg("-i")
                    .arg(&self.video_path)
                    .args(["-f", "f32le", "-ar", &audio.sample_rate.to_string()])
                    .args(["-ac", &audio.channels.to_string()])
                    .arg("-i")
                    .arg(audio_path)
                    .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy"])
                    .args(["-c:a", "aac", "-b:a", &format!("{}k", audio.bitrate_kbps.max(64))])
                    .args(container_args(self.config.format))
                    .arg(&out);
                FfmpegProcess::spawn(cmd, "mux", Stdio::null(), Stdio::null())
                    .map_err(ExportError::encode)?
                    .wait_or_cancel(cancel)?;
                out
            }
            _ => self.video_path.clone(),
        };

        // Last point where the destination is still untouched.
        cancel.check()?;
        if let Err(err) = std::fs::rename(&muxed, &self.config.destination) {
            tracing::debug!(error = %err, "Rename failed, copying output instead");
            std::fs::copy(&muxed, &self.config.destination)?;
        }
        tracing::info!(output = %self.config.destination.display(), "Container finalized");
        Ok(())
    }

    fn abort(self: Box<Self>) {
        drop(self.encoder.lock().unwrap_or_else(|e| e.into_inner()).take());
        tracing::debug!(staging = %self.staging.path().display(), "Discarding staged output");
    }
}

fn stream_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn video_codec_args(codec: VideoCodec, bitrate: Option<u64>) -> Vec<String> {
    let mut args: Vec<String> = match codec {
        VideoCodec::H264 => ["-c:v", "libx264", "-preset", "medium", "-profile:v", "high", "-pix_fmt", "yuv420p"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        VideoCodec::H265 => ["-c:v", "libx265", "-preset", "medium", "-pix_fmt", "yuv420p", "-tag:v", "hvc1"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        VideoCodec::ProRes => ["-c:v", "prores_ks", "-profile:v", "3", "-pix_fmt", "yuv422p10le"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };
    if let Some(bps) = bitrate {
        args.push("-b:v".to_string());
        args.push(bps.to_string());
    }
    args
}

fn container_args(format: ContainerFormat) -> Vec<String> {
    match format {
        ContainerFormat::Mp4 => vec!["-movflags".to_string(), "+faststart".to_string()],
        ContainerFormat::Mov => Vec::new(),
    }
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// `"30000/1001"` or `"30"` to frames per second.
fn parse_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn parse_probe(json: &str) -> Result<MediaInfo, String> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("unreadable ffprobe output: {e}"))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video.and_then(|v| v.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration_secs,
        video: video.map(|v| VideoStreamInfo {
            width: v.width.unwrap_or(0),
            height: v.height.unwrap_or(0),
            fps: v
                .avg_frame_rate
                .as_deref()
                .and_then(parse_rate)
                .or_else(|| v.r_frame_rate.as_deref().and_then(parse_rate))
                .unwrap_or(0.0),
            codec: v.codec_name.clone().unwrap_or_default(),
        }),
        audio: audio.map(|a| AudioStreamInfo {
            sample_rate: a
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            channels: a.channels.unwrap_or(0),
            codec: a.codec_name.clone().unwrap_or_default(),
        }),
    })
}
