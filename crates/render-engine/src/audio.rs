//! Audio track assembly.
//!
//! System and microphone audio are mixed into one stereo stream at
//! [`OUTPUT_SAMPLE_RATE`]. Each source only sounds inside its enabled
//! regions (trim-relative) and is scaled by its volume; the sum is clamped
//! to [-1, 1]. The stream ends exactly at the trim duration, padding with
//! silence when the sources run short.

use std::collections::VecDeque;

use reel_common::error::{ExportError, ExportResult};
use reel_project_model::editor::TimeRange;

use crate::media::{AudioChunk, AudioReader};

pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;
pub const OUTPUT_CHANNELS: u16 = 2;
/// Sample frames per emitted chunk.
pub const CHUNK_FRAMES: usize = 1024;

/// One input to the mix.
pub struct AudioSource {
    pub name: String,
    pub reader: Box<dyn AudioReader>,
    /// Trim-relative spans where the source is audible; `None` means always.
    pub regions: Option<Vec<TimeRange>>,
    pub volume: f32,
}

impl AudioSource {
    pub fn new(name: impl Into<String>, reader: Box<dyn AudioReader>) -> Self {
        Self {
            name: name.into(),
            reader,
            regions: None,
            volume: 1.0,
        }
    }

    pub fn with_regions(mut self, regions: Option<Vec<TimeRange>>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume.max(0.0) as f32;
        self
    }
}

/// Decoded stereo frames of one source, indexed from `start` (in frames).
struct SourceState {
    source: AudioSource,
    buffer: VecDeque<[f32; 2]>,
    start: u64,
    ended: bool,
}

impl SourceState {
    fn end(&self) -> u64 {
        self.start + self.buffer.len() as u64
    }

    /// Read until frames up to `until` are buffered or the source ends.
    fn fill(&mut self, until: u64) -> ExportResult<()> {
        while !self.ended && self.end() < until {
            match self.source.reader.next_chunk()? {
                Some(chunk) => self.push(chunk)?,
                None => self.ended = true,
            }
        }
        Ok(())
    }

    fn push(&mut self, chunk: AudioChunk) -> ExportResult<()> {
        if chunk.sample_rate != OUTPUT_SAMPLE_RATE {
            return Err(ExportError::decode(
                self.source.name.as_str(),
                format!(
                    "expected {OUTPUT_SAMPLE_RATE} Hz audio, got {} Hz",
                    chunk.sample_rate
                ),
            ));
        }
        let channels = chunk.channels as usize;
        if channels == 0 {
            return Ok(());
        }
        let first = (chunk.start_secs.max(0.0) * OUTPUT_SAMPLE_RATE as f64).round() as u64;
        // Silence for gaps, skip overlaps.
        let end = self.end();
        if first > end {
            self.buffer.extend(std::iter::repeat([0.0, 0.0]).take((first - end) as usize));
        }
        let skip = end.saturating_sub(first) as usize;
        for frame in chunk.samples.chunks_exact(channels).skip(skip) {
            let left = frame[0];
            let right = if channels > 1 { frame[1] } else { left };
            self.buffer.push_back([left, right]);
        }
        Ok(())
    }

    fn frame(&self, index: u64) -> [f32; 2] {
        if index < self.start {
            return [0.0, 0.0];
        }
        self.buffer
            .get((index - self.start) as usize)
            .copied()
            .unwrap_or([0.0, 0.0])
    }

    fn gain_at(&self, time_secs: f64) -> f32 {
        match &self.source.regions {
            None => self.source.volume,
            Some(regions) if regions.iter().any(|r| r.contains(time_secs)) => self.source.volume,
            Some(_) => 0.0,
        }
    }

    /// Forget frames before `index`.
    fn discard_before(&mut self, index: u64) {
        while self.start < index && !self.buffer.is_empty() {
            self.buffer.pop_front();
            self.start += 1;
        }
        if self.buffer.is_empty() && self.start < index {
            self.start = index;
        }
    }
}

/// Mixes [`AudioSource`]s into the output track.
pub struct TrackAssembler {
    sources: Vec<SourceState>,
    position: u64,
    total_frames: u64,
}

impl TrackAssembler {
    pub fn new(sources: Vec<AudioSource>, duration_secs: f64) -> Self {
        let total_frames = (duration_secs.max(0.0) * OUTPUT_SAMPLE_RATE as f64).round() as u64;
        tracing::debug!(
            sources = sources.len(),
            duration_secs,
            total_frames,
            "Assembling audio track"
        );
        Self {
            sources: sources
                .into_iter()
                .map(|source| SourceState {
                    source,
                    buffer: VecDeque::new(),
                    start: 0,
                    ended: false,
                })
                .collect(),
            position: 0,
            total_frames,
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl AudioReader for TrackAssembler {
    fn next_chunk(&mut self) -> ExportResult<Option<AudioChunk>> {
        if self.position >= self.total_frames {
            return Ok(None);
        }
        let frames = (self.total_frames - self.position).min(CHUNK_FRAMES as u64);
        let until = self.position + frames;
        let mut mix = vec![0.0f32; frames as usize * OUTPUT_CHANNELS as usize];

        for state in &mut self.sources {
            state.fill(until)?;
            for i in 0..frames {
                let index = self.position + i;
                let gain = state.gain_at(index as f64 / OUTPUT_SAMPLE_RATE as f64);
                if gain == 0.0 {
                    continue;
                }
                let [left, right] = state.frame(index);
                let o = i as usize * 2;
                mix[o] += left * gain;
                mix[o + 1] += right * gain;
            }
            state.discard_before(until);
        }

        for sample in &mut mix {
            *sample = sample.clamp(-1.0, 1.0);
        }

        let chunk = AudioChunk {
            sample_rate: OUTPUT_SAMPLE_RATE,
            channels: OUTPUT_CHANNELS,
            start_secs: self.position as f64 / OUTPUT_SAMPLE_RATE as f64,
            samples: mix,
        };
        self.position = until;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Constant-valued source delivered in fixed-size chunks.
    struct ConstantReader {
        value: f32,
        channels: u16,
        remaining: usize,
        position: usize,
        chunk: usize,
    }

    impl ConstantReader {
        fn boxed(value: f32, channels: u16, frames: usize) -> Box<dyn AudioReader> {
            Box::new(Self {
                value,
                channels,
                remaining: frames,
                position: 0,
                chunk: 700,
            })
        }
    }

    impl AudioReader for ConstantReader {
        fn next_chunk(&mut self) -> ExportResult<Option<AudioChunk>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            let n = self.remaining.min(self.chunk);
            let chunk = AudioChunk {
                sample_rate: OUTPUT_SAMPLE_RATE,
                channels: self.channels,
                start_secs: self.position as f64 / OUTPUT_SAMPLE_RATE as f64,
                samples: vec![self.value; n * self.channels as usize],
            };
            self.remaining -= n;
            self.position += n;
            Ok(Some(chunk))
        }
    }

    fn collect(mut assembler: TrackAssembler) -> Vec<f32> {
        let mut out = Vec::new();
        while let Some(chunk) = assembler.next_chunk().unwrap() {
            assert!(chunk.frames() <= CHUNK_FRAMES);
            out.extend(chunk.samples);
        }
        out
    }

    #[test]
    fn test_output_stops_at_duration() {
        let source = AudioSource::new("system", ConstantReader::boxed(0.25, 2, 100_000));
        let samples = collect(TrackAssembler::new(vec![source], 0.5));
        assert_eq!(samples.len(), 22_050 * 2);
        assert!(samples.iter().all(|s| (*s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_short_source_pads_with_silence() {
        let source = AudioSource::new("mic", ConstantReader::boxed(0.5, 1, 1_000));
        let samples = collect(TrackAssembler::new(vec![source], 0.1));
        assert_eq!(samples.len(), 4_410 * 2);
        assert_eq!(samples[0], 0.5);
        assert_eq!(samples[1], 0.5);
        assert_eq!(samples[2_000], 0.0);
    }

    #[test]
    fn test_regions_silence_outside() {
        let source = AudioSource::new("system", ConstantReader::boxed(0.5, 2, 44_100))
            .with_regions(Some(vec![TimeRange::new(0.5, 1.0)]));
        let samples = collect(TrackAssembler::new(vec![source], 1.0));
        let at = |secs: f64| samples[(secs * OUTPUT_SAMPLE_RATE as f64) as usize * 2];
        assert_eq!(at(0.25), 0.0);
        assert_eq!(at(0.75), 0.5);
    }

    #[test]
    fn test_mix_sums_volumes_and_clamps() {
        let system = AudioSource::new("system", ConstantReader::boxed(0.6, 2, 4_410)).with_volume(1.0);
        let mic = AudioSource::new("mic", ConstantReader::boxed(0.6, 2, 4_410)).with_volume(0.5);
        let samples = collect(TrackAssembler::new(vec![system, mic], 0.1));
        assert!((samples[10] - 0.9).abs() < 1e-6);

        let loud = AudioSource::new("a", ConstantReader::boxed(0.8, 2, 4_410));
        let louder = AudioSource::new("b", ConstantReader::boxed(0.8, 2, 4_410));
        let samples = collect(TrackAssembler::new(vec![loud, louder], 0.1));
        assert_eq!(samples[10], 1.0);
    }

    #[test]
    fn test_wrong_sample_rate_is_decode_error() {
        struct Wrong;
        impl AudioReader for Wrong {
            fn next_chunk(&mut self) -> ExportResult<Option<AudioChunk>> {
                Ok(Some(AudioChunk {
                    sample_rate: 48_000,
                    channels: 2,
                    start_secs: 0.0,
                    samples: vec![0.0; 4],
                }))
            }
        }
        let mut assembler = TrackAssembler::new(vec![AudioSource::new("mic", Box::new(Wrong))], 1.0);
        assert!(matches!(
            assembler.next_chunk(),
            Err(ExportError::DecodeFailed { .. })
        ));
    }
}
