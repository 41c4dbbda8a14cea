//! Reading and writing of uncompressed audio files in the two classical
//! RIFF-family containers: Microsoft WAVE (little-endian) and Apple
//! AIFF/AIFC (big-endian).
//!
//! The central type is [`AudioFile`], a planar multi-channel sample buffer
//! plus a sample rate, a bit depth and an optional iXML metadata payload.
//! It is generic over the in-memory scalar type: `f32` (the default),
//! `f64`, `i8`, `i16`, `i32` or `u8`, with all conversions to and from the
//! packed on-disk encodings handled by the [`Sample`] trait.
//!
//! ```no_run
//! use pcmcodex::{AudioFile, AudioFileFormat};
//!
//! let mut audio = AudioFile::<f32>::open("in.wav")?;
//! audio.set_sample_rate(48000);
//! audio.save("out.aif", AudioFileFormat::Aiff)?;
//! # Ok::<(), pcmcodex::AudioError>(())
//! ```

mod chunk;
mod codecs;
mod error;
mod extended;
mod prelude;
mod sample;

pub use error::{AudioError, R};
pub use sample::Sample;

use crate::codecs::{AiffCodec, Codec, Decoded, WavCodec};
use crate::prelude::*;
use std::path::{Path, PathBuf};

// Standard bit depths
pub(crate) const BIT_DEPTH_8: u16 = 8;
pub(crate) const BIT_DEPTH_16: u16 = 16;
pub(crate) const BIT_DEPTH_24: u16 = 24;
pub(crate) const BIT_DEPTH_32: u16 = 32;

/// Shortest byte stream that can carry a container signature.
pub(crate) const MIN_ENVELOPE_SIZE: usize = 12;

/// Container format of an [`AudioFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFileFormat {
    /// No load has happened yet.
    #[default]
    NotLoaded,
    Wave,
    Aiff,
    /// The sniffed byte stream matched no known container.
    Error,
}

/// An uncompressed audio file held in memory.
///
/// `samples` is planar: one inner vector per channel, all of equal length.
/// The field is public for direct sample access; the mutating methods keep
/// every channel the same length, and encoding rejects a buffer whose
/// channels have drifted apart.
pub struct AudioFile<S: Sample = f32> {
    /// Planar sample data, one inner vector per channel.
    pub samples: Vec<Vec<S>>,
    /// Opaque iXML metadata payload, preserved verbatim across a
    /// save/load round trip.
    pub ixml_chunk: Option<String>,
    sample_rate: u32,
    bit_depth: u16,
    format: AudioFileFormat,
    source_path: Option<PathBuf>,
    log_errors: bool,
}

impl<S: Sample> Default for AudioFile<S> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            ixml_chunk: None,
            sample_rate: 0,
            bit_depth: BIT_DEPTH_16,
            format: AudioFileFormat::NotLoaded,
            source_path: None,
            log_errors: true,
        }
    }
}

impl<S: Sample> AudioFile<S> {
    /// An empty file: no channels, sample rate 0, bit depth 16.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an audio file from disk.
    pub fn open(path: impl AsRef<Path>) -> R<Self> {
        let mut audio = Self::new();
        audio.load(path)?;
        Ok(audio)
    }

    /// Replace this object's contents with the file at `path`.
    ///
    /// On failure the object is reset to its empty state and the error is
    /// reported through the `log` facade (see
    /// [`should_log_errors_to_console`](Self::should_log_errors_to_console)).
    pub fn load(&mut self, path: impl AsRef<Path>) -> R<()> {
        let path = path.as_ref();
        let mapped = match map_file(path) {
            Ok(mapped) => mapped,
            Err(e) => {
                self.reset();
                self.report_error(&format!("could not open {}: {e}", path.display()));
                return Err(e);
            }
        };
        self.load_from_memory(&mapped)?;
        self.source_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Replace this object's contents with a complete in-memory byte
    /// stream, sniffing WAVE vs AIFF from the first 12 bytes.
    pub fn load_from_memory(&mut self, data: &[u8]) -> R<()> {
        match Self::decode_bytes(data) {
            Ok((format, decoded)) => {
                self.samples = decoded.samples;
                self.ixml_chunk = decoded.ixml_chunk;
                self.sample_rate = decoded.sample_rate;
                self.bit_depth = decoded.bit_depth;
                self.format = format;
                self.source_path = None;
                Ok(())
            }
            Err(e) => {
                self.reset();
                self.report_error(&format!("could not decode audio: {e}"));
                Err(e)
            }
        }
    }

    fn decode_bytes(data: &[u8]) -> R<(AudioFileFormat, Decoded<S>)> {
        codecs::ensure_min_envelope(data)?;
        match codecs::sniff_format(data) {
            AudioFileFormat::Wave => Ok((AudioFileFormat::Wave, WavCodec::decode(data)?)),
            AudioFileFormat::Aiff => Ok((AudioFileFormat::Aiff, AiffCodec::decode(data)?)),
            _ => Err(AudioError::UnknownFormat),
        }
    }

    /// Serialize into the chosen container format.
    pub fn to_bytes(&self, format: AudioFileFormat) -> R<Vec<u8>> {
        if !is_rectangular(&self.samples) {
            return Err(AudioError::ShapeMismatch);
        }
        match format {
            AudioFileFormat::Wave => WavCodec::encode(self),
            AudioFileFormat::Aiff => AiffCodec::encode(self),
            AudioFileFormat::NotLoaded | AudioFileFormat::Error => Err(
                AudioError::UnsupportedEncoding("no container format selected".into()),
            ),
        }
    }

    /// Serialize into the chosen container format and write to `path`.
    pub fn save(&self, path: impl AsRef<Path>, format: AudioFileFormat) -> R<()> {
        let path = path.as_ref();
        let result = self.to_bytes(format).and_then(|bytes| {
            write_file(path, &bytes).map_err(|source| AudioError::WriteFailure {
                path: path.to_path_buf(),
                source,
            })
        });
        if let Err(e) = &result {
            self.report_error(&format!("could not save {}: {e}", path.display()));
        }
        result
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    pub fn format(&self) -> AudioFileFormat {
        self.format
    }

    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    pub fn num_samples_per_channel(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    /// Buffer length in seconds, zero when no sample rate is set.
    pub fn length_in_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.num_samples_per_channel() as f64 / f64::from(self.sample_rate)
        }
    }

    pub fn is_mono(&self) -> bool {
        self.samples.len() == 1
    }

    pub fn is_stereo(&self) -> bool {
        self.samples.len() == 2
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Set the on-disk bit depth. Only 8, 16, 24 and 32 are accepted; the
    /// sample buffer itself is untouched.
    pub fn set_bit_depth(&mut self, bit_depth: u16) -> R<()> {
        if !matches!(
            bit_depth,
            BIT_DEPTH_8 | BIT_DEPTH_16 | BIT_DEPTH_24 | BIT_DEPTH_32
        ) {
            return Err(AudioError::UnsupportedEncoding(format!(
                "bit depth {bit_depth}"
            )));
        }
        self.bit_depth = bit_depth;
        Ok(())
    }

    /// Grow or shrink the channel count. New channels are zero-filled to
    /// the current length.
    pub fn set_num_channels(&mut self, num_channels: usize) {
        let len = self.num_samples_per_channel();
        self.samples
            .resize_with(num_channels, || vec![S::default(); len]);
    }

    /// Truncate or zero-extend every channel to `num_samples`.
    pub fn set_num_samples_per_channel(&mut self, num_samples: usize) {
        for channel in &mut self.samples {
            channel.resize(num_samples, S::default());
        }
    }

    /// Resize both axes at once, preserving overlapping samples.
    pub fn set_audio_buffer_size(&mut self, num_channels: usize, num_samples: usize) {
        self.set_num_channels(num_channels);
        self.set_num_samples_per_channel(num_samples);
    }

    /// Replace the whole sample buffer. A buffer whose channels have
    /// unequal lengths is rejected and the current buffer kept.
    pub fn set_audio_buffer(&mut self, buffer: Vec<Vec<S>>) -> R<()> {
        if !is_rectangular(&buffer) {
            return Err(AudioError::ShapeMismatch);
        }
        self.samples = buffer;
        Ok(())
    }

    /// Whether load/save failures are emitted through `log::error!`.
    /// Defaults to true.
    pub fn should_log_errors_to_console(&mut self, log_errors: bool) {
        self.log_errors = log_errors;
    }

    /// Print a short description of the file to stdout.
    pub fn print_summary(&self) {
        println!("|======================================|");
        if let Some(path) = &self.source_path {
            println!("File: {}", path.display());
        }
        println!("Format: {:?}", self.format);
        println!("Num Channels: {}", self.num_channels());
        println!("Num Samples Per Channel: {}", self.num_samples_per_channel());
        println!("Sample Rate: {}", self.sample_rate);
        println!("Bit Depth: {}", self.bit_depth);
        println!("Length in Seconds: {}", self.length_in_seconds());
        println!("|======================================|");
    }

    fn reset(&mut self) {
        let log_errors = self.log_errors;
        *self = Self::default();
        self.log_errors = log_errors;
    }

    fn report_error(&self, message: &str) {
        if self.log_errors {
            log::error!("{message}");
        }
    }
}

/// Format metadata read without decoding any sample data.
///
/// Parses the same header chunks as a full load, so the fields always
/// agree with what [`AudioFile::load`] would produce for the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFileHeader {
    pub format: AudioFileFormat,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub num_sample_frames: u32,
}

impl AudioFileHeader {
    pub fn load(path: impl AsRef<Path>) -> R<Self> {
        Self::from_bytes(&map_file(path.as_ref())?)
    }

    pub fn from_bytes(data: &[u8]) -> R<Self> {
        codecs::ensure_min_envelope(data)?;
        match codecs::sniff_format(data) {
            AudioFileFormat::Wave => WavCodec::read_header(data),
            AudioFileFormat::Aiff => AiffCodec::read_header(data),
            _ => Err(AudioError::UnknownFormat),
        }
    }

    pub fn length_in_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            f64::from(self.num_sample_frames) / f64::from(self.sample_rate)
        }
    }
}

fn map_file(path: &Path) -> R<memmap2::Mmap> {
    let file = std::fs::File::open(path)?;
    Ok(unsafe { MmapOptions::new().map(&file)? })
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}

fn is_rectangular<S>(buffer: &[Vec<S>]) -> bool {
    buffer
        .first()
        .map_or(true, |first| buffer.iter().all(|ch| ch.len() == first.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let audio = AudioFile::<f32>::new();
        assert_eq!(audio.num_channels(), 0);
        assert_eq!(audio.num_samples_per_channel(), 0);
        assert_eq!(audio.sample_rate(), 0);
        assert_eq!(audio.bit_depth(), 16);
        assert_eq!(audio.format(), AudioFileFormat::NotLoaded);
        assert_eq!(audio.length_in_seconds(), 0.0);
        assert!(!audio.is_mono());
    }

    #[test]
    fn channel_resizes_stay_rectangular() {
        let mut audio = AudioFile::<f32>::new();
        audio.set_audio_buffer_size(2, 8);
        assert_eq!(audio.num_channels(), 2);
        assert_eq!(audio.num_samples_per_channel(), 8);

        audio.samples[0][3] = 0.5;
        audio.set_num_channels(4);
        assert!(audio.samples.iter().all(|ch| ch.len() == 8));
        assert_eq!(audio.samples[3], vec![0.0; 8]);
        assert_eq!(audio.samples[0][3], 0.5);

        audio.set_num_samples_per_channel(3);
        assert!(audio.samples.iter().all(|ch| ch.len() == 3));
        assert_eq!(audio.samples[0][2], 0.0);

        audio.set_num_channels(1);
        assert!(audio.is_mono());
    }

    #[test]
    fn ragged_buffers_are_rejected() {
        let mut audio = AudioFile::<i16>::new();
        audio.set_audio_buffer(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let err = audio.set_audio_buffer(vec![vec![1], vec![2, 3]]);
        assert!(matches!(err, Err(AudioError::ShapeMismatch)));
        // the previous buffer is untouched
        assert_eq!(audio.samples, vec![vec![1, 2], vec![3, 4]]);

        audio.samples[1].pop();
        assert!(matches!(
            audio.to_bytes(AudioFileFormat::Wave),
            Err(AudioError::ShapeMismatch)
        ));
    }

    #[test]
    fn bit_depth_is_validated() {
        let mut audio = AudioFile::<f32>::new();
        for depth in [8u16, 16, 24, 32] {
            audio.set_bit_depth(depth).unwrap();
            assert_eq!(audio.bit_depth(), depth);
        }
        assert!(audio.set_bit_depth(12).is_err());
        assert_eq!(audio.bit_depth(), 32);
    }

    #[test]
    fn unknown_signature_resets_the_object() {
        let mut audio = AudioFile::<f32>::new();
        audio.should_log_errors_to_console(false);
        audio.set_audio_buffer(vec![vec![0.5; 4]]).unwrap();
        audio.set_sample_rate(44100);

        let err = audio.load_from_memory(b"RIFF\0\0\0\0WAVX");
        assert!(matches!(err, Err(AudioError::UnknownFormat)));
        assert_eq!(audio.num_channels(), 0);
        assert_eq!(audio.sample_rate(), 0);
        assert_eq!(audio.format(), AudioFileFormat::NotLoaded);
    }

    #[test]
    fn undersized_streams_are_io_errors() {
        let mut audio = AudioFile::<f32>::new();
        audio.should_log_errors_to_console(false);
        assert!(matches!(
            audio.load_from_memory(b"RIFF"),
            Err(AudioError::Io(_))
        ));
    }

    #[test]
    fn saving_without_a_format_is_rejected() {
        let audio = AudioFile::<f32>::new();
        assert!(matches!(
            audio.to_bytes(AudioFileFormat::NotLoaded),
            Err(AudioError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn length_reflects_rate_and_frames() {
        let mut audio = AudioFile::<f32>::new();
        audio.set_audio_buffer_size(2, 22050);
        audio.set_sample_rate(44100);
        assert_eq!(audio.length_in_seconds(), 0.5);
        audio.set_sample_rate(0);
        assert_eq!(audio.length_in_seconds(), 0.0);
    }
}
