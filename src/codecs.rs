use crate::chunk;
use crate::prelude::*;
use crate::sample::Sample;
use crate::{AudioFile, AudioFileFormat, AudioFileHeader, MIN_ENVELOPE_SIZE};

mod aiff;
mod wav;
pub(crate) use aiff::AiffCodec;
pub(crate) use wav::WavCodec;

const IXML_CHUNK_ID: &[u8; 4] = b"iXML";

/// Everything a container parse produces besides the object bookkeeping.
pub(crate) struct Decoded<S> {
    pub samples: Vec<Vec<S>>,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub ixml_chunk: Option<String>,
}

pub(crate) trait Codec {
    /// Cheap signature check over the 12-byte envelope.
    fn validate_format(data: &[u8]) -> R<()>;

    /// Parse format metadata without touching sample data.
    fn read_header(data: &[u8]) -> R<AudioFileHeader>;

    fn decode<S: Sample>(data: &[u8]) -> R<Decoded<S>>;

    fn encode<S: Sample>(audio: &AudioFile<S>) -> R<Vec<u8>>;
}

/// Identify the container from the first 12 bytes. `Error` stands for an
/// unrecognized signature.
pub(crate) fn sniff_format(data: &[u8]) -> AudioFileFormat {
    if data.len() < MIN_ENVELOPE_SIZE {
        return AudioFileFormat::Error;
    }
    if &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        AudioFileFormat::Wave
    } else if &data[0..4] == b"FORM" && (&data[8..12] == b"AIFF" || &data[8..12] == b"AIFC") {
        AudioFileFormat::Aiff
    } else {
        AudioFileFormat::Error
    }
}

pub(crate) fn ensure_min_envelope(data: &[u8]) -> R<()> {
    if data.len() < MIN_ENVELOPE_SIZE {
        return Err(AudioError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "input shorter than the 12-byte container envelope",
        )));
    }
    Ok(())
}

/// The optional iXML chunk, carried as an opaque UTF-8 payload.
fn read_ixml<E: ByteOrder>(data: &[u8]) -> R<Option<String>> {
    let Some(at) = chunk::find_chunk::<E>(data, IXML_CHUNK_ID, MIN_ENVELOPE_SIZE)? else {
        return Ok(None);
    };
    let payload = chunk::chunk_payload::<E>(data, at);
    Ok(Some(String::from_utf8_lossy(payload).into_owned()))
}
