use super::{Codec, Decoded};
use crate::prelude::*;
use crate::sample::{self, PackedFormat, Sample};
use crate::{AudioFile, AudioFileFormat, AudioFileHeader, chunk};
use crate::{BIT_DEPTH_8, BIT_DEPTH_16, BIT_DEPTH_24, BIT_DEPTH_32};

// Format tags
const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

// Chunk identifiers
const RIFF_CHUNK_ID: &[u8; 4] = b"RIFF";
const WAVE_FORMAT_ID: &[u8; 4] = b"WAVE";
const FMT_CHUNK_ID: &[u8; 4] = b"fmt ";
const DATA_CHUNK_ID: &[u8; 4] = b"data";

// Chunk structures
const STANDARD_FMT_CHUNK_SIZE: u32 = 16;
const HEADER_SIZE: usize = 12; // RIFF + size + WAVE

pub(crate) struct WavCodec;

struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    bit_depth: u16,
}

fn read_fmt_chunk(data: &[u8]) -> R<FmtChunk> {
    let at = chunk::find_chunk::<LittleEndian>(data, FMT_CHUNK_ID, HEADER_SIZE)?
        .ok_or(AudioError::MalformedChunk("missing 'fmt ' chunk"))?;
    if LittleEndian::read_u32(&data[at + 4..at + 8]) < STANDARD_FMT_CHUNK_SIZE {
        return Err(AudioError::MalformedChunk("'fmt ' chunk shorter than 16 bytes"));
    }

    let mut cursor = Cursor::new(&data[at + 8..]);
    let format_tag = cursor.read_u16::<LittleEndian>()?;
    let channels = cursor.read_u16::<LittleEndian>()?;
    let sample_rate = cursor.read_u32::<LittleEndian>()?;
    let byte_rate = cursor.read_u32::<LittleEndian>()?;
    let block_align = cursor.read_u16::<LittleEndian>()?;
    let bit_depth = cursor.read_u16::<LittleEndian>()?;

    if format_tag != FORMAT_PCM && format_tag != FORMAT_IEEE_FLOAT {
        return Err(AudioError::UnsupportedEncoding(format!(
            "WAVE format code {format_tag}"
        )));
    }
    if !matches!(bit_depth, BIT_DEPTH_8 | BIT_DEPTH_16 | BIT_DEPTH_24 | BIT_DEPTH_32) {
        return Err(AudioError::UnsupportedEncoding(format!(
            "{bit_depth}-bit WAVE samples"
        )));
    }
    if format_tag == FORMAT_IEEE_FLOAT && bit_depth != BIT_DEPTH_32 {
        return Err(AudioError::UnsupportedEncoding(format!(
            "{bit_depth}-bit IEEE float WAVE samples"
        )));
    }
    if channels == 0 {
        return Err(AudioError::MalformedChunk("'fmt ' chunk declares zero channels"));
    }

    let expected_align = u32::from(channels) * u32::from(bit_depth / 8);
    if u32::from(block_align) != expected_align
        || u64::from(byte_rate) != u64::from(sample_rate) * u64::from(expected_align)
    {
        log::warn!(
            "inconsistent 'fmt ' fields: block align {block_align}, byte rate {byte_rate}"
        );
    }

    Ok(FmtChunk {
        format_tag,
        channels,
        sample_rate,
        bit_depth,
    })
}

fn packed_format(format_tag: u16, bit_depth: u16) -> PackedFormat {
    match (format_tag, bit_depth) {
        (FORMAT_IEEE_FLOAT, _) => PackedFormat::Float32,
        (_, BIT_DEPTH_8) => PackedFormat::UnsignedPcm8,
        (_, BIT_DEPTH_16) => PackedFormat::Pcm16,
        (_, BIT_DEPTH_24) => PackedFormat::Pcm24,
        _ => PackedFormat::Pcm32,
    }
}

impl Codec for WavCodec {
    fn validate_format(data: &[u8]) -> R<()> {
        super::ensure_min_envelope(data)?;
        if &data[0..4] != RIFF_CHUNK_ID || &data[8..12] != WAVE_FORMAT_ID {
            return Err(AudioError::UnknownFormat);
        }
        Ok(())
    }

    fn read_header(data: &[u8]) -> R<AudioFileHeader> {
        Self::validate_format(data)?;
        let fmt = read_fmt_chunk(data)?;
        let data_at = chunk::find_chunk::<LittleEndian>(data, DATA_CHUNK_ID, HEADER_SIZE)?
            .ok_or(AudioError::MalformedChunk("missing 'data' chunk"))?;
        let data_size = LittleEndian::read_u32(&data[data_at + 4..data_at + 8]);
        let block_align = u32::from(fmt.channels) * u32::from(fmt.bit_depth / 8);
        Ok(AudioFileHeader {
            format: AudioFileFormat::Wave,
            num_channels: fmt.channels,
            sample_rate: fmt.sample_rate,
            bit_depth: fmt.bit_depth,
            num_sample_frames: data_size / block_align,
        })
    }

    fn decode<S: Sample>(data: &[u8]) -> R<Decoded<S>> {
        Self::validate_format(data)?;
        let fmt = read_fmt_chunk(data)?;

        let data_at = chunk::find_chunk::<LittleEndian>(data, DATA_CHUNK_ID, HEADER_SIZE)?
            .ok_or(AudioError::MalformedChunk("missing 'data' chunk"))?;
        let payload = chunk::chunk_payload::<LittleEndian>(data, data_at);

        let packed = packed_format(fmt.format_tag, fmt.bit_depth);
        let channels = usize::from(fmt.channels);
        let frames = payload.len() / (channels * packed.bytes_per_sample());
        let samples = sample::decode_planar::<S, LittleEndian>(payload, channels, frames, packed);

        Ok(Decoded {
            samples,
            sample_rate: fmt.sample_rate,
            bit_depth: fmt.bit_depth,
            ixml_chunk: super::read_ixml::<LittleEndian>(data)?,
        })
    }

    fn encode<S: Sample>(audio: &AudioFile<S>) -> R<Vec<u8>> {
        let channels = audio.num_channels();
        if channels > usize::from(u16::MAX) {
            return Err(AudioError::UnsupportedEncoding(format!(
                "{channels} channels in a WAVE file"
            )));
        }
        let frames = audio.num_samples_per_channel();
        let bit_depth = audio.bit_depth();

        // IEEE float only for a floating-point buffer stored at 32 bits
        let packed = if S::FLOAT && bit_depth == BIT_DEPTH_32 {
            PackedFormat::Float32
        } else {
            packed_format(FORMAT_PCM, bit_depth)
        };
        let format_tag = if packed == PackedFormat::Float32 {
            FORMAT_IEEE_FLOAT
        } else {
            FORMAT_PCM
        };

        let data_size = channels * frames * packed.bytes_per_sample();
        if data_size > u32::MAX as usize {
            return Err(AudioError::UnsupportedEncoding(
                "sample data larger than a RIFF container can hold".into(),
            ));
        }
        let block_align = channels as u16 * (bit_depth / 8);
        let byte_rate = audio.sample_rate() * u32::from(block_align);

        let mut out = Vec::with_capacity(HEADER_SIZE + 24 + 8 + data_size + 1);
        out.extend_from_slice(RIFF_CHUNK_ID);
        out.write_u32::<LittleEndian>(0)?; // back-patched once the length is known
        out.extend_from_slice(WAVE_FORMAT_ID);

        out.extend_from_slice(FMT_CHUNK_ID);
        out.write_u32::<LittleEndian>(STANDARD_FMT_CHUNK_SIZE)?;
        out.write_u16::<LittleEndian>(format_tag)?;
        out.write_u16::<LittleEndian>(channels as u16)?;
        out.write_u32::<LittleEndian>(audio.sample_rate())?;
        out.write_u32::<LittleEndian>(byte_rate)?;
        out.write_u16::<LittleEndian>(block_align)?;
        out.write_u16::<LittleEndian>(bit_depth)?;

        out.extend_from_slice(DATA_CHUNK_ID);
        out.write_u32::<LittleEndian>(data_size as u32)?;
        sample::encode_interleaved::<S, LittleEndian>(&mut out, &audio.samples, packed)?;
        if data_size % 2 == 1 {
            out.push(0); // pad byte, not counted in the chunk size
        }

        if let Some(ixml) = &audio.ixml_chunk {
            chunk::write_chunk::<LittleEndian>(&mut out, super::IXML_CHUNK_ID, ixml.as_bytes())?;
        }

        let riff_size = out.len() as u32 - 8;
        LittleEndian::write_u32(&mut out[4..8], riff_size);
        Ok(out)
    }
}
