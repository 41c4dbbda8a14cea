use super::{Codec, Decoded};
use crate::prelude::*;
use crate::sample::{self, PackedFormat, Sample};
use crate::{AudioFile, AudioFileFormat, AudioFileHeader, chunk, extended};
use crate::{BIT_DEPTH_8, BIT_DEPTH_16, BIT_DEPTH_24};

// Chunk identifiers
const FORM_CHUNK_ID: &[u8; 4] = b"FORM";
const AIFF_FORMAT_ID: &[u8; 4] = b"AIFF";
const AIFC_FORMAT_ID: &[u8; 4] = b"AIFC";
const COMM_CHUNK_ID: &[u8; 4] = b"COMM";
const SSND_CHUNK_ID: &[u8; 4] = b"SSND";

/// The only AIFC compression type this library reads.
const UNCOMPRESSED_ID: &[u8; 4] = b"NONE";

// Chunk structures
const HEADER_SIZE: usize = 12; // FORM + size + AIFF
const COMM_CHUNK_SIZE: u32 = 18;
const SSND_PREAMBLE_SIZE: usize = 8; // offset + blockSize

pub(crate) struct AiffCodec;

struct CommChunk {
    channels: u16,
    num_frames: u32,
    bit_depth: u16,
    sample_rate: u32,
}

fn read_comm_chunk(data: &[u8], is_aifc: bool) -> R<CommChunk> {
    let at = chunk::find_chunk::<BigEndian>(data, COMM_CHUNK_ID, HEADER_SIZE)?
        .ok_or(AudioError::MalformedChunk("missing 'COMM' chunk"))?;
    let needed = if is_aifc {
        COMM_CHUNK_SIZE + 4
    } else {
        COMM_CHUNK_SIZE
    };
    if BigEndian::read_u32(&data[at + 4..at + 8]) < needed {
        return Err(AudioError::MalformedChunk("'COMM' chunk too short"));
    }

    let mut cursor = Cursor::new(&data[at + 8..]);
    let channels = cursor.read_u16::<BigEndian>()?;
    let num_frames = cursor.read_u32::<BigEndian>()?;
    let bit_depth = cursor.read_u16::<BigEndian>()?;
    let mut rate_bytes = [0u8; 10];
    cursor.read_exact(&mut rate_bytes)?;
    let sample_rate = extended::decode(&rate_bytes);

    if is_aifc {
        let mut compression = [0u8; 4];
        cursor.read_exact(&mut compression)?;
        if &compression != UNCOMPRESSED_ID {
            return Err(AudioError::UnsupportedEncoding(format!(
                "AIFC compression type '{}'",
                String::from_utf8_lossy(&compression)
            )));
        }
    }

    if !matches!(bit_depth, BIT_DEPTH_8 | BIT_DEPTH_16 | BIT_DEPTH_24) {
        return Err(AudioError::UnsupportedEncoding(format!(
            "{bit_depth}-bit AIFF samples"
        )));
    }
    if channels == 0 {
        return Err(AudioError::MalformedChunk("'COMM' chunk declares zero channels"));
    }

    Ok(CommChunk {
        channels,
        num_frames,
        bit_depth,
        sample_rate,
    })
}

fn packed_format(bit_depth: u16) -> PackedFormat {
    match bit_depth {
        BIT_DEPTH_8 => PackedFormat::SignedPcm8,
        BIT_DEPTH_16 => PackedFormat::Pcm16,
        _ => PackedFormat::Pcm24,
    }
}

impl Codec for AiffCodec {
    fn validate_format(data: &[u8]) -> R<()> {
        super::ensure_min_envelope(data)?;
        if &data[0..4] != FORM_CHUNK_ID
            || (&data[8..12] != AIFF_FORMAT_ID && &data[8..12] != AIFC_FORMAT_ID)
        {
            return Err(AudioError::UnknownFormat);
        }
        Ok(())
    }

    fn read_header(data: &[u8]) -> R<AudioFileHeader> {
        Self::validate_format(data)?;
        let comm = read_comm_chunk(data, &data[8..12] == AIFC_FORMAT_ID)?;
        Ok(AudioFileHeader {
            format: AudioFileFormat::Aiff,
            num_channels: comm.channels,
            sample_rate: comm.sample_rate,
            bit_depth: comm.bit_depth,
            num_sample_frames: comm.num_frames,
        })
    }

    fn decode<S: Sample>(data: &[u8]) -> R<Decoded<S>> {
        Self::validate_format(data)?;
        let comm = read_comm_chunk(data, &data[8..12] == AIFC_FORMAT_ID)?;

        let ssnd_at = chunk::find_chunk::<BigEndian>(data, SSND_CHUNK_ID, HEADER_SIZE)?
            .ok_or(AudioError::MalformedChunk("missing 'SSND' chunk"))?;
        let payload = chunk::chunk_payload::<BigEndian>(data, ssnd_at);
        if payload.len() < SSND_PREAMBLE_SIZE {
            return Err(AudioError::MalformedChunk(
                "'SSND' chunk shorter than its offset and block size fields",
            ));
        }
        // offset and blockSize lead the payload; both are discarded
        let body = &payload[SSND_PREAMBLE_SIZE..];

        let packed = packed_format(comm.bit_depth);
        let channels = usize::from(comm.channels);
        let frames = comm.num_frames as usize;
        if body.len() < frames * channels * packed.bytes_per_sample() {
            return Err(AudioError::MalformedChunk(
                "'SSND' chunk too short for the declared sample frames",
            ));
        }
        let samples = sample::decode_planar::<S, BigEndian>(body, channels, frames, packed);

        Ok(Decoded {
            samples,
            sample_rate: comm.sample_rate,
            bit_depth: comm.bit_depth,
            ixml_chunk: super::read_ixml::<BigEndian>(data)?,
        })
    }

    fn encode<S: Sample>(audio: &AudioFile<S>) -> R<Vec<u8>> {
        let channels = audio.num_channels();
        if channels > usize::from(u16::MAX) {
            return Err(AudioError::UnsupportedEncoding(format!(
                "{channels} channels in an AIFF file"
            )));
        }
        let bit_depth = audio.bit_depth();
        if !matches!(bit_depth, BIT_DEPTH_8 | BIT_DEPTH_16 | BIT_DEPTH_24) {
            return Err(AudioError::UnsupportedEncoding(format!(
                "{bit_depth}-bit AIFF output"
            )));
        }

        let packed = packed_format(bit_depth);
        let frames = audio.num_samples_per_channel();
        let data_size = channels * frames * packed.bytes_per_sample();
        if data_size > (u32::MAX as usize) - SSND_PREAMBLE_SIZE {
            return Err(AudioError::UnsupportedEncoding(
                "sample data larger than a FORM container can hold".into(),
            ));
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + 26 + 16 + data_size + 1);
        out.extend_from_slice(FORM_CHUNK_ID);
        out.write_u32::<BigEndian>(0)?; // back-patched once the length is known
        out.extend_from_slice(AIFF_FORMAT_ID);

        out.extend_from_slice(COMM_CHUNK_ID);
        out.write_u32::<BigEndian>(COMM_CHUNK_SIZE)?;
        out.write_u16::<BigEndian>(channels as u16)?;
        out.write_u32::<BigEndian>(frames as u32)?;
        out.write_u16::<BigEndian>(bit_depth)?;
        out.extend_from_slice(&extended::encode(audio.sample_rate()));

        out.extend_from_slice(SSND_CHUNK_ID);
        out.write_u32::<BigEndian>((SSND_PREAMBLE_SIZE + data_size) as u32)?;
        out.write_u32::<BigEndian>(0)?; // offset
        out.write_u32::<BigEndian>(0)?; // blockSize
        sample::encode_interleaved::<S, BigEndian>(&mut out, &audio.samples, packed)?;
        if data_size % 2 == 1 {
            out.push(0); // pad byte, not counted in the chunk size
        }

        if let Some(ixml) = &audio.ixml_chunk {
            chunk::write_chunk::<BigEndian>(&mut out, super::IXML_CHUNK_ID, ixml.as_bytes())?;
        }

        let form_size = out.len() as u32 - 8;
        BigEndian::write_u32(&mut out[4..8], form_size);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_i16() -> AudioFile<i16> {
        let mut audio = AudioFile::<i16>::new();
        let left: Vec<i16> = (0..1000).collect();
        let right: Vec<i16> = (0..1000).map(|v| -v).collect();
        audio.set_audio_buffer(vec![left, right]).unwrap();
        audio.set_sample_rate(48000);
        audio
    }

    #[test]
    fn emits_a_well_formed_envelope() {
        let bytes = AiffCodec::encode(&ramp_i16()).unwrap();
        assert_eq!(&bytes[0..4], b"FORM");
        assert_eq!(&bytes[8..12], b"AIFF");
        assert_eq!(BigEndian::read_u32(&bytes[4..8]) as usize, bytes.len() - 8);

        let comm = read_comm_chunk(&bytes, false).unwrap();
        assert_eq!(comm.channels, 2);
        assert_eq!(comm.num_frames, 1000);
        assert_eq!(comm.bit_depth, 16);
        assert_eq!(comm.sample_rate, 48000);
    }

    #[test]
    fn comm_rate_field_uses_the_canonical_pattern() {
        let bytes = AiffCodec::encode(&ramp_i16()).unwrap();
        let at = chunk::find_chunk::<BigEndian>(&bytes, COMM_CHUNK_ID, HEADER_SIZE)
            .unwrap()
            .unwrap();
        // channels + frames + depth precede the ten-byte rate
        assert_eq!(
            &bytes[at + 16..at + 26],
            &[0x40, 0x0E, 0xBB, 0x80, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn ssnd_preamble_is_zero_and_ignored() {
        let mut bytes = AiffCodec::encode(&ramp_i16()).unwrap();
        let at = chunk::find_chunk::<BigEndian>(&bytes, SSND_CHUNK_ID, HEADER_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(&bytes[at + 8..at + 16], &[0u8; 8]);
        // A nonzero offset field still decodes
        bytes[at + 11] = 42;
        let decoded = AiffCodec::decode::<i16>(&bytes).unwrap();
        assert_eq!(decoded.samples[0][1], 1);
    }

    #[test]
    fn aifc_requires_the_none_compression_type() {
        let mut audio = AudioFile::<i16>::new();
        audio.set_audio_buffer(vec![vec![1, -1]]).unwrap();
        audio.set_sample_rate(44100);
        let bytes = AiffCodec::encode(&audio).unwrap();

        // Rewrite the envelope as AIFC with a widened COMM carrying "NONE"
        let mut aifc = Vec::new();
        aifc.extend_from_slice(b"FORM");
        aifc.write_u32::<BigEndian>(0).unwrap();
        aifc.extend_from_slice(b"AIFC");
        let comm_at = chunk::find_chunk::<BigEndian>(&bytes, COMM_CHUNK_ID, HEADER_SIZE)
            .unwrap()
            .unwrap();
        aifc.extend_from_slice(COMM_CHUNK_ID);
        aifc.write_u32::<BigEndian>(COMM_CHUNK_SIZE + 4).unwrap();
        aifc.extend_from_slice(&bytes[comm_at + 8..comm_at + 8 + 18]);
        aifc.extend_from_slice(b"NONE");
        let ssnd_at = chunk::find_chunk::<BigEndian>(&bytes, SSND_CHUNK_ID, HEADER_SIZE)
            .unwrap()
            .unwrap();
        let ssnd_size = BigEndian::read_u32(&bytes[ssnd_at + 4..ssnd_at + 8]) as usize;
        aifc.extend_from_slice(&bytes[ssnd_at..ssnd_at + 8 + ssnd_size]);
        let form_size = aifc.len() as u32 - 8;
        BigEndian::write_u32(&mut aifc[4..8], form_size);

        let decoded = AiffCodec::decode::<i16>(&aifc).unwrap();
        assert_eq!(decoded.samples, vec![vec![1, -1]]);

        // Any other compression id is rejected
        let comm_at = chunk::find_chunk::<BigEndian>(&aifc, COMM_CHUNK_ID, HEADER_SIZE)
            .unwrap()
            .unwrap();
        aifc[comm_at + 26..comm_at + 30].copy_from_slice(b"sowt");
        assert!(matches!(
            AiffCodec::decode::<i16>(&aifc),
            Err(AudioError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn short_ssnd_is_rejected() {
        let mut bytes = AiffCodec::encode(&ramp_i16()).unwrap();
        let comm_at = chunk::find_chunk::<BigEndian>(&bytes, COMM_CHUNK_ID, HEADER_SIZE)
            .unwrap()
            .unwrap();
        // Claim more frames than the SSND payload carries
        BigEndian::write_u32(&mut bytes[comm_at + 10..comm_at + 14], 2000);
        assert!(matches!(
            AiffCodec::decode::<i16>(&bytes),
            Err(AudioError::MalformedChunk(_))
        ));
    }

    #[test]
    fn thirty_two_bit_output_is_rejected() {
        let mut audio = AudioFile::<i32>::new();
        audio.set_audio_buffer(vec![vec![1, 2]]).unwrap();
        audio.set_bit_depth(32).unwrap();
        assert!(matches!(
            AiffCodec::encode(&audio),
            Err(AudioError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn eight_bit_samples_are_signed() {
        let mut audio = AudioFile::<f32>::new();
        audio.set_audio_buffer(vec![vec![-1.0, 1.0]]).unwrap();
        audio.set_sample_rate(8000);
        audio.set_bit_depth(8).unwrap();
        let bytes = AiffCodec::encode(&audio).unwrap();
        let at = chunk::find_chunk::<BigEndian>(&bytes, SSND_CHUNK_ID, HEADER_SIZE)
            .unwrap()
            .unwrap();
        let body = &chunk::chunk_payload::<BigEndian>(&bytes, at)[SSND_PREAMBLE_SIZE..];
        assert_eq!(body, &[(-127i8) as u8, 127]);
    }
}
