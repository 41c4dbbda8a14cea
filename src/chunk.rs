//! Navigation over the id/size/payload chunk layout shared by RIFF and
//! FORM containers.

use crate::prelude::*;

/// Scan `data` from `start` for the chunk with the given 4-byte id.
///
/// Returns the offset of the id field, so the size sits at `+4` and the
/// payload at `+8`. Payloads are padded to even length on disk with the
/// size field reflecting the unpadded length, so the scan jumps by
/// `8 + size + pad`. A declared size that overruns `data` is rejected.
pub(crate) fn find_chunk<E: ByteOrder>(
    data: &[u8],
    id: &[u8; 4],
    start: usize,
) -> R<Option<usize>> {
    let mut at = start;
    while at + 8 <= data.len() {
        let size = E::read_u32(&data[at + 4..at + 8]) as usize;
        if data.len() - at - 8 < size {
            return Err(AudioError::MalformedChunk(
                "chunk size exceeds the remaining bytes",
            ));
        }
        if &data[at..at + 4] == id {
            return Ok(Some(at));
        }
        at += 8 + size + (size & 1);
    }
    Ok(None)
}

/// Payload slice of a chunk located by [`find_chunk`].
pub(crate) fn chunk_payload<E: ByteOrder>(data: &[u8], at: usize) -> &[u8] {
    let size = E::read_u32(&data[at + 4..at + 8]) as usize;
    &data[at + 8..at + 8 + size]
}

/// Append a whole chunk: id, unpadded payload size, payload, and a single
/// zero pad byte when the payload length is odd.
pub(crate) fn write_chunk<E: ByteOrder>(out: &mut Vec<u8>, id: &[u8; 4], payload: &[u8]) -> R<()> {
    out.extend_from_slice(id);
    out.write_u32::<E>(payload.len() as u32)?;
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    Ok(())
}
