pub use crate::error::{AudioError, R};
pub use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
pub use memmap2::MmapOptions;
pub use rayon::prelude::*;
pub use std::io::{Cursor, Read, Write};
