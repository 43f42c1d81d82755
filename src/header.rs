//! Fixed file header written before the bitstream.
//!
//! Laid out explicitly as little-endian bytes rather than a raw struct dump,
//! so the on-disk format does not depend on the producer's platform.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Error;

pub const ALGORITHM: [u8; 4] = *b"LZU\0";
pub const HEADER_LEN: u64 = 16;

/// `algorithm` (4 bytes) + `file_size` (8 bytes, signed LE) + `num_pos_bits`
/// (4 bytes, signed LE).
pub struct FileStamp {
    pub algorithm: [u8; 4],
    pub file_size: i64,
    pub num_pos_bits: i32,
}

impl FileStamp {
    pub fn new(num_pos_bits: i32) -> FileStamp {
        FileStamp {
            algorithm: ALGORITHM,
            file_size: 0,
            num_pos_bits,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN as usize] {
        let mut buf = [0u8; HEADER_LEN as usize];
        buf[0..4].copy_from_slice(&self.algorithm);
        buf[4..12].copy_from_slice(&self.file_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.num_pos_bits.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_LEN as usize]) -> FileStamp {
        let mut algorithm = [0u8; 4];
        algorithm.copy_from_slice(&buf[0..4]);
        let file_size = i64::from_le_bytes(buf[4..12].try_into().unwrap());
        let num_pos_bits = i32::from_le_bytes(buf[12..16].try_into().unwrap());
        FileStamp {
            algorithm,
            file_size,
            num_pos_bits,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        out.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Seek to the start of the stream and rewrite the header with the
    /// current `file_size`, leaving the stream position at the start of the
    /// bitstream payload.
    pub fn rewrite<W: Write + Seek>(&self, out: &mut W) -> Result<(), Error> {
        out.seek(SeekFrom::Start(0))?;
        out.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(input: &mut R) -> Result<FileStamp, Error> {
        let mut buf = [0u8; HEADER_LEN as usize];
        input.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(e),
        })?;
        Ok(FileStamp::from_bytes(&buf))
    }
}

#[cfg(test)]
mod test {
    use super::FileStamp;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_bytes() {
        let stamp = FileStamp {
            algorithm: *b"LZU\0",
            file_size: 123_456_789,
            num_pos_bits: 17,
        };
        let bytes = stamp.to_bytes();
        let back = FileStamp::from_bytes(&bytes);
        assert_eq!(stamp.algorithm, back.algorithm);
        assert_eq!(stamp.file_size, back.file_size);
        assert_eq!(stamp.num_pos_bits, back.num_pos_bits);
    }

    #[test]
    fn encodes_little_endian() {
        let stamp = FileStamp {
            algorithm: *b"LZU\0",
            file_size: 1,
            num_pos_bits: 17,
        };
        let bytes = stamp.to_bytes();
        assert_eq!(&bytes[0..4], b"LZU\0");
        assert_eq!(&bytes[4..12], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &[17, 0, 0, 0]);
    }

    #[test]
    fn rewrite_updates_file_size_in_place() {
        let mut cursor = Cursor::new(vec![0u8; 16]);
        let mut stamp = FileStamp::new(17);
        stamp.write_to(&mut cursor).unwrap();
        stamp.file_size = 42;
        stamp.rewrite(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        let back = FileStamp::from_bytes(&bytes.try_into().unwrap());
        assert_eq!(42, back.file_size);
    }

    #[test]
    fn read_from_short_stream_is_unexpected_eof() {
        let mut cursor = Cursor::new(vec![0u8; 4]);
        match FileStamp::read_from(&mut cursor) {
            Err(super::Error::UnexpectedEof) => {}
            other => panic!("expected UnexpectedEof, got {:?}", other.is_ok()),
        }
    }
}
