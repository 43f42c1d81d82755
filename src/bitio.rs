//! MSB-first bit-level output sink.

use std::io;
use std::io::Write;

/// Buffers output bytes and emits bit fields most-significant-bit first.
///
/// Output is byte-identical for identical call sequences: `put_one`/
/// `put_zero`/`put_nbits` just pack bits into the pending byte and flush it
/// to the inner writer once it fills up.
pub struct BitWriter<W> {
    inner: W,
    buf: u8,
    mask: u8,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> BitWriter<W> {
        BitWriter {
            inner,
            buf: 0,
            mask: 0x80,
        }
    }

    fn put_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.buf |= self.mask;
        }
        self.mask >>= 1;
        if self.mask == 0 {
            self.inner.write_all(&[self.buf])?;
            self.mask = 0x80;
            self.buf = 0;
        }
        Ok(())
    }

    pub fn put_one(&mut self) -> io::Result<()> {
        self.put_bit(true)
    }

    pub fn put_zero(&mut self) -> io::Result<()> {
        self.put_bit(false)
    }

    /// Write the low `n` bits of `value`, most-significant-first. `n` must
    /// be at most 64.
    pub fn put_nbits(&mut self, value: u64, n: u32) -> io::Result<()> {
        let mut count = n;
        while count > 0 {
            count -= 1;
            self.put_bit((value & (1 << count)) != 0)?;
        }
        Ok(())
    }

    /// Pad the trailing byte with zero bits and write it, then flush the
    /// inner writer. Safe to call more than once.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.mask != 0x80 {
            self.inner.write_all(&[self.buf])?;
            self.mask = 0x80;
            self.buf = 0;
        }
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod test {
    use super::BitWriter;

    #[test]
    fn put_one_zero() {
        let mut bw = BitWriter::new(vec![]);
        bw.put_one().unwrap();
        bw.put_zero().unwrap();
        bw.put_one().unwrap();
        bw.put_one().unwrap();
        bw.put_zero().unwrap();
        bw.flush().unwrap();
        assert_eq!(vec![0b1011_0000], bw.into_inner());
    }

    #[test]
    fn put_nbits() {
        let mut bw = BitWriter::new(vec![]);
        bw.put_nbits(0b1011, 4).unwrap();
        bw.put_nbits(0b000, 3).unwrap();
        bw.put_nbits(0b0010, 4).unwrap();
        bw.put_nbits(0b11111, 5).unwrap();
        bw.put_nbits(0b11, 2).unwrap();
        bw.put_nbits(0b11_0010_1010, 10).unwrap();
        bw.flush().unwrap();
        assert_eq!(
            vec![0b1011_0000, 0b0101_1111, 0b1111_0010, 0b1010_0000],
            bw.into_inner()
        );
    }

    #[test]
    fn flush_is_idempotent_and_pads_with_zeros() {
        let mut bw = BitWriter::new(vec![]);
        bw.put_one().unwrap();
        bw.flush().unwrap();
        bw.flush().unwrap();
        assert_eq!(vec![0b1000_0000], bw.into_inner());
    }

    #[test]
    fn empty_stream_flushes_nothing() {
        let mut bw = BitWriter::new(vec![]);
        bw.flush().unwrap();
        assert_eq!(Vec::<u8>::new(), bw.into_inner());
    }
}
