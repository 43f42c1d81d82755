//! The per-step compression loop: match search, code emission, slide and
//! rehash, and look-ahead refill.
//!
//! Owns the window, the look-ahead buffer, and the two lower coders; no
//! ambient mutable state outside this struct.

use std::io::{Read, Write};

use crate::adaptive::AdaptiveCoder;
use crate::bitio::BitWriter;
use crate::error::Error;
use crate::mtf::MtfRank;
use crate::window::WindowIndex;

const MIN_LEN: u32 = 4;
const MFOLD: u32 = 2;
const NMATCH: u32 = 196;
const FAR_LIST: u32 = 4096;
const HASH_BYTES_N: u32 = 4;

#[derive(Default, Clone, Copy, Debug)]
struct Match {
    pos: u32,
    len: u32,
}

pub struct Driver {
    window: WindowIndex,
    lookahead: Box<[u8]>,
    pat_mask: u32,
    win_cnt: u32,
    pat_cnt: u32,
    buf_cnt: u32,
    mtf: MtfRank,
    coder: AdaptiveCoder,
    num_pos_bits: u32,
    bytes_read: u64,
}

impl Driver {
    /// Build a driver with a `1 << num_pos_bits`-byte window and prime the
    /// look-ahead buffer with up to `window_size/2` bytes read from `input`.
    pub fn new<R: Read>(num_pos_bits: u32, input: &mut R) -> Result<Driver, Error> {
        let window = WindowIndex::new(num_pos_bits)?;
        let pat_bufsize = (window.window_size() >> 1) as usize;
        let mut lookahead = vec![0u8; pat_bufsize].into_boxed_slice();
        let got = fill(input, &mut lookahead[..])?;
        Ok(Driver {
            window,
            lookahead,
            pat_mask: (pat_bufsize - 1) as u32,
            win_cnt: 0,
            pat_cnt: 0,
            buf_cnt: got as u32,
            mtf: MtfRank::new(),
            coder: AdaptiveCoder::new(),
            num_pos_bits,
            bytes_read: got as u64,
        })
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn lookahead_at(&self, p: u32) -> u8 {
        self.lookahead[(p & self.pat_mask) as usize]
    }

    fn write_lookahead(&mut self, p: u32, b: u8) {
        let i = (p & self.pat_mask) as usize;
        self.lookahead[i] = b;
    }

    fn hash_of_lookahead(&self, p: u32) -> u32 {
        let b0 = self.lookahead_at(p) as u32;
        let b1 = self.lookahead_at(p.wrapping_add(1)) as u32;
        let b2 = self.lookahead_at(p.wrapping_add(2)) as u32;
        let b3 = self.lookahead_at(p.wrapping_add(3)) as u32;
        let shift = self.num_pos_bits - 8;
        ((b0 << shift) ^ (b1 << 7) ^ (b2 << 4) ^ b3) & self.window.mask()
    }

    /// Walk the hash chain for the current look-ahead context, keeping the
    /// longest match found within the `FAR_LIST`/`NMATCH` caps. Ties favor
    /// the most recently inserted position, since chains are LIFO.
    fn search(&self) -> Match {
        let mut best = Match::default();
        if self.buf_cnt <= 1 {
            return best;
        }

        let h = self.hash_of_lookahead(self.pat_cnt);
        let mut cur = self.window.head(h);
        let mut chain_visits = 0u32;
        let mut improvements = 0u32;

        while let Some(i) = cur {
            // Suffix probe: verify the context plus one trailing byte,
            // right to left, starting at the current best length.
            let mut off = best.len;
            let mut mismatch = false;
            loop {
                if self.lookahead_at(self.pat_cnt.wrapping_add(off))
                    != self.window.byte_at(i.wrapping_add(off))
                {
                    mismatch = true;
                    break;
                }
                if off == 0 {
                    break;
                }
                off -= 1;
            }

            if !mismatch {
                let mut k = best.len + 1;
                if k < self.buf_cnt {
                    loop {
                        if self.lookahead_at(self.pat_cnt.wrapping_add(k))
                            == self.window.byte_at(i.wrapping_add(k))
                        {
                            k += 1;
                            if k < self.buf_cnt {
                                continue;
                            }
                        }
                        break;
                    }
                }
                best.pos = i;
                best.len = k;
                improvements += 1;
                if k == self.buf_cnt || improvements == NMATCH {
                    break;
                }
            }

            chain_visits += 1;
            if chain_visits == FAR_LIST {
                break;
            }
            cur = self.window.next(i);
        }

        best
    }

    /// Emit the framing prefix and payload for `m`, returning the number of
    /// bytes the slide step should advance by (1 for a literal).
    fn emit<W: Write>(&mut self, m: &Match, bw: &mut BitWriter<W>) -> Result<u32, Error> {
        if m.len > MIN_LEN {
            bw.put_one()?;
        } else if m.len == MIN_LEN {
            bw.put_zero()?;
            bw.put_one()?;
        } else {
            bw.put_zero()?;
            bw.put_zero()?;
        }

        if m.len > MIN_LEN {
            let len_code = m.len - (MIN_LEN + 1);
            let mut ones = len_code >> MFOLD;
            while ones > 0 {
                bw.put_one()?;
                ones -= 1;
            }
            bw.put_nbits(
                ((len_code % (1 << MFOLD)) << 1) as u64,
                MFOLD + 1,
            )?;
        }

        let len = if m.len >= MIN_LEN {
            bw.put_nbits(m.pos as u64, self.num_pos_bits)?;
            m.len
        } else {
            let b = self.lookahead_at(self.pat_cnt);
            let rank = self.mtf.mtf(b);
            self.coder.encode(rank, bw)?;
            1
        };
        Ok(len)
    }

    /// Delete the `len + HASH_BYTES_N - 1` affected chain entries, write the
    /// new bytes into the window, then re-insert the same span under its
    /// post-write hash. The order (delete full span, write, re-insert full
    /// span) keeps every chain consistent even though the leading
    /// `HASH_BYTES_N - 1` positions are not themselves overwritten.
    fn slide_and_rehash(&mut self, len: u32) {
        let k0 = self.win_cnt.wrapping_sub(HASH_BYTES_N - 1) & self.window.mask();
        let span = len + HASH_BYTES_N - 1;

        for i in 0..span {
            let pos = k0.wrapping_add(i);
            let h = self.window.hash_at(pos);
            self.window.delete(h, pos);
        }

        for i in 0..len {
            let b = self.lookahead_at(self.pat_cnt.wrapping_add(i));
            self.window.write_byte(self.win_cnt.wrapping_add(i), b);
        }

        for i in 0..span {
            let pos = k0.wrapping_add(i);
            let h = self.window.hash_at(pos);
            self.window.insert(h, pos);
        }
    }

    /// Read up to `len` bytes one at a time to refill the look-ahead after a
    /// slide, shrinking `buf_cnt` by however many fewer were available at
    /// EOF, then advance the window/look-ahead cursors by `len`.
    fn refill<R: Read>(&mut self, input: &mut R, len: u32) -> Result<(), Error> {
        let mut got = 0u32;
        for i in 0..len {
            let mut byte = [0u8; 1];
            match input.read(&mut byte)? {
                0 => break,
                _ => {
                    let p = self.pat_cnt.wrapping_add(i);
                    self.write_lookahead(p, byte[0]);
                    got += 1;
                }
            }
        }
        self.bytes_read += got as u64;
        self.buf_cnt -= len - got;
        self.win_cnt = (self.win_cnt + len) & self.window.mask();
        self.pat_cnt = (self.pat_cnt + len) & self.pat_mask;
        Ok(())
    }

    /// Run the full compression loop, writing every step's codes through
    /// `bw` and flushing it once the look-ahead buffer is exhausted. Returns
    /// the total number of plaintext bytes consumed.
    pub fn compress<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        bw: &mut BitWriter<W>,
    ) -> Result<u64, Error> {
        while self.buf_cnt > 0 {
            let m = self.search();
            let len = self.emit(&m, bw)?;
            self.slide_and_rehash(len);
            self.refill(input, len)?;
        }
        bw.flush()?;
        Ok(self.bytes_read)
    }
}

fn fill<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod test {
    use super::Driver;
    use crate::bitio::BitWriter;
    use std::io::Cursor;

    fn compress_with(num_pos_bits: u32, data: &[u8]) -> Vec<u8> {
        let mut input = Cursor::new(data.to_vec());
        let mut driver = Driver::new(num_pos_bits, &mut input).unwrap();
        let mut bw = BitWriter::new(vec![]);
        driver.compress(&mut input, &mut bw).unwrap();
        bw.into_inner()
    }

    #[test]
    fn empty_input_emits_no_bytes() {
        assert_eq!(Vec::<u8>::new(), compress_with(17, &[]));
    }

    #[test]
    fn single_byte_is_one_literal_step() {
        // framing "00" + empty NYT code + raw 8-bit index of 0x41, padded.
        let out = compress_with(17, &[0x41]);
        assert_eq!(vec![0b0001_0000, 0b0100_0000], out);
    }

    #[test]
    fn four_zero_bytes_is_a_min_len_match_with_no_length_bits() {
        let out = compress_with(17, &[0, 0, 0, 0]);
        // framing "01" then a 17-bit position of the matched occurrence,
        // all zero padded to whole bytes. 2 + 17 = 19 bits -> 3 bytes.
        assert_eq!(3, out.len());
        assert_eq!(0b0, out[0] >> 7 & 1); // leading framing bit is '0'
    }

    #[test]
    fn five_zero_bytes_is_an_over_min_len_match() {
        let out = compress_with(17, &[0, 0, 0, 0, 0]);
        // framing "1" + length code 0 (no unary ones, 3-bit "000") + 17-bit
        // position: 1 + 3 + 17 = 21 bits -> 3 bytes.
        assert_eq!(3, out.len());
        assert_eq!(1, out[0] >> 7 & 1); // leading framing bit is '1'
    }

    #[test]
    fn nine_zero_bytes_is_a_longer_match() {
        let out = compress_with(17, &[0u8; 9]);
        // framing "1" + length code (9-5=4, fold 2 -> one '1' then "000")
        // + 17-bit position: 1 + 1 + 3 + 17 = 22 bits -> 3 bytes.
        assert_eq!(3, out.len());
    }

    #[test]
    fn two_identical_bytes_are_two_literal_steps() {
        let out = compress_with(17, &[0x41, 0x41]);
        assert!(!out.is_empty());
        // first byte still starts with framing "00" for the first, unseen
        // literal.
        assert_eq!(0, out[0] >> 7 & 1);
        assert_eq!(0, out[0] >> 6 & 1);
    }

    #[test]
    fn rejects_out_of_range_window_bits() {
        let mut input = Cursor::new(vec![1, 2, 3]);
        assert!(Driver::new(8, &mut input).is_err());
        assert!(Driver::new(24, &mut input).is_err());
    }

    #[test]
    fn bytes_read_matches_input_length() {
        let data = vec![5u8; 500];
        let mut input = Cursor::new(data.clone());
        let mut driver = Driver::new(12, &mut input).unwrap();
        let mut bw = BitWriter::new(vec![]);
        let n = driver.compress(&mut input, &mut bw).unwrap();
        assert_eq!(data.len() as u64, n);
    }
}
