//! Circular sliding window plus per-hash doubly-linked position chains.
//!
//! Unlike the single-slot hash tables in `lz77`/`lzss2`-style compressors
//! (overwrite-on-collision), every position that shares a 4-byte hash stays
//! reachable: `insert`/`delete` are O(1) list-splice operations, and the
//! match search (see `driver.rs`) walks the whole chain up to a cap.

use crate::error::Error;

/// Sliding window of `1 << num_pos_bits` bytes with hash-chained positions.
pub struct WindowIndex {
    window: Box<[u8]>,
    head: Box<[Option<u32>]>,
    next: Box<[Option<u32>]>,
    prev: Box<[Option<u32>]>,
    mask: u32,
    hash_shift: u32,
}

impl WindowIndex {
    /// Allocate a window for `num_pos_bits` (must be in `12..=20`) and
    /// eagerly insert every position of the zero-filled window into the
    /// single hash bucket for the all-zeros hash.
    pub fn new(num_pos_bits: u32) -> Result<WindowIndex, Error> {
        if !(12..=20).contains(&num_pos_bits) {
            return Err(Error::InvalidPosBits(num_pos_bits as i32));
        }
        let w = 1usize << num_pos_bits;
        let mut index = WindowIndex {
            window: vec![0u8; w].into_boxed_slice(),
            head: vec![None; w].into_boxed_slice(),
            next: vec![None; w].into_boxed_slice(),
            prev: vec![None; w].into_boxed_slice(),
            mask: (w - 1) as u32,
            hash_shift: num_pos_bits - 8,
        };
        for pos in 0..w as u32 {
            let h = index.hash_at(pos);
            index.insert(h, pos);
        }
        Ok(index)
    }

    pub fn window_size(&self) -> u32 {
        self.mask + 1
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    #[inline(always)]
    fn idx(&self, p: u32) -> usize {
        (p & self.mask) as usize
    }

    pub fn byte_at(&self, pos: u32) -> u8 {
        self.window[self.idx(pos)]
    }

    pub fn write_byte(&mut self, pos: u32, b: u8) {
        let i = self.idx(pos);
        self.window[i] = b;
    }

    /// 4-byte rolling hash at circular position `p`: `(b[p]<<(B-8)) ^
    /// (b[p+1]<<7) ^ (b[p+2]<<4) ^ b[p+3]`, masked to `B` bits. Matches the
    /// window's hash construction used to build and look up chain heads.
    pub fn hash_at(&self, p: u32) -> u32 {
        let b0 = self.byte_at(p) as u32;
        let b1 = self.byte_at(p.wrapping_add(1)) as u32;
        let b2 = self.byte_at(p.wrapping_add(2)) as u32;
        let b3 = self.byte_at(p.wrapping_add(3)) as u32;
        ((b0 << self.hash_shift) ^ (b1 << 7) ^ (b2 << 4) ^ b3) & self.mask
    }

    pub fn head(&self, h: u32) -> Option<u32> {
        self.head[h as usize]
    }

    pub fn next(&self, pos: u32) -> Option<u32> {
        self.next[self.idx(pos)]
    }

    /// Push `pos` onto chain `h` as the new head.
    pub fn insert(&mut self, h: u32, pos: u32) {
        let i = self.idx(pos);
        let old_head = self.head[h as usize];
        self.next[i] = old_head;
        self.prev[i] = None;
        if let Some(oh) = old_head {
            let oi = self.idx(oh);
            self.prev[oi] = Some(pos);
        }
        self.head[h as usize] = Some(pos);
    }

    /// Unlink `pos` from chain `h`.
    pub fn delete(&mut self, h: u32, pos: u32) {
        let i = self.idx(pos);
        let p = self.prev[i];
        let n = self.next[i];
        match p {
            Some(pp) => {
                let pi = self.idx(pp);
                self.next[pi] = n;
            }
            None => {
                self.head[h as usize] = n;
            }
        }
        if let Some(nn) = n {
            let ni = self.idx(nn);
            self.prev[ni] = p;
        }
        self.next[i] = None;
        self.prev[i] = None;
    }
}

#[cfg(test)]
mod test {
    use super::WindowIndex;

    #[test]
    fn rejects_out_of_range_pos_bits() {
        assert!(WindowIndex::new(11).is_err());
        assert!(WindowIndex::new(21).is_err());
        assert!(WindowIndex::new(12).is_ok());
        assert!(WindowIndex::new(20).is_ok());
    }

    #[test]
    fn eager_init_chains_every_position_under_one_bucket() {
        let w = WindowIndex::new(12).unwrap();
        let h0 = w.hash_at(0);
        // every other position hashes the same way against an all-zero
        // window, so they all land in the same chain.
        for p in 1..16u32 {
            assert_eq!(h0, w.hash_at(p));
        }
        let mut count = 0;
        let mut cur = w.head(h0);
        while let Some(pos) = cur {
            count += 1;
            cur = w.next(pos);
            if count > w.window_size() {
                panic!("chain walk did not terminate");
            }
        }
        assert_eq!(w.window_size(), count);
    }

    #[test]
    fn insert_then_delete_restores_chain() {
        let mut w = WindowIndex::new(12).unwrap();
        let h = 5u32;
        w.insert(h, 100);
        w.insert(h, 50);
        assert_eq!(Some(50), w.head(h));
        w.delete(h, 50);
        assert_eq!(Some(100), w.head(h));
        w.delete(h, 100);
        assert_eq!(None, w.head(h));
    }

    #[test]
    fn delete_from_middle_of_chain_keeps_the_rest_linked() {
        let mut w = WindowIndex::new(12).unwrap();
        let h = 9u32;
        w.insert(h, 1);
        w.insert(h, 2);
        w.insert(h, 3);
        // chain (head to tail): 3, 2, 1
        w.delete(h, 2);
        assert_eq!(Some(3), w.head(h));
        assert_eq!(Some(1), w.next(3));
        assert_eq!(None, w.next(1));
    }
}
