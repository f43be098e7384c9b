/*!
Fixed-length bit vector backing the fragmented set representation.

Storage is a `succinct::BitVector<u64>`, but all reads and writes go
through whole blocks, with bit `i` stored at bit `i % 64` of block
`i / 64`. Bits past `len` in the last block are always zero.
*/

use succinct::{BitVec, BitVecMut, BitVector};

const BLOCK: usize = 64;

#[derive(Clone)]
pub struct Bitmap {
    bits: BitVector<u64>,
    len: usize,
}

impl Bitmap {
    /// A bitmap of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        let blocks = Self::blocks_for(len);
        let bits = BitVector::with_fill((blocks * BLOCK) as u64, false);
        Bitmap { bits, len }
    }

    /// A bitmap of `len` set bits.
    pub fn full(len: usize) -> Self {
        let mut map = Self::new(len);
        if len > 0 {
            map.set_range(0, len - 1);
        }
        map
    }

    #[inline]
    fn blocks_for(len: usize) -> usize {
        (len + BLOCK - 1) / BLOCK
    }

    #[inline]
    fn block_count(&self) -> usize {
        Self::blocks_for(self.len)
    }

    #[inline]
    fn block(&self, ix: usize) -> u64 {
        self.bits.get_block(ix)
    }

    #[inline]
    fn set_block(&mut self, ix: usize, value: u64) {
        self.bits.set_block(ix, value);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if no bit is set.
    pub fn is_clear(&self) -> bool {
        (0..self.block_count()).all(|b| self.block(b) == 0)
    }

    #[inline]
    pub fn get(&self, ix: usize) -> bool {
        if ix >= self.len {
            return false;
        }
        (self.block(ix / BLOCK) >> (ix % BLOCK)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, ix: usize) {
        assert!(ix < self.len, "bit {} out of bounds {}", ix, self.len);
        let b = ix / BLOCK;
        let word = self.block(b) | (1u64 << (ix % BLOCK));
        self.set_block(b, word);
    }

    #[inline]
    pub fn unset(&mut self, ix: usize) {
        if ix < self.len {
            let b = ix / BLOCK;
            let word = self.block(b) & !(1u64 << (ix % BLOCK));
            self.set_block(b, word);
        }
    }

    /// Sets every bit in the inclusive range `[from, to]`.
    pub fn set_range(&mut self, from: usize, to: usize) {
        if from > to {
            return;
        }
        assert!(to < self.len, "bit {} out of bounds {}", to, self.len);
        let first = from / BLOCK;
        let last = to / BLOCK;
        for b in first..=last {
            let lo = if b == first { from % BLOCK } else { 0 };
            let hi = if b == last { to % BLOCK } else { BLOCK - 1 };
            let mask = if hi - lo + 1 == BLOCK {
                !0u64
            } else {
                ((1u64 << (hi - lo + 1)) - 1) << lo
            };
            let word = self.block(b) | mask;
            self.set_block(b, word);
        }
    }

    /// Clears every bit below `ix`.
    pub fn clear_below(&mut self, ix: usize) {
        let ix = ix.min(self.len);
        for b in 0..Self::blocks_for(ix) {
            let lo = b * BLOCK;
            if lo + BLOCK <= ix {
                self.set_block(b, 0);
            } else {
                let keep = !((1u64 << (ix - lo)) - 1);
                let word = self.block(b) & keep;
                self.set_block(b, word);
            }
        }
    }

    /// Clears every bit above `ix`.
    pub fn clear_above(&mut self, ix: usize) {
        if ix + 1 >= self.len {
            return;
        }
        let from = ix + 1;
        let first = from / BLOCK;
        for b in first..self.block_count() {
            if b == first && from % BLOCK != 0 {
                let keep = (1u64 << (from % BLOCK)) - 1;
                let word = self.block(b) & keep;
                self.set_block(b, word);
            } else {
                self.set_block(b, 0);
            }
        }
    }

    fn zip_with<F>(&mut self, other: &Bitmap, f: F)
    where
        F: Fn(u64, u64) -> u64,
    {
        let blocks = self.block_count();
        for b in 0..blocks {
            let rhs = if b < other.block_count() {
                other.block(b)
            } else {
                0
            };
            let word = f(self.block(b), rhs);
            self.set_block(b, word);
        }
        // keep the tail of the last block clean
        if self.len % BLOCK != 0 && blocks > 0 {
            let mask = (1u64 << (self.len % BLOCK)) - 1;
            let word = self.block(blocks - 1) & mask;
            self.set_block(blocks - 1, word);
        }
    }

    pub fn union_with(&mut self, other: &Bitmap) {
        self.zip_with(other, |a, b| a | b);
    }

    pub fn intersect_with(&mut self, other: &Bitmap) {
        self.zip_with(other, |a, b| a & b);
    }

    pub fn xor_with(&mut self, other: &Bitmap) {
        self.zip_with(other, |a, b| a ^ b);
    }

    pub fn count_ones(&self) -> usize {
        (0..self.block_count())
            .map(|b| self.block(b).count_ones() as usize)
            .sum()
    }

    /// Index of the first set bit at or after `from`.
    pub fn next_one(&self, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let mut b = from / BLOCK;
        let mut word = self.block(b) & (!0u64 << (from % BLOCK));
        loop {
            if word != 0 {
                let ix = b * BLOCK + word.trailing_zeros() as usize;
                return if ix < self.len { Some(ix) } else { None };
            }
            b += 1;
            if b >= self.block_count() {
                return None;
            }
            word = self.block(b);
        }
    }

    /// Index of the first cleared bit at or after `from`.
    pub fn next_zero(&self, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let mut b = from / BLOCK;
        let mut word = !self.block(b) & (!0u64 << (from % BLOCK));
        loop {
            if word != 0 {
                let ix = b * BLOCK + word.trailing_zeros() as usize;
                return if ix < self.len { Some(ix) } else { None };
            }
            b += 1;
            if b >= self.block_count() {
                return None;
            }
            word = !self.block(b);
        }
    }

    /// Index of the last set bit.
    pub fn last_one(&self) -> Option<usize> {
        (0..self.block_count()).rev().find_map(|b| {
            let word = self.block(b);
            if word == 0 {
                None
            } else {
                Some(b * BLOCK + (BLOCK - 1) - word.leading_zeros() as usize)
            }
        })
    }

    pub fn ones(&self) -> Ones<'_> {
        Ones {
            map: self,
            next: self.next_one(0),
        }
    }

    pub fn to_binary_string(&self) -> String {
        (0..self.len)
            .map(|ix| if self.get(ix) { '1' } else { '0' })
            .collect()
    }

    /// Decodes a string over `{0,1}` of at most `len` characters into
    /// a bitmap of length `len`. Returns `None` on any other character
    /// or an overlong string.
    pub fn from_binary_str(value: &str, len: usize) -> Option<Self> {
        if value.len() > len {
            return None;
        }
        let mut map = Bitmap::new(len);
        for (ix, c) in value.bytes().enumerate() {
            match c {
                b'1' => map.set(ix),
                b'0' => (),
                _ => return None,
            }
        }
        Some(map)
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Bitmap) -> bool {
        self.len == other.len
            && (0..self.block_count()).all(|b| self.block(b) == other.block(b))
    }
}

impl Eq for Bitmap {}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitmap({})", self.to_binary_string())
    }
}

/// Iterator over the indices of set bits
pub struct Ones<'a> {
    map: &'a Bitmap,
    next: Option<usize>,
}

impl<'a> Iterator for Ones<'a> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.map.next_one(current + 1);
        Some(current)
    }
}

impl<'a> std::iter::FusedIterator for Ones<'a> {}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn from_bools(bools: &[bool]) -> Bitmap {
        let mut map = Bitmap::new(bools.len());
        bools
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .for_each(|(ix, _)| map.set(ix));
        map
    }

    #[test]
    fn set_range_across_blocks() {
        let mut map = Bitmap::new(200);
        map.set_range(60, 130);
        assert_eq!(map.count_ones(), 71);
        assert_eq!(map.next_one(0), Some(60));
        assert_eq!(map.last_one(), Some(130));
        assert_eq!(map.next_zero(60), Some(131));
        assert!(!map.get(59));
        assert!(map.get(64));
    }

    #[test]
    fn full_keeps_tail_clean() {
        let mut map = Bitmap::full(70);
        assert_eq!(map.count_ones(), 70);
        assert_eq!(map.next_zero(0), None);

        let other = Bitmap::new(70);
        map.xor_with(&other);
        assert_eq!(map.count_ones(), 70);
        assert_eq!(map.last_one(), Some(69));
    }

    #[test]
    fn clear_below_and_above() {
        let mut map = Bitmap::full(150);
        map.clear_below(10);
        map.clear_above(100);
        assert_eq!(map.next_one(0), Some(10));
        assert_eq!(map.last_one(), Some(100));
        assert_eq!(map.count_ones(), 91);
    }

    #[test]
    fn binary_string_roundtrip() {
        let map = Bitmap::from_binary_str("0101", 6).unwrap();
        assert_eq!(map.to_binary_string(), "010100");
        assert!(Bitmap::from_binary_str("01x", 6).is_none());
        assert!(Bitmap::from_binary_str("0101011", 6).is_none());
    }

    quickcheck! {
        fn prop_count_matches_ones(bools: Vec<bool>) -> bool {
            let map = from_bools(&bools);
            let expected = bools.iter().filter(|b| **b).count();
            map.count_ones() == expected && map.ones().count() == expected
        }
    }

    quickcheck! {
        fn prop_xor_self_is_clear(bools: Vec<bool>) -> bool {
            let mut map = from_bools(&bools);
            let copy = map.clone();
            map.xor_with(&copy);
            map.is_clear()
        }
    }

    quickcheck! {
        fn prop_last_one_matches(bools: Vec<bool>) -> bool {
            let map = from_bools(&bools);
            map.last_one() == bools.iter().rposition(|b| *b)
        }
    }
}
