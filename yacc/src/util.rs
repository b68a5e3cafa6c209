//! Bit sets and bit matrices, stored as 32-bit words.

use core::iter::repeat;

pub const BITS_PER_WORD: usize = 32;

/// Number of words needed to store `n` bits.
pub fn word_size(n: usize) -> usize {
    (n + (BITS_PER_WORD - 1)) / BITS_PER_WORD
}

// An M x N matrix of bits
// The representation is in row-major form, with each row padded to a whole number of words.
// The representation is exposed.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmat {
    pub data: Vec<u32>,
    pub rows: usize,
    pub cols: usize,
    /// Number of u32 elements per row
    pub rowsize: usize,
}

impl Bitmat {
    pub fn new(rows: usize, cols: usize) -> Bitmat {
        let rowsize = word_size(cols);
        Bitmat {
            data: vec![0; rowsize * rows],
            rows,
            cols,
            rowsize,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    // r and c are row and column indices, not word offsets.
    pub fn set(&mut self, r: usize, c: usize) {
        assert!(r < self.rows);
        assert!(c < self.cols);
        self.data[r * self.rowsize + (c / BITS_PER_WORD)] |= 1u32 << (c % BITS_PER_WORD);
    }

    pub fn get(&self, r: usize, c: usize) -> bool {
        assert!(r < self.rows);
        assert!(c < self.cols);
        (self.data[r * self.rowsize + (c / BITS_PER_WORD)] & (1u32 << (c % BITS_PER_WORD))) != 0
    }

    /// The words of row `r`.
    pub fn row(&self, r: usize) -> &[u32] {
        let start = r * self.rowsize;
        &self.data[start..start + self.rowsize]
    }

    /// `row[dst] |= row[src]`
    pub fn union_rows(&mut self, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let rowsize = self.rowsize;
        for k in 0..rowsize {
            let w = self.data[src * rowsize + k];
            self.data[dst * rowsize + k] |= w;
        }
    }

    /// `row[dst] = row[src]`
    pub fn copy_row(&mut self, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let rowsize = self.rowsize;
        self.data
            .copy_within(src * rowsize..(src + 1) * rowsize, dst * rowsize);
    }

    // This method returns an iterator which gives the positions of all
    // columns within a particular row 'r' where the row/col = 1.
    pub fn iter_ones_in_row<'a>(&'a self, r: usize) -> BitMaskIterator<'a> {
        assert!(r < self.rows);
        bit_vector_iter_ones(self.row(r), self.cols)
    }

    // Performs a row-major scan for bits that are set to one, and enumerates (row,col) items.
    pub fn iter_ones<'a>(&'a self) -> impl Iterator<Item = (usize, usize)> + 'a {
        (0..self.rows).flat_map(move |r| self.iter_ones_in_row(r).map(move |c| (r, c)))
    }
}

impl core::fmt::Debug for Bitmat {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct Values<'a>(&'a Bitmat);

        impl<'a> core::fmt::Debug for Values<'a> {
            fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut dl = fmt.debug_list();
                for (i, j) in self.0.iter_ones() {
                    dl.entry(&(i, j));
                }
                dl.finish()
            }
        }

        let mut b = fmt.debug_struct("Bitmat");
        b.field("rows", &self.rows);
        b.field("cols", &self.cols);
        b.field("values", &Values(self));
        b.finish()
    }
}

pub struct BitMaskIterator<'a> {
    words: &'a [u32],
    // contains the bits that we are currently reading
    current: u32,
    // number of bits in entire sequence
    nbits: usize,
    // current bit position
    bitpos: usize,
}

impl<'a> Iterator for BitMaskIterator<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.bitpos < self.nbits {
            let nextbit = self.bitpos % BITS_PER_WORD;
            if nextbit == 0 {
                self.current = self.words[self.bitpos / BITS_PER_WORD];

                // Fast path.  Step over entire words, if they are empty.
                if self.current == 0 {
                    self.bitpos += BITS_PER_WORD;
                    continue;
                }
            }

            let cpos = self.bitpos;
            self.bitpos += 1;
            if ((self.current >> nextbit) & 1) != 0 {
                return Some(cpos);
            }
        }
        None
    }
}

/// Iterates the indices of all of the bits set to 1 in a given bit vector.
pub fn bit_vector_iter_ones<'a>(words: &'a [u32], nbits: usize) -> BitMaskIterator<'a> {
    assert!(words.len() >= word_size(nbits));
    BitMaskIterator {
        words,
        current: 0,
        nbits,
        bitpos: 0,
    }
}

/// A fixed-size bit vector.
#[derive(Clone, Debug)]
pub struct Bitv32 {
    pub data: Vec<u32>,
    pub nbits: usize,
}

impl Bitv32 {
    pub fn from_elem(n: usize, value: bool) -> Bitv32 {
        let w = if value { !0u32 } else { 0u32 };
        Bitv32 {
            data: repeat(w).take(word_size(n)).collect(),
            nbits: n,
        }
    }

    pub fn set_all(&mut self, value: bool) {
        let w = if value { !0u32 } else { 0u32 };
        for i in self.data.iter_mut() {
            *i = w;
        }
    }

    pub fn set(&mut self, i: usize) {
        assert!(i < self.nbits);
        self.data[i / BITS_PER_WORD] |= 1u32 << (i % BITS_PER_WORD);
    }

    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.nbits);
        (self.data[i / BITS_PER_WORD] >> (i % BITS_PER_WORD)) & 1 != 0
    }

    pub fn iter_ones<'a>(&'a self) -> BitMaskIterator<'a> {
        bit_vector_iter_ones(&self.data, self.nbits)
    }
}
