//! Warshall's algorithm, operating a word at a time on a square `Bitmat`.

use crate::util::{Bitmat, BITS_PER_WORD};

/// Replaces `r` with its transitive closure.
///
/// For each column `i` (in increasing order), every row `j` that has bit `i` set gets row `i`
/// or'ed into it.  `cword` / `bit` walk down the diagonal one bit at a time.
pub fn transitive_closure(r: &mut Bitmat) {
    assert_eq!(r.rows, r.cols);
    let rowsize = r.rowsize;
    let relend = r.rows * rowsize;

    let mut cword: usize = 0;
    let mut bit: usize = 0;
    let mut rowi: usize = 0;

    while rowi < relend {
        let mut ccol = cword;
        let mut rowj: usize = 0;

        while rowj < relend {
            if (r.data[ccol] & (1u32 << bit)) != 0 {
                for k in 0..rowsize {
                    let w = r.data[rowi + k];
                    r.data[rowj + k] |= w;
                }
            }
            rowj += rowsize;
            ccol += rowsize;
        }

        bit += 1;
        if bit >= BITS_PER_WORD {
            bit = 0;
            cword += 1;
        }

        rowi += rowsize;
    }
}

/// Transitive closure, then every diagonal bit is set.
pub fn reflexive_transitive_closure(r: &mut Bitmat) {
    transitive_closure(r);
    for i in 0..r.rows {
        r.set(i, i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Bitmat {
        let mut m = Bitmat::new(n, n);
        for i in 0..n - 1 {
            m.set(i, i + 1);
        }
        m
    }

    #[test]
    fn closes_a_chain() {
        let mut m = chain(40);
        transitive_closure(&mut m);
        for i in 0..40 {
            for j in 0..40 {
                assert_eq!(m.get(i, j), j > i, "({}, {})", i, j);
            }
        }
    }

    #[test]
    fn reflexive_sets_diagonal() {
        let mut m = Bitmat::new(3, 3);
        m.set(2, 0);
        reflexive_transitive_closure(&mut m);
        assert!(m.get(0, 0) && m.get(1, 1) && m.get(2, 2));
        assert!(m.get(2, 0));
        assert!(!m.get(0, 2));
    }

    #[test]
    fn closure_is_idempotent() {
        let mut m = Bitmat::new(37, 37);
        for &(a, b) in &[(0, 5), (5, 36), (36, 2), (2, 0), (10, 11), (11, 33), (20, 20)] {
            m.set(a, b);
        }
        reflexive_transitive_closure(&mut m);
        let once = m.clone();
        reflexive_transitive_closure(&mut m);
        assert_eq!(once, m);

        // the cycle 0 -> 5 -> 36 -> 2 -> 0 is fully connected
        for &a in &[0, 5, 36, 2] {
            for &b in &[0, 5, 36, 2] {
                assert!(m.get(a, b));
            }
        }
        assert!(m.get(10, 33));
        assert!(!m.get(33, 10));
    }
}
