//! A compact "table of lists": a list of values for each key, stored as a single
//! value vector plus a vector of start offsets.

use core::ops::{Index, Range};

/// Maps each key `k` in `0..num_keys()` to the slice `table[index[k]..index[k + 1]]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RampTable<T> {
    pub index: Vec<usize>,
    pub table: Vec<T>,
}

impl<T> Default for RampTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RampTable<T> {
    pub fn new() -> Self {
        Self {
            index: vec![0],
            table: Vec::new(),
        }
    }

    pub fn num_keys(&self) -> usize {
        self.index.len() - 1
    }

    pub fn num_values(&self) -> usize {
        self.table.len()
    }

    pub fn values<Q: Into<usize>>(&self, key: Q) -> &[T] {
        let key: usize = key.into();
        &self.table[self.index[key]..self.index[key + 1]]
    }

    /// The range of value indices (into `all_values()`) that belong to `key`.
    pub fn values_range<Q: Into<usize>>(&self, key: Q) -> Range<usize> {
        let key: usize = key.into();
        self.index[key]..self.index[key + 1]
    }

    pub fn all_values(&self) -> &[T] {
        &self.table
    }

    /// Iterates &[T], one for each key in the table.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.index.windows(2).map(move |w| &self.table[w[0]..w[1]])
    }

    /// Iterates &mut [T], one for each key in the table.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        let mut rest: &mut [T] = &mut self.table;
        self.index.windows(2).map(move |w| {
            let taken = core::mem::take(&mut rest);
            let (head, tail) = taken.split_at_mut(w[1] - w[0]);
            rest = tail;
            head
        })
    }

    /// Use like this:
    ///
    ///   rt.push_value(...);
    ///   rt.push_value(...);
    ///   rt.finish_key();
    pub fn push_value(&mut self, value: T) {
        self.table.push(value);
    }

    /// Inserts a value into the unfinished (last, open) key, at `pos` relative to the
    /// start of that key.
    pub fn insert_open_value(&mut self, pos: usize, value: T) {
        let start = self.open_key_start();
        self.table.insert(start + pos, value);
    }

    /// The values pushed since the last call to `finish_key`.
    pub fn open_values(&self) -> &[T] {
        &self.table[self.open_key_start()..]
    }

    fn open_key_start(&self) -> usize {
        self.index[self.index.len() - 1]
    }

    pub fn finish_key(&mut self) {
        let end = self.table.len();
        self.index.push(end);
    }

    pub fn push_entry(&mut self, iter: impl IntoIterator<Item = T>) {
        self.table.extend(iter);
        self.finish_key();
    }
}

impl<T: Clone> RampTable<T> {
    pub fn push_entry_copy_slice(&mut self, values: &[T]) {
        self.table.extend_from_slice(values);
        self.finish_key();
    }
}

impl<T> Index<usize> for RampTable<T> {
    type Output = [T];
    fn index(&self, key: usize) -> &[T] {
        self.values(key)
    }
}

/// Builds a `RampTable` one key at a time, when the keys are started explicitly.
pub struct RampTableBuilder<T> {
    index: Vec<usize>,
    table: Vec<T>,
}

impl<T> RampTableBuilder<T> {
    pub fn with_capacity(keys: usize, values: usize) -> Self {
        Self {
            index: Vec::with_capacity(keys + 1),
            table: Vec::with_capacity(values),
        }
    }

    pub fn start_key(&mut self) {
        self.index.push(self.table.len());
    }

    pub fn push_value(&mut self, item: T) {
        self.table.push(item);
    }

    pub fn finish(mut self) -> RampTable<T> {
        let end = self.table.len();
        self.index.push(end);
        RampTable {
            index: self.index,
            table: self.table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_values() {
        let mut t: RampTable<u32> = RampTable::new();
        t.push_value(1);
        t.push_value(2);
        t.finish_key();
        t.finish_key();
        t.push_entry(vec![7]);
        assert_eq!(t.num_keys(), 3);
        assert_eq!(t.num_values(), 3);
        assert_eq!(t.values(0usize), &[1, 2]);
        assert!(t.values(1usize).is_empty());
        assert_eq!(&t[2], &[7]);
        assert_eq!(t.values_range(2usize), 2..3);
    }

    #[test]
    fn insert_into_open_key() {
        let mut t: RampTable<u32> = RampTable::new();
        t.push_entry(vec![9]);
        t.push_value(1);
        t.push_value(3);
        t.insert_open_value(1, 2);
        assert_eq!(t.open_values(), &[1, 2, 3]);
        t.finish_key();
        for values in t.iter_mut() {
            for v in values.iter_mut() {
                *v += 10;
            }
        }
        assert_eq!(t.iter().collect::<Vec<_>>(), vec![&[19][..], &[11, 12, 13][..]]);
    }

    #[test]
    fn builder_starts_keys_explicitly() {
        let mut b = RampTableBuilder::with_capacity(2, 2);
        b.start_key();
        b.push_value('a');
        b.start_key();
        let t = b.finish();
        assert_eq!(t.num_keys(), 2);
        assert_eq!(t.values(0usize), &['a']);
        assert!(t.values(1usize).is_empty());
    }
}
