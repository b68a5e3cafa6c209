//! A `Vec` that is indexed by one of the packed index types (`Symbol`, `State`, ...)
//! rather than by `usize`.

use core::fmt::{Debug, Formatter};
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

#[derive(Clone, PartialEq, Eq)]
pub struct TVec<I, T> {
    vec: Vec<T>,
    phantom_i: PhantomData<I>,
}

impl<I, T> Default for TVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T> TVec<I, T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(vec: Vec<T>) -> Self {
        Self {
            vec,
            phantom_i: PhantomData,
        }
    }

    pub fn push(&mut self, value: T) {
        self.vec.push(value);
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.vec.iter()
    }
}

impl<I, T: Debug> Debug for TVec<I, T> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> core::fmt::Result {
        self.vec.fmt(fmt)
    }
}

impl<I: Into<usize>, T> Index<I> for TVec<I, T> {
    type Output = T;
    fn index(&self, index: I) -> &T {
        &self.vec[index.into()]
    }
}

impl<I: Into<usize>, T> IndexMut<I> for TVec<I, T> {
    fn index_mut(&mut self, index: I) -> &mut T {
        &mut self.vec[index.into()]
    }
}
