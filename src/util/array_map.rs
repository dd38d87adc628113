use std::fmt::{self, Debug};
use std::hash::{Hash};
use std::marker::{PhantomData};

/**
 * Internally represented as a small integer that is usable as an array index.
 */
pub trait AsUsize: Debug + Copy + Hash + Eq {
    fn as_usize(self) -> usize;
}

/**
 * A map whose keys are small integers, stored as a boxed slice.
 * Every key below the length passed to [`ArrayMap::new()`] has a value.
 */
#[derive(Clone, PartialEq, Eq)]
pub struct ArrayMap<K: AsUsize, V>(
    Box<[V]>,
    PhantomData<K>,
);

impl<K: AsUsize, V> ArrayMap<K, V> {
    pub fn new(length: usize) -> Self where V: Default {
        Self::new_with(length, |_| Default::default())
    }

    /** Constructs an `ArrayMap` whose value at index `i` is `f(i)`. */
    pub fn new_with(length: usize, f: impl Fn(usize) -> V) -> Self {
        ArrayMap((0..length).map(f).collect(), PhantomData)
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn values(&self) -> std::slice::Iter<V> { self.0.iter() }

    /** Iterates over the indices that have values, with their values. */
    pub fn iter(&self) -> impl Iterator<Item=(usize, &V)> { self.0.iter().enumerate() }
}

impl<K: AsUsize, V: Debug> Debug for ArrayMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: AsUsize, V> std::ops::Index<K> for ArrayMap<K, V> {
    type Output = V;

    fn index(&self, index: K) -> &V {
        &self.0[index.as_usize()]
    }
}

impl<K: AsUsize, V> std::ops::IndexMut<K> for ArrayMap<K, V> {
    fn index_mut(&mut self, index: K) -> &mut V {
        &mut self.0[index.as_usize()]
    }
}

//-----------------------------------------------------------------------------
