//! Coercive list
//!
//! A sequence whose every element has gone through a conversion function.
//! Array fields hand one out keyed to the element field's coercion, so values
//! appended after loading are typed the same way as loaded ones.

use crate::errors::CodecError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Conversion applied to every incoming element
pub type Coercer<T, E> = Arc<dyn Fn(T) -> Result<T, E> + Send + Sync>;

/// Typed list wrapper.
///
/// There is no mutable indexing; writes go through [`push`](Self::push),
/// [`insert`](Self::insert), [`extend`](Self::extend) or [`set`](Self::set),
/// all of which coerce first. Read access derefs to a slice.
pub struct CoerciveList<T, E = CodecError> {
    coerce: Coercer<T, E>,
    items: Vec<T>,
}

impl<T, E> CoerciveList<T, E> {
    pub fn new(coerce: Coercer<T, E>) -> Self {
        Self {
            coerce,
            items: Vec::new(),
        }
    }

    /// Build a list from an initial iterable, coercing each element
    pub fn with_items<I>(coerce: Coercer<T, E>, items: I) -> Result<Self, E>
    where
        I: IntoIterator<Item = T>,
    {
        let mut list = Self::new(coerce);
        list.extend(items)?;
        Ok(list)
    }

    pub fn push(&mut self, item: T) -> Result<(), E> {
        let item = (self.coerce)(item)?;
        self.items.push(item);
        Ok(())
    }

    /// Insert at `index`; an index past the end appends
    pub fn insert(&mut self, index: usize, item: T) -> Result<(), E> {
        let item = (self.coerce)(item)?;
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        Ok(())
    }

    /// Append every element; stops at the first coercion failure, keeping
    /// the elements appended before it.
    pub fn extend<I>(&mut self, items: I) -> Result<(), E>
    where
        I: IntoIterator<Item = T>,
    {
        for item in items {
            self.push(item)?;
        }
        Ok(())
    }

    /// Replace the element at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, item: T) -> Result<T, E> {
        let item = (self.coerce)(item)?;
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    pub fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T, E> Deref for CoerciveList<T, E> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

// A copy keeps the same coercion function.
impl<T: Clone, E> Clone for CoerciveList<T, E> {
    fn clone(&self) -> Self {
        Self {
            coerce: Arc::clone(&self.coerce),
            items: self.items.clone(),
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for CoerciveList<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: PartialEq, E> PartialEq<Vec<T>> for CoerciveList<T, E> {
    fn eq(&self, other: &Vec<T>) -> bool {
        &self.items == other
    }
}

impl<T: PartialEq, E> PartialEq for CoerciveList<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T, E> IntoIterator for CoerciveList<T, E> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
