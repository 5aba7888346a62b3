//! [`Capped`], an append-until-full sequence.
//!
//! Pattern statistics keep the *first* N discoveries for each field. Once a
//! field is full, later discoveries are dropped rather than rotated in, so the
//! cap is enforced at insertion time and never retroactively.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A `Vec` that refuses elements once it holds `N` of them.
///
/// Serialises as a plain JSON array. Deserialising an over-long array keeps
/// only its first `N` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capped<T, const N: usize> {
  items: Vec<T>,
}

impl<T, const N: usize> Capped<T, N> {
  pub const CAPACITY: usize = N;

  pub fn new() -> Self { Self { items: Vec::new() } }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn is_full(&self) -> bool { self.items.len() >= N }

  pub fn first(&self) -> Option<&T> { self.items.first() }

  pub fn iter(&self) -> std::slice::Iter<'_, T> { self.items.iter() }

  pub fn as_slice(&self) -> &[T] { &self.items }

  /// Append `item` unless the sequence is full. Returns whether it was kept.
  pub fn push(&mut self, item: T) -> bool {
    if self.is_full() {
      return false;
    }
    self.items.push(item);
    true
  }

  /// Append every element of `other` in order until full.
  pub fn append(&mut self, other: impl IntoIterator<Item = T>) {
    for item in other {
      if !self.push(item) {
        break;
      }
    }
  }
}

impl<T: PartialEq, const N: usize> Capped<T, N> {
  /// Append `item` unless the sequence is full or already contains it.
  /// Returns whether it was kept.
  pub fn insert(&mut self, item: T) -> bool {
    if self.is_full() || self.items.contains(&item) {
      return false;
    }
    self.items.push(item);
    true
  }

  /// Insert every element of `other` in order, skipping duplicates, until
  /// full.
  pub fn union(&mut self, other: impl IntoIterator<Item = T>) {
    for item in other {
      if self.is_full() {
        break;
      }
      self.insert(item);
    }
  }

  pub fn contains(&self, item: &T) -> bool { self.items.contains(item) }
}

impl<T, const N: usize> Default for Capped<T, N> {
  fn default() -> Self { Self::new() }
}

impl<T, const N: usize> IntoIterator for Capped<T, N> {
  type IntoIter = std::vec::IntoIter<T>;
  type Item = T;

  fn into_iter(self) -> Self::IntoIter { self.items.into_iter() }
}

impl<'a, T, const N: usize> IntoIterator for &'a Capped<T, N> {
  type IntoIter = std::slice::Iter<'a, T>;
  type Item = &'a T;

  fn into_iter(self) -> Self::IntoIter { self.items.iter() }
}

impl<T: Serialize, const N: usize> Serialize for Capped<T, N> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.items.serialize(serializer)
  }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de>
  for Capped<T, N>
{
  fn deserialize<D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Self, D::Error> {
    let mut items = Vec::<T>::deserialize(deserializer)?;
    items.truncate(N);
    Ok(Self { items })
  }
}
