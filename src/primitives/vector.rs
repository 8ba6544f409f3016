//! Vector type for 1D numeric data.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A 1D vector of values.
///
/// # Examples
///
/// ```
/// use mongkol::primitives::Vector;
///
/// let v = Vector::from_slice(&[1.0_f32, 2.0, 3.0]);
/// assert_eq!(v.len(), 3);
/// assert!((v.mean() - 2.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector<T> {
    data: Vec<T>,
}

impl<T: Copy> Vector<T> {
    /// Creates a vector by copying a slice.
    #[must_use]
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Creates a vector taking ownership of a Vec.
    #[must_use]
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the vector has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterates over elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl Vector<f32> {
    /// Creates a vector of zeros.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Arithmetic mean. Returns 0.0 for an empty vector.
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Population variance. Returns 0.0 for an empty vector.
    #[must_use]
    pub fn variance(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let m = self.mean();
        self.data.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / self.data.len() as f32
    }

    /// Sum of all elements.
    #[must_use]
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Minimum element. Returns +inf for an empty vector.
    #[must_use]
    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Maximum element. Returns -inf for an empty vector.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Dot product.
    ///
    /// # Panics
    ///
    /// Panics if lengths differ.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        assert_eq!(
            self.len(),
            other.len(),
            "dot product requires equal lengths"
        );
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Squared Euclidean norm.
    #[must_use]
    pub fn norm_squared(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// Euclidean norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.norm_squared().sqrt()
    }
}

impl std::ops::Sub for &Vector<f32> {
    type Output = Vector<f32>;

    /// # Panics
    ///
    /// Panics if lengths differ.
    fn sub(self, other: Self) -> Vector<f32> {
        assert_eq!(self.len(), other.len(), "subtraction requires equal lengths");
        Vector::from_vec(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a - b)
                .collect(),
        )
    }
}

impl<T> Index<usize> for Vector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for Vector<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<T> IntoIterator for Vector<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_and_len() {
        let v = Vector::from_slice(&[1.0_f32, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert!(!v.is_empty());
    }

    #[test]
    fn test_mean_variance() {
        let v = Vector::from_slice(&[2.0_f32, 4.0, 6.0, 8.0]);
        assert!((v.mean() - 5.0).abs() < 1e-6);
        assert!((v.variance() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_mean_is_zero() {
        let v: Vector<f32> = Vector::from_vec(vec![]);
        assert_eq!(v.mean(), 0.0);
        assert_eq!(v.variance(), 0.0);
    }

    #[test]
    fn test_dot_and_norm() {
        let a = Vector::from_slice(&[1.0_f32, 2.0, 3.0]);
        let b = Vector::from_slice(&[4.0_f32, 5.0, 6.0]);
        assert!((a.dot(&b) - 32.0).abs() < 1e-6);
        assert!((a.norm_squared() - 14.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "equal lengths")]
    fn test_dot_length_mismatch_panics() {
        let a = Vector::from_slice(&[1.0_f32, 2.0]);
        let b = Vector::from_slice(&[1.0_f32]);
        let _ = a.dot(&b);
    }

    #[test]
    fn test_min_max_sum() {
        let v = Vector::from_slice(&[3.0_f32, -1.0, 7.0]);
        assert_eq!(v.min(), -1.0);
        assert_eq!(v.max(), 7.0);
        assert!((v.sum() - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_index_mut() {
        let mut v = Vector::zeros(2);
        v[1] = 5.0;
        assert_eq!(v[1], 5.0);
    }
}
