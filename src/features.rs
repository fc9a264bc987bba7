use ndarray::prelude::*;

/// Reduces a discrete label map to the fraction of pixels assigned to each
/// class. Output has length `classes`, entries >= 0, and sums to 1.0 up to
/// floating rounding.
pub fn class_fractions(labels: ArrayView2<usize>, classes: usize) -> Vec<f32> {
    let total = labels.len();
    let mut counts = vec![0usize; classes];
    for &label in labels.iter() {
        debug_assert!(label < classes);
        counts[label] += 1;
    }
    counts
        .into_iter()
        .map(|count| count as f32 / total as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_labels_are_one_hot() {
        let labels = Array2::from_elem((4, 5), 2usize);
        let fractions = class_fractions(labels.view(), 4);
        assert_eq!(fractions, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let labels = Array2::from_shape_fn((6, 7), |(y, x)| (y * 7 + x) % 5);
        let fractions = class_fractions(labels.view(), 5);
        assert_eq!(fractions.len(), 5);
        assert!(fractions.iter().all(|&f| f >= 0.0));
        let sum: f32 = fractions.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_absent_classes_are_zero() {
        let labels = Array2::from_elem((2, 2), 0usize);
        let fractions = class_fractions(labels.view(), 150);
        assert_eq!(fractions.len(), 150);
        assert_eq!(fractions[0], 1.0);
        assert!(fractions[1..].iter().all(|&f| f == 0.0));
    }
}
