//! Halton (2, 3) sub-pixel offsets.

/// Radical inverse of `index` in `base`, in `[0, 1)`.
#[inline]
pub fn halton(index: u32, base: u32) -> f32 {
    let mut result = 0.0f32;
    let mut f = 1.0f32;
    let mut i = index;

    while i > 0 {
        f /= base as f32;
        result += f * (i % base) as f32;
        i /= base;
    }

    result
}

/// `len` offsets in pixel units, each component in `[-0.5, 0.5)`.
///
/// Indices start at 1 because the zeroth Halton point is the origin for
/// every base, which would sample the same corner twice.
pub fn jitter_table(len: u32) -> Vec<[f32; 2]> {
    (1..=len)
        .map(|i| [halton(i, 2) - 0.5, halton(i, 3) - 0.5])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halton_base_2() {
        // 1/2, 1/4, 3/4, 1/8
        assert!((halton(1, 2) - 0.5).abs() < 1e-6);
        assert!((halton(2, 2) - 0.25).abs() < 1e-6);
        assert!((halton(3, 2) - 0.75).abs() < 1e-6);
        assert!((halton(4, 2) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn halton_base_3() {
        assert!((halton(1, 3) - 1.0 / 3.0).abs() < 1e-6);
        assert!((halton(2, 3) - 2.0 / 3.0).abs() < 1e-6);
        assert!((halton(3, 3) - 1.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn table_has_budget_entries_in_range() {
        let table = jitter_table(30);
        assert_eq!(table.len(), 30);
        for [x, y] in &table {
            assert!((-0.5..0.5).contains(x));
            assert!((-0.5..0.5).contains(y));
        }
    }

    #[test]
    fn table_entries_are_distinct() {
        let table = jitter_table(16);
        for (i, a) in table.iter().enumerate() {
            for b in &table[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
