use ndarray::Array1;

/// Index and value of the first maximum. NaN entries never win.
pub(crate) fn argmax(v: &Array1<f64>) -> (usize, f64) {
    let mut best_i = 0usize;
    let mut best_v = v[0];
    for (i, &val) in v.iter().enumerate() {
        if val > best_v || best_v.is_nan() {
            best_v = val;
            best_i = i;
        }
    }
    (best_i, best_v)
}

/// Index and value of the first minimum.
pub(crate) fn argmin(v: &Array1<f64>) -> (usize, f64) {
    let mut best_i = 0usize;
    let mut best_v = v[0];
    for (i, &val) in v.iter().enumerate() {
        if val < best_v || best_v.is_nan() {
            best_v = val;
            best_i = i;
        }
    }
    (best_i, best_v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_extremum_wins_ties() {
        let v = array![1.0, 3.0, 3.0, -2.0, -2.0];
        assert_eq!(argmax(&v), (1, 3.0));
        assert_eq!(argmin(&v), (3, -2.0));
    }

    #[test]
    fn test_neg_infinity_is_worst() {
        let v = array![f64::NEG_INFINITY, -5.0, f64::NEG_INFINITY];
        assert_eq!(argmax(&v), (1, -5.0));
        assert_eq!(argmin(&v).0, 0);
    }
}
