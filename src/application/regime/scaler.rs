use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Per-column z-score standardization (population std, zero std scales by 1).
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    /// `None` for an empty matrix.
    pub fn fit(data: ArrayView2<f64>) -> Option<Self> {
        let means = data.mean_axis(Axis(0))?;
        let scales = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        Some(Self { means, scales })
    }

    pub fn transform(&self, data: ArrayView2<f64>) -> Array2<f64> {
        (&data - &self.means) / &self.scales
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.means) / &self.scales
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn scales(&self) -> &Array1<f64> {
        &self.scales
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_columns_are_centered_and_scaled() {
        let data = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(data.view()).unwrap();
        let scaled = scaler.transform(data.view());

        let std = (8.0f64 / 3.0).sqrt();
        assert!((scaled[[0, 0]] + 2.0 / std).abs() < 1e-12);
        assert!(scaled[[1, 0]].abs() < 1e-12);
        // Constant column: centered, scale 1.
        assert_eq!(scaler.scales()[1], 1.0);
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_empty_matrix_has_no_scaler() {
        let data = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(data.view()).is_none());
    }
}
