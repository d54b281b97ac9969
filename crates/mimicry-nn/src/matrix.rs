/// Row-major `f32` matrix with an explicit shape.
///
/// Layer weights are stored as `[in_dim × out_dim]`: row `i` holds the
/// weights leaving input `i`. With that layout the forward pass is a
/// vector-matrix product `y = b + x·W` that walks memory sequentially.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{rows}x{cols} matrix needs {} values, got {actual}", rows * cols)]
pub struct MatrixShapeError {
    rows: usize,
    cols: usize,
    actual: usize,
}

impl Matrix {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, MatrixShapeError> {
        if data.len() != rows * cols {
            return Err(MatrixShapeError {
                rows,
                cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix by calling `f(row, col)` for every element.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Computes `bias + x·W` into `out`.
    ///
    /// `x` must have `rows` elements and `bias` `cols` elements.
    pub fn affine_into(&self, x: &[f32], bias: &[f32], out: &mut Vec<f32>) {
        debug_assert_eq!(x.len(), self.rows);
        debug_assert_eq!(bias.len(), self.cols);
        out.clear();
        out.extend_from_slice(bias);
        for (&xi, row) in x.iter().zip(self.data.chunks_exact(self.cols)) {
            for (o, &w) in out.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
    }

    /// Computes `W·dy`, the gradient flowing back to the input of `x·W`.
    ///
    /// `dy` must have `cols` elements; `dx` receives `rows` elements.
    pub fn back_into(&self, dy: &[f32], dx: &mut Vec<f32>) {
        debug_assert_eq!(dy.len(), self.cols);
        dx.clear();
        dx.extend(
            self.data
                .chunks_exact(self.cols)
                .map(|row| row.iter().zip(dy).map(|(w, d)| w * d).sum::<f32>()),
        );
    }

    /// Accumulates the outer product `x ⊗ dy` (the weight gradient of `x·W`).
    pub fn add_outer(&mut self, x: &[f32], dy: &[f32]) {
        debug_assert_eq!(x.len(), self.rows);
        debug_assert_eq!(dy.len(), self.cols);
        for (&xi, row) in x.iter().zip(self.data.chunks_exact_mut(self.cols)) {
            for (g, &d) in row.iter_mut().zip(dy) {
                *g += xi * d;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        // [[1, 2, 3],
        //  [4, 5, 6]]
        Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap()
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = Matrix::from_vec(2, 3, vec![0.0; 5]).unwrap_err();
        assert_eq!(err.to_string(), "2x3 matrix needs 6 values, got 5");
    }

    #[test]
    fn test_affine() {
        let mut out = vec![];
        sample().affine_into(&[1.0, -1.0], &[0.5, 0.5, 0.5], &mut out);
        assert_eq!(out, [-2.5, -2.5, -2.5]);
    }

    #[test]
    fn test_non_finite_weight_reaches_output_on_zero_input() {
        let mut w = sample();
        w.as_mut_slice()[0] = f32::NAN;
        let mut out = vec![];
        w.affine_into(&[0.0, 1.0], &[0.0; 3], &mut out);
        assert!(out[0].is_nan());
        assert_eq!(out[1..], [5.0, 6.0]);

        let mut grad = Matrix::zeros(2, 3);
        grad.add_outer(&[0.0, 1.0], &[f32::INFINITY, 1.0, 1.0]);
        assert!(grad.as_slice()[0].is_nan());
    }

    #[test]
    fn test_back() {
        let mut dx = vec![];
        sample().back_into(&[1.0, 0.0, -1.0], &mut dx);
        assert_eq!(dx, [-2.0, -2.0]);
    }

    #[test]
    fn test_add_outer() {
        let mut m = Matrix::zeros(2, 3);
        m.add_outer(&[1.0, 2.0], &[1.0, 0.0, -1.0]);
        m.add_outer(&[1.0, 0.0], &[1.0, 1.0, 1.0]);
        assert_eq!(m.row(0), [2.0, 1.0, 0.0]);
        assert_eq!(m.row(1), [2.0, 0.0, -2.0]);
        assert_eq!(m.get(1, 2), -2.0);
    }

    #[test]
    fn test_from_fn_is_row_major() {
        #[expect(clippy::cast_precision_loss)]
        let m = Matrix::from_fn(2, 2, |r, c| (r * 10 + c) as f32);
        assert_eq!(m.as_slice(), [0.0, 1.0, 10.0, 11.0]);
        assert_eq!(m.shape(), (2, 2));
    }
}
