use rand::Rng;

use crate::matrix::Matrix;

/// Weights and bias of one layer.
///
/// Dense layers hold `[in_dim × out_dim]` weights. Recurrent layers use the
/// same shape over the concatenated `[input, previous hidden]` vector, with
/// the four gates laid out side by side in the columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerParams {
    pub weights: Matrix,
    pub bias: Vec<f32>,
}

impl LayerParams {
    #[must_use]
    pub fn zeros(in_dim: usize, out_dim: usize) -> Self {
        Self {
            weights: Matrix::zeros(in_dim, out_dim),
            bias: vec![0.0; out_dim],
        }
    }

    /// Xavier-uniform weights in `±√(6 / (in_dim + out_dim))`, zero bias.
    #[expect(clippy::cast_precision_loss)]
    pub fn xavier<R>(in_dim: usize, out_dim: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        let weights = Matrix::from_fn(in_dim, out_dim, |_, _| rng.random_range(-limit..limit));
        Self {
            weights,
            bias: vec![0.0; out_dim],
        }
    }

    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.weights.rows()
    }

    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.weights.cols()
    }

    fn is_finite(&self) -> bool {
        self.weights.as_slice().iter().all(|v| v.is_finite())
            && self.bias.iter().all(|v| v.is_finite())
    }
}

/// Ordered parameters of every layer of a network.
///
/// Gradients use the same type: [`ParameterSet::zeros_like`] creates a
/// buffer of matching shape that backward passes accumulate into.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    layers: Vec<LayerParams>,
}

impl ParameterSet {
    #[must_use]
    pub fn new(layers: Vec<LayerParams>) -> Self {
        Self { layers }
    }

    #[must_use]
    pub fn zeros_like(&self) -> Self {
        let layers = self
            .layers
            .iter()
            .map(|l| LayerParams::zeros(l.in_dim(), l.out_dim()))
            .collect();
        Self { layers }
    }

    #[must_use]
    pub fn layers(&self) -> &[LayerParams] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [LayerParams] {
        &mut self.layers
    }

    /// `(in_dim, out_dim)` of every layer.
    #[must_use]
    pub fn shapes(&self) -> Vec<(usize, usize)> {
        self.layers.iter().map(|l| l.weights.shape()).collect()
    }

    #[must_use]
    pub fn has_same_shape(&self, other: &Self) -> bool {
        self.shapes() == other.shapes()
    }

    /// Total number of scalar parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.as_slice().len() + l.bias.len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `other` element-wise. Both sets must have the same shape.
    pub fn add_assign(&mut self, other: &Self) {
        debug_assert!(self.has_same_shape(other));
        for (dst, src) in self.layers.iter_mut().zip(&other.layers) {
            add_slice(dst.weights.as_mut_slice(), src.weights.as_slice());
            add_slice(&mut dst.bias, &src.bias);
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for layer in &mut self.layers {
            layer.weights.as_mut_slice().iter_mut().for_each(|v| *v *= factor);
            layer.bias.iter_mut().for_each(|v| *v *= factor);
        }
    }

    /// Index of the first layer holding a NaN or infinite value.
    #[must_use]
    pub fn first_non_finite_layer(&self) -> Option<usize> {
        self.layers.iter().position(|l| !l.is_finite())
    }
}

fn add_slice(dst: &mut [f32], src: &[f32]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}
