//! Adam optimizer
//!
//! Per-element update with bias-corrected moment estimates:
//!
//! ```text
//! m  = β1·m + (1 − β1)·g
//! v  = β2·v + (1 − β2)·g²
//! m̂  = m / (1 − β1^(step+1))
//! v̂  = v / (1 − β2^(step+1))
//! p -= lr · m̂ / (√v̂ + ε)
//! ```
//!
//! `step` is the zero-based index of the optimizer step within a training
//! run. It is shared by every buffer of a network so bias correction stays
//! consistent across layers. Moment buffers live only in memory: loading a
//! model starts Adam from zero moments.

use crate::params::ParameterSet;

pub const BETA1: f32 = 0.9;
pub const BETA2: f32 = 0.999;
pub const EPSILON: f32 = 1e-8;

/// First and second moment estimates of one flat parameter buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    pub m: Vec<f32>,
    pub v: Vec<f32>,
}

impl Moments {
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
        }
    }
}

/// Applies one Adam step to `params`.
///
/// # Examples
///
/// ```
/// use mimicry_nn::adam::{self, Moments};
///
/// let mut param = [1.0];
/// let mut moments = Moments::zeros(1);
/// adam::update(&mut param, &[1.0], &mut moments, 0.1, 0);
/// assert!((param[0] - 0.9).abs() < 1e-6);
/// ```
pub fn update(params: &mut [f32], grads: &[f32], moments: &mut Moments, lr: f32, step: u64) {
    debug_assert_eq!(params.len(), grads.len());
    debug_assert_eq!(params.len(), moments.m.len());
    let exponent = i32::try_from(step.saturating_add(1)).unwrap_or(i32::MAX);
    let correction1 = 1.0 - BETA1.powi(exponent);
    let correction2 = 1.0 - BETA2.powi(exponent);
    let iter = params
        .iter_mut()
        .zip(grads)
        .zip(moments.m.iter_mut().zip(&mut moments.v));
    for ((p, &g), (m, v)) in iter {
        *m = BETA1 * *m + (1.0 - BETA1) * g;
        *v = BETA2 * *v + (1.0 - BETA2) * g * g;
        let m_hat = *m / correction1;
        let v_hat = *v / correction2;
        *p -= lr * m_hat / (v_hat.sqrt() + EPSILON);
    }
}

/// Moment buffers for every weight matrix and bias vector of a [`ParameterSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdamState {
    layers: Vec<(Moments, Moments)>,
}

impl AdamState {
    #[must_use]
    pub fn for_parameters(params: &ParameterSet) -> Self {
        let layers = params
            .layers()
            .iter()
            .map(|l| {
                (
                    Moments::zeros(l.weights.as_slice().len()),
                    Moments::zeros(l.bias.len()),
                )
            })
            .collect();
        Self { layers }
    }

    /// Updates every buffer of `params` from the matching buffer of `grads`.
    pub fn apply(&mut self, params: &mut ParameterSet, grads: &ParameterSet, lr: f32, step: u64) {
        let layers = params
            .layers_mut()
            .iter_mut()
            .zip(grads.layers())
            .zip(&mut self.layers);
        for ((layer, grad), (weight_moments, bias_moments)) in layers {
            update(
                layer.weights.as_mut_slice(),
                grad.weights.as_slice(),
                weight_moments,
                lr,
                step,
            );
            update(&mut layer.bias, &grad.bias, bias_moments, lr, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::LayerParams;

    #[test]
    fn test_first_step_closed_form() {
        let mut param = [0.3];
        let mut moments = Moments::zeros(1);
        update(&mut param, &[1.0], &mut moments, 0.1, 0);
        let expected = 0.3 - 0.1 * 1.0 / (1.0 + EPSILON);
        assert!((param[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_step_size_is_bounded_by_lr() {
        // with a constant gradient the bias-corrected ratio stays at 1
        let mut param = [0.0];
        let mut moments = Moments::zeros(1);
        for step in 0..10 {
            let before = param[0];
            update(&mut param, &[-5.0], &mut moments, 0.01, step);
            assert!((param[0] - before - 0.01).abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_gradient_leaves_param() {
        let mut param = [2.0, -1.0];
        let mut moments = Moments::zeros(2);
        update(&mut param, &[0.0, 0.0], &mut moments, 0.1, 0);
        assert_eq!(param, [2.0, -1.0]);
    }

    #[test]
    fn test_apply_touches_weights_and_biases() {
        let mut params = ParameterSet::new(vec![LayerParams::zeros(2, 1)]);
        let mut grads = params.zeros_like();
        grads.layers_mut()[0].weights.as_mut_slice()[1] = 1.0;
        grads.layers_mut()[0].bias[0] = -1.0;
        let mut state = AdamState::for_parameters(&params);
        state.apply(&mut params, &grads, 0.1, 0);

        let layer = &params.layers()[0];
        assert_eq!(layer.weights.as_slice()[0], 0.0);
        assert!((layer.weights.as_slice()[1] + 0.1).abs() < 1e-6);
        assert!((layer.bias[0] - 0.1).abs() < 1e-6);
    }
}
