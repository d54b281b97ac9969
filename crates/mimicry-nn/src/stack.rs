//! Forward and backward passes over an ordered list of dense layers.
//!
//! Both networks describe their feed-forward part as parallel slices of
//! [`LayerParams`] and [`Activation`]s; depth is data, not code.

use crate::{activation::Activation, params::LayerParams};

/// Values cached by a traced forward pass for one layer.
#[derive(Debug, Clone)]
pub(crate) struct LayerTrace {
    pub(crate) input: Vec<f32>,
    pub(crate) pre: Vec<f32>,
    pub(crate) output: Vec<f32>,
}

/// Runs the layers without caching intermediate values.
pub(crate) fn forward(layers: &[LayerParams], activations: &[Activation], input: &[f32]) -> Vec<f32> {
    debug_assert_eq!(layers.len(), activations.len());
    let mut current = input.to_vec();
    let mut pre = Vec::new();
    for (layer, &activation) in layers.iter().zip(activations) {
        layer.weights.affine_into(&current, &layer.bias, &mut pre);
        current.clear();
        current.extend(pre.iter().map(|&x| activation.apply(x)));
    }
    current
}

/// Runs the layers, keeping every layer's input, pre-activation and output.
pub(crate) fn forward_traced(
    layers: &[LayerParams],
    activations: &[Activation],
    input: &[f32],
) -> Vec<LayerTrace> {
    debug_assert_eq!(layers.len(), activations.len());
    let mut traces: Vec<LayerTrace> = Vec::with_capacity(layers.len());
    for (layer, &activation) in layers.iter().zip(activations) {
        let input = traces
            .last()
            .map_or_else(|| input.to_vec(), |t| t.output.clone());
        let mut pre = Vec::with_capacity(layer.out_dim());
        layer.weights.affine_into(&input, &layer.bias, &mut pre);
        let output = pre.iter().map(|&x| activation.apply(x)).collect();
        traces.push(LayerTrace { input, pre, output });
    }
    traces
}

/// Back-propagates `output_grad` (the loss gradient with respect to the last
/// layer's activated output) and accumulates weight and bias gradients.
///
/// Returns the gradient with respect to the stack's input.
pub(crate) fn backward(
    layers: &[LayerParams],
    activations: &[Activation],
    traces: &[LayerTrace],
    output_grad: &[f32],
    grads: &mut [LayerParams],
) -> Vec<f32> {
    let mut upstream = output_grad.to_vec();
    let mut delta = Vec::new();
    for (((layer, &activation), trace), grad) in layers
        .iter()
        .zip(activations)
        .zip(traces)
        .zip(grads.iter_mut())
        .rev()
    {
        delta.clear();
        delta.extend(
            upstream
                .iter()
                .zip(trace.pre.iter().zip(&trace.output))
                .map(|(&g, (&pre, &out))| g * activation.derivative(pre, out)),
        );
        grad.weights.add_outer(&trace.input, &delta);
        for (b, d) in grad.bias.iter_mut().zip(&delta) {
            *b += d;
        }
        layer.weights.back_into(&delta, &mut upstream);
    }
    upstream
}
