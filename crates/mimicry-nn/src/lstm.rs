//! Single LSTM layer over a sequence, forward and backward through time.
//!
//! The layer's weights are `[(input + hidden) × 4·hidden]` over the
//! concatenation `z = [x_t, h_{t−1}]`, with gate columns laid out as
//! `[input | forget | output | candidate]`:
//!
//! ```text
//! i = σ(a_i)   f = σ(a_f)   o = σ(a_o)   g = tanh(a_g)
//! c_t = f ⊙ c_{t−1} + i ⊙ g
//! h_t = o ⊙ tanh(c_t)
//! ```
//!
//! Hidden and cell state start at zero for every sequence.

use crate::{activation::sigmoid, params::LayerParams};

/// Values of one timestep needed by the backward pass.
#[derive(Debug, Clone)]
struct StepCache {
    z: Vec<f32>,
    /// Activated gates `[i | f | o | g]`.
    gates: Vec<f32>,
    c_prev: Vec<f32>,
    tanh_c: Vec<f32>,
}

/// Cached forward pass of one layer over one sequence.
#[derive(Debug, Clone)]
pub(crate) struct LstmTrace {
    steps: Vec<StepCache>,
    /// Hidden state after every step.
    pub(crate) outputs: Vec<Vec<f32>>,
}

struct State {
    h: Vec<f32>,
    c: Vec<f32>,
}

impl State {
    fn zeros(hidden: usize) -> Self {
        Self {
            h: vec![0.0; hidden],
            c: vec![0.0; hidden],
        }
    }
}

/// Advances the layer by one timestep, returning the new state and the step cache.
fn advance(
    layer: &LayerParams,
    hidden: usize,
    x: &[f32],
    prev: &State,
    pre: &mut Vec<f32>,
) -> (State, StepCache) {
    let mut z = Vec::with_capacity(x.len() + hidden);
    z.extend_from_slice(x);
    z.extend_from_slice(&prev.h);
    layer.weights.affine_into(&z, &layer.bias, pre);

    let mut gates = vec![0.0; 4 * hidden];
    let mut next = State::zeros(hidden);
    let mut tanh_c = vec![0.0; hidden];
    for j in 0..hidden {
        let i = sigmoid(pre[j]);
        let f = sigmoid(pre[hidden + j]);
        let o = sigmoid(pre[2 * hidden + j]);
        let g = pre[3 * hidden + j].tanh();
        gates[j] = i;
        gates[hidden + j] = f;
        gates[2 * hidden + j] = o;
        gates[3 * hidden + j] = g;
        next.c[j] = f * prev.c[j] + i * g;
        tanh_c[j] = next.c[j].tanh();
        next.h[j] = o * tanh_c[j];
    }
    let cache = StepCache {
        z,
        gates,
        c_prev: prev.c.clone(),
        tanh_c,
    };
    (next, cache)
}

/// Runs the layer over `inputs` and returns the hidden state after every step.
pub(crate) fn forward<S>(layer: &LayerParams, hidden: usize, inputs: &[S]) -> Vec<Vec<f32>>
where
    S: AsRef<[f32]>,
{
    let mut state = State::zeros(hidden);
    let mut pre = Vec::with_capacity(4 * hidden);
    let mut outputs = Vec::with_capacity(inputs.len());
    for x in inputs {
        let (next, _) = advance(layer, hidden, x.as_ref(), &state, &mut pre);
        outputs.push(next.h.clone());
        state = next;
    }
    outputs
}

/// Runs the layer over `inputs`, caching what [`backward`] needs.
pub(crate) fn forward_traced<S>(layer: &LayerParams, hidden: usize, inputs: &[S]) -> LstmTrace
where
    S: AsRef<[f32]>,
{
    let mut state = State::zeros(hidden);
    let mut pre = Vec::with_capacity(4 * hidden);
    let mut steps = Vec::with_capacity(inputs.len());
    let mut outputs = Vec::with_capacity(inputs.len());
    for x in inputs {
        let (next, cache) = advance(layer, hidden, x.as_ref(), &state, &mut pre);
        steps.push(cache);
        outputs.push(next.h.clone());
        state = next;
    }
    LstmTrace { steps, outputs }
}

/// Back-propagates through every timestep of `trace`.
///
/// `dh_out[t]` is the loss gradient with respect to the hidden state emitted
/// at step `t` by this layer (from the layer above or the head). Weight and
/// bias gradients are accumulated into `grad`; the gradient with respect to
/// each step's input is returned.
pub(crate) fn backward(
    layer: &LayerParams,
    hidden: usize,
    trace: &LstmTrace,
    dh_out: &[Vec<f32>],
    grad: &mut LayerParams,
) -> Vec<Vec<f32>> {
    debug_assert_eq!(dh_out.len(), trace.steps.len());
    let input = layer.in_dim() - hidden;
    let mut dh_next = vec![0.0; hidden];
    let mut dc_next = vec![0.0; hidden];
    let mut da = vec![0.0; 4 * hidden];
    let mut dz = Vec::with_capacity(layer.in_dim());
    let mut dxs = vec![Vec::new(); trace.steps.len()];

    for (t, cache) in trace.steps.iter().enumerate().rev() {
        let gates = &cache.gates;
        for j in 0..hidden {
            let i = gates[j];
            let f = gates[hidden + j];
            let o = gates[2 * hidden + j];
            let g = gates[3 * hidden + j];
            let tanh_c = cache.tanh_c[j];

            let dh = dh_out[t][j] + dh_next[j];
            let dc = dh * o * (1.0 - tanh_c * tanh_c) + dc_next[j];
            da[j] = dc * g * i * (1.0 - i);
            da[hidden + j] = dc * cache.c_prev[j] * f * (1.0 - f);
            da[2 * hidden + j] = dh * tanh_c * o * (1.0 - o);
            da[3 * hidden + j] = dc * i * (1.0 - g * g);
            dc_next[j] = dc * f;
        }

        grad.weights.add_outer(&cache.z, &da);
        for (b, d) in grad.bias.iter_mut().zip(&da) {
            *b += d;
        }
        layer.weights.back_into(&da, &mut dz);
        dxs[t] = dz[..input].to_vec();
        dh_next.copy_from_slice(&dz[input..]);
    }
    dxs
}
