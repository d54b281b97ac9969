use std::path::Path;

use rand::Rng;

use crate::{
    NnError,
    activation::Activation,
    adam::AdamState,
    check_width,
    parallel::{self, GradientSum},
    params::{LayerParams, ParameterSet},
    persist::{self, PersistError},
    policy, stack,
};

/// Layer widths of the default behavior-cloning policy.
pub const BEHAVIOR_CLONING_LAYERS: [usize; 7] = [130, 256, 128, 64, 32, 16, 2];

/// Feed-forward network mapping one state to one raw action.
///
/// Hidden layers use ReLU and the output layer is linear. The network owns
/// its Adam moment buffers; the optimizer step counter is supplied by the
/// caller so that it can be shared across a whole training run.
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    params: ParameterSet,
    activations: Vec<Activation>,
    adam: AdamState,
    workers: usize,
}

impl DenseNetwork {
    /// Creates a network with the given layer widths (input first, output last).
    ///
    /// Weights are Xavier-uniform, biases zero.
    pub fn new<R>(layer_sizes: &[usize], rng: &mut R) -> Result<Self, NnError>
    where
        R: Rng + ?Sized,
    {
        if layer_sizes.len() < 2 {
            return Err(NnError::InvalidArchitecture {
                reason: "a dense network needs at least an input and an output width",
            });
        }
        if layer_sizes.contains(&0) {
            return Err(NnError::InvalidArchitecture {
                reason: "layer widths must be non-zero",
            });
        }
        Ok(Self::from_sizes(layer_sizes, rng))
    }

    /// Creates the default `130 → 256 → 128 → 64 → 32 → 16 → 2` policy network.
    pub fn behavior_cloning<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::from_sizes(&BEHAVIOR_CLONING_LAYERS, rng)
    }

    fn from_sizes<R>(layer_sizes: &[usize], rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let layers = layer_sizes
            .windows(2)
            .map(|w| LayerParams::xavier(w[0], w[1], rng))
            .collect::<Vec<_>>();
        let mut activations = vec![Activation::Relu; layers.len()];
        if let Some(last) = activations.last_mut() {
            *last = Activation::Linear;
        }
        let params = ParameterSet::new(layers);
        let adam = AdamState::for_parameters(&params);
        Self {
            params,
            activations,
            adam,
            workers: 1,
        }
    }

    /// Sets the number of threads gradients are accumulated on.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.set_workers(workers);
        self
    }

    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers.max(1);
    }

    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.params.layers()[0].in_dim()
    }

    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.params.layers()[self.params.layers().len() - 1].out_dim()
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    /// Replaces all parameters and resets the optimizer moments.
    pub fn set_parameters(&mut self, params: ParameterSet) -> Result<(), NnError> {
        if !params.has_same_shape(&self.params) {
            return Err(NnError::ShapeMismatch {
                expected: self.params.len(),
                actual: params.len(),
            });
        }
        self.params = params;
        self.adam = AdamState::for_parameters(&self.params);
        Ok(())
    }

    /// Computes the raw network output for one state.
    pub fn forward(&self, state: &[f32]) -> Result<Vec<f32>, NnError> {
        check_width(state, self.input_dim())?;
        Ok(stack::forward(
            self.params.layers(),
            &self.activations,
            state,
        ))
    }

    /// Computes raw outputs for many states, in input order.
    pub fn forward_batch<S>(&self, states: &[S]) -> Result<Vec<Vec<f32>>, NnError>
    where
        S: AsRef<[f32]> + Sync,
    {
        for state in states {
            check_width(state.as_ref(), self.input_dim())?;
        }
        Ok(parallel::fold_chunks(
            states.len(),
            self.workers,
            Vec::new,
            |acc, i| acc.push(stack::forward(self.params.layers(), &self.activations, states[i].as_ref())),
            |acc, part| acc.extend(part),
        ))
    }

    /// Computes the discrete `[move, energy]` action for one state.
    pub fn predict(&self, state: &[f32]) -> Result<[f32; 2], NnError> {
        let output = self.forward(state)?;
        let raw = <[f32; 2]>::try_from(output.as_slice()).map_err(|_| NnError::ShapeMismatch {
            expected: 2,
            actual: output.len(),
        })?;
        Ok(policy::discretize_action(raw))
    }

    /// Mean-squared loss of the batch and its gradient, both averaged over the batch.
    ///
    /// The per-sample loss is the mean over output values, so the output
    /// error fed into backpropagation is `2·(prediction − target) / out_dim`.
    pub fn loss_and_gradients<S, A>(
        &self,
        states: &[S],
        actions: &[A],
    ) -> Result<(f32, ParameterSet), NnError>
    where
        S: AsRef<[f32]> + Sync,
        A: AsRef<[f32]> + Sync,
    {
        self.check_batch(states, actions)?;
        let sum = parallel::fold_chunks(
            states.len(),
            self.workers,
            || GradientSum::zeros_like(&self.params),
            |acc, i| {
                acc.loss += self.accumulate_sample(states[i].as_ref(), actions[i].as_ref(), &mut acc.grads);
            },
            GradientSum::merge,
        );
        Ok(sum.into_mean(states.len()))
    }

    /// Runs one optimizer step on the batch and returns its loss.
    ///
    /// The returned loss is measured on the parameters before the update. An
    /// empty batch returns `0` and leaves the parameters untouched.
    pub fn train<S, A>(&mut self, states: &[S], actions: &[A], lr: f32, step: u64) -> Result<f32, NnError>
    where
        S: AsRef<[f32]> + Sync,
        A: AsRef<[f32]> + Sync,
    {
        self.check_batch(states, actions)?;
        if states.is_empty() {
            return Ok(0.0);
        }
        let (loss, grads) = self.loss_and_gradients(states, actions)?;
        self.adam.apply(&mut self.params, &grads, lr, step);
        if let Some(layer) = self.params.first_non_finite_layer() {
            return Err(NnError::NonFinite { layer });
        }
        Ok(loss)
    }

    /// Mean-squared loss over a dataset without touching the parameters.
    pub fn evaluate<S, A>(&self, states: &[S], actions: &[A]) -> Result<f32, NnError>
    where
        S: AsRef<[f32]> + Sync,
        A: AsRef<[f32]> + Sync,
    {
        self.check_batch(states, actions)?;
        if states.is_empty() {
            return Ok(0.0);
        }
        let total = parallel::fold_chunks(
            states.len(),
            self.workers,
            || 0.0_f32,
            |acc, i| {
                let output = stack::forward(self.params.layers(), &self.activations, states[i].as_ref());
                *acc += sample_loss(&output, actions[i].as_ref());
            },
            |acc, part| *acc += part,
        );
        #[expect(clippy::cast_precision_loss)]
        let count = states.len() as f32;
        Ok(total / count)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        persist::save(&self.params, path)
    }

    /// Loads parameters from `path`, keeping the current ones on any error.
    pub fn load(&mut self, path: &Path) -> Result<(), PersistError> {
        self.params = persist::load(&self.params, path)?;
        self.adam = AdamState::for_parameters(&self.params);
        Ok(())
    }

    fn check_batch<S, A>(&self, states: &[S], actions: &[A]) -> Result<(), NnError>
    where
        S: AsRef<[f32]>,
        A: AsRef<[f32]>,
    {
        if states.len() != actions.len() {
            return Err(NnError::BatchMismatch {
                inputs: states.len(),
                targets: actions.len(),
            });
        }
        for (state, action) in states.iter().zip(actions) {
            check_width(state.as_ref(), self.input_dim())?;
            check_width(action.as_ref(), self.output_dim())?;
        }
        Ok(())
    }

    fn accumulate_sample(&self, state: &[f32], action: &[f32], grads: &mut ParameterSet) -> f32 {
        let traces = stack::forward_traced(self.params.layers(), &self.activations, state);
        let Some(last) = traces.last() else {
            return 0.0;
        };
        let loss = sample_loss(&last.output, action);
        let output_grad = mse_gradient(&last.output, action);
        stack::backward(
            self.params.layers(),
            &self.activations,
            &traces,
            &output_grad,
            grads.layers_mut(),
        );
        loss
    }
}

/// Mean over outputs of the squared error.
#[expect(clippy::cast_precision_loss)]
pub(crate) fn sample_loss(output: &[f32], target: &[f32]) -> f32 {
    let sum = output
        .iter()
        .zip(target)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f32>();
    sum / output.len() as f32
}

/// Gradient of [`sample_loss`] with respect to `output`.
#[expect(clippy::cast_precision_loss)]
pub(crate) fn mse_gradient(output: &[f32], target: &[f32]) -> Vec<f32> {
    let scale = 2.0 / output.len() as f32;
    output.iter().zip(target).map(|(p, t)| scale * (p - t)).collect()
}
