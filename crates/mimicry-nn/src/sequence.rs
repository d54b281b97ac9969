use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    NnError,
    activation::Activation,
    adam::AdamState,
    check_width,
    dense::{mse_gradient, sample_loss},
    lstm,
    parallel::{self, GradientSum},
    params::{LayerParams, ParameterSet},
    persist::{self, PersistError},
    policy, stack,
};

/// Activations of the dense head: hidden ReLU, then `tanh` on the output.
const HEAD_ACTIVATIONS: [Activation; 2] = [Activation::Relu, Activation::Tanh];

/// Layer widths of a [`SequenceNetwork`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceArchitecture {
    pub input: usize,
    pub hidden1: usize,
    pub hidden2: usize,
    pub dense_hidden: usize,
    pub output: usize,
}

impl Default for SequenceArchitecture {
    fn default() -> Self {
        Self {
            input: 130,
            hidden1: 256,
            hidden2: 128,
            dense_hidden: 64,
            output: 2,
        }
    }
}

/// One input sequence: a series of equally wide steps, oldest first.
pub trait SequenceInput: Sync {
    fn len(&self) -> usize;

    fn step(&self, index: usize) -> &[f32];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> SequenceInput for Vec<S>
where
    S: AsRef<[f32]> + Sync,
{
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn step(&self, index: usize) -> &[f32] {
        self[index].as_ref()
    }
}

impl<S> SequenceInput for &[S]
where
    S: AsRef<[f32]> + Sync,
{
    fn len(&self) -> usize {
        <[S]>::len(self)
    }

    fn step(&self, index: usize) -> &[f32] {
        self[index].as_ref()
    }
}

/// Recurrent network over fixed-length windows of frames.
///
/// Two stacked LSTM layers read the window one step at a time; the last
/// hidden state of the second layer feeds a dense head
/// (`hidden2 → dense_hidden`, ReLU) and a `tanh`-squashed output layer.
/// Parameters are ordered `[lstm1, lstm2, dense_hidden, output]`.
///
/// Training back-propagates through time across both recurrent layers.
#[derive(Debug, Clone)]
pub struct SequenceNetwork {
    architecture: SequenceArchitecture,
    params: ParameterSet,
    adam: AdamState,
    workers: usize,
}

impl SequenceNetwork {
    pub fn new<R>(architecture: SequenceArchitecture, rng: &mut R) -> Result<Self, NnError>
    where
        R: Rng + ?Sized,
    {
        let a = &architecture;
        if [a.input, a.hidden1, a.hidden2, a.dense_hidden, a.output].contains(&0) {
            return Err(NnError::InvalidArchitecture {
                reason: "layer widths must be non-zero",
            });
        }
        let layers = vec![
            LayerParams::xavier(a.input + a.hidden1, 4 * a.hidden1, rng),
            LayerParams::xavier(a.hidden1 + a.hidden2, 4 * a.hidden2, rng),
            LayerParams::xavier(a.hidden2, a.dense_hidden, rng),
            LayerParams::xavier(a.dense_hidden, a.output, rng),
        ];
        let params = ParameterSet::new(layers);
        let adam = AdamState::for_parameters(&params);
        Ok(Self {
            architecture,
            params,
            adam,
            workers: 1,
        })
    }

    /// Creates the default `130 → LSTM 256 → LSTM 128 → 64 → 2` network.
    pub fn behavior_cloning<R>(rng: &mut R) -> Result<Self, NnError>
    where
        R: Rng + ?Sized,
    {
        Self::new(SequenceArchitecture::default(), rng)
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.set_workers(workers);
        self
    }

    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers.max(1);
    }

    #[must_use]
    pub fn architecture(&self) -> &SequenceArchitecture {
        &self.architecture
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

    /// Computes the raw (`tanh`-squashed) output for one sequence.
    pub fn forward<I>(&self, input: &I) -> Result<Vec<f32>, NnError>
    where
        I: SequenceInput + ?Sized,
    {
        self.check_input(input)?;
        Ok(self.forward_unchecked(input))
    }

    fn forward_unchecked<I>(&self, input: &I) -> Vec<f32>
    where
        I: SequenceInput + ?Sized,
    {
        let steps = collect_steps(input);
        let layers = self.params.layers();
        let h1 = lstm::forward(&layers[0], self.architecture.hidden1, &steps);
        let h2 = lstm::forward(&layers[1], self.architecture.hidden2, &h1);
        let last = h2.last().map_or(&[][..], Vec::as_slice);
        stack::forward(&layers[2..], &HEAD_ACTIVATIONS, last)
    }

    /// Computes raw outputs for many sequences, in input order.
    pub fn forward_batch<I>(&self, inputs: &[I]) -> Result<Vec<Vec<f32>>, NnError>
    where
        I: SequenceInput,
    {
        for input in inputs {
            self.check_input(input)?;
        }
        Ok(parallel::fold_chunks(
            inputs.len(),
            self.workers,
            Vec::new,
            |acc, i| acc.push(self.forward_unchecked(&inputs[i])),
            |acc, part| acc.extend(part),
        ))
    }

    /// Computes the discrete `[move, energy]` action for one sequence.
    pub fn predict<I>(&self, input: &I) -> Result<[f32; 2], NnError>
    where
        I: SequenceInput + ?Sized,
    {
        let output = self.forward(input)?;
        let raw = <[f32; 2]>::try_from(output.as_slice()).map_err(|_| NnError::ShapeMismatch {
            expected: 2,
            actual: output.len(),
        })?;
        Ok(policy::discretize_action(raw))
    }

    /// Mean-squared loss of the batch and its gradient, both averaged over the batch.
    pub fn loss_and_gradients<I, T>(
        &self,
        inputs: &[I],
        targets: &[T],
    ) -> Result<(f32, ParameterSet), NnError>
    where
        I: SequenceInput,
        T: AsRef<[f32]> + Sync,
    {
        self.check_batch(inputs, targets)?;
        let sum = parallel::fold_chunks(
            inputs.len(),
            self.workers,
            || GradientSum::zeros_like(&self.params),
            |acc, i| {
                acc.loss += self.accumulate_sample(&inputs[i], targets[i].as_ref(), &mut acc.grads);
            },
            GradientSum::merge,
        );
        Ok(sum.into_mean(inputs.len()))
    }

    /// Runs one optimizer step on the batch and returns its loss (before the update).
    ///
    /// An empty batch returns `0` and leaves the parameters untouched.
    pub fn train<I, T>(&mut self, inputs: &[I], targets: &[T], lr: f32, step: u64) -> Result<f32, NnError>
    where
        I: SequenceInput,
        T: AsRef<[f32]> + Sync,
    {
        self.check_batch(inputs, targets)?;
        if inputs.is_empty() {
            return Ok(0.0);
        }
        let (loss, grads) = self.loss_and_gradients(inputs, targets)?;
        self.adam.apply(&mut self.params, &grads, lr, step);
        if let Some(layer) = self.params.first_non_finite_layer() {
            return Err(NnError::NonFinite { layer });
        }
        Ok(loss)
    }

    /// Mean-squared loss over a set of sequences without touching the parameters.
    pub fn evaluate<I, T>(&self, inputs: &[I], targets: &[T]) -> Result<f32, NnError>
    where
        I: SequenceInput,
        T: AsRef<[f32]> + Sync,
    {
        self.check_batch(inputs, targets)?;
        if inputs.is_empty() {
            return Ok(0.0);
        }
        let total = parallel::fold_chunks(
            inputs.len(),
            self.workers,
            || 0.0_f32,
            |acc, i| *acc += sample_loss(&self.forward_unchecked(&inputs[i]), targets[i].as_ref()),
            |acc, part| *acc += part,
        );
        #[expect(clippy::cast_precision_loss)]
        let count = inputs.len() as f32;
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

    fn check_input<I>(&self, input: &I) -> Result<(), NnError>
    where
        I: SequenceInput + ?Sized,
    {
        if input.is_empty() {
            return Err(NnError::EmptySequence);
        }
        for index in 0..input.len() {
            check_width(input.step(index), self.architecture.input)?;
        }
        Ok(())
    }

    fn check_batch<I, T>(&self, inputs: &[I], targets: &[T]) -> Result<(), NnError>
    where
        I: SequenceInput,
        T: AsRef<[f32]>,
    {
        if inputs.len() != targets.len() {
            return Err(NnError::BatchMismatch {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }
        for (input, target) in inputs.iter().zip(targets) {
            self.check_input(input)?;
            check_width(target.as_ref(), self.architecture.output)?;
        }
        Ok(())
    }

    fn accumulate_sample<I>(&self, input: &I, target: &[f32], grads: &mut ParameterSet) -> f32
    where
        I: SequenceInput + ?Sized,
    {
        let SequenceArchitecture {
            hidden1, hidden2, ..
        } = self.architecture;
        let layers = self.params.layers();
        let steps = collect_steps(input);

        let trace1 = lstm::forward_traced(&layers[0], hidden1, &steps);
        let trace2 = lstm::forward_traced(&layers[1], hidden2, &trace1.outputs);
        let Some(last) = trace2.outputs.last() else {
            return 0.0;
        };
        let head = stack::forward_traced(&layers[2..], &HEAD_ACTIVATIONS, last);
        let Some(output) = head.last().map(|t| &t.output) else {
            return 0.0;
        };
        let loss = sample_loss(output, target);
        let output_grad = mse_gradient(output, target);

        let (recurrent_grads, head_grads) = grads.layers_mut().split_at_mut(2);
        let dh_last = stack::backward(
            &layers[2..],
            &HEAD_ACTIVATIONS,
            &head,
            &output_grad,
            head_grads,
        );
        let mut dh2 = vec![vec![0.0; hidden2]; steps.len()];
        if let Some(slot) = dh2.last_mut() {
            *slot = dh_last;
        }
        let dh1 = lstm::backward(&layers[1], hidden2, &trace2, &dh2, &mut recurrent_grads[1]);
        lstm::backward(&layers[0], hidden1, &trace1, &dh1, &mut recurrent_grads[0]);
        loss
    }
}

fn collect_steps<I>(input: &I) -> Vec<&[f32]>
where
    I: SequenceInput + ?Sized,
{
    (0..input.len()).map(|index| input.step(index)).collect()
}
