use serde::{Deserialize, Serialize};

/// Element-wise activation applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Linear,
    Tanh,
}

impl Activation {
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Linear => x,
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative at pre-activation `pre`, given the activated value `out`.
    #[must_use]
    pub fn derivative(self, pre: f32, out: f32) -> f32 {
        match self {
            Activation::Relu => {
                if pre > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Linear => 1.0,
            Activation::Tanh => 1.0 - out * out,
        }
    }
}

#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_mask_excludes_zero() {
        assert_eq!(Activation::Relu.apply(-1.0), 0.0);
        assert_eq!(Activation::Relu.derivative(0.0, 0.0), 0.0);
        assert_eq!(Activation::Relu.derivative(0.1, 0.1), 1.0);
    }

    #[test]
    fn test_tanh_derivative_uses_output() {
        let out = Activation::Tanh.apply(0.5);
        let expected = 1.0 / 0.5_f32.cosh().powi(2);
        assert!((Activation::Tanh.derivative(0.5, out) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(20.0) > 0.999_99);
        assert!(sigmoid(-20.0) < 1e-5);
    }
}
