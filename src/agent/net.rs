// Copyright 2026 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

//! The afterstate value function.
//!
//! [`ValueNet`] is the contract the learning loop needs from a
//! regressor; [`Mlp`] is the fully-connected implementation behind it.
//! The one unusual operation is [`ValueNet::calc_gradient_and_value`]:
//! it scales the caller's gradient container before accumulating the new
//! gradient into it, which is exactly the eligibility-trace recurrence
//! z ← ∇V + λγ·z in a single pass.

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use super::converter::StateConverter;

/// Cost functions of the gradient pass. `Linear` treats the raw output
/// as the cost (derivative one), which turns the gradient pass into a
/// plain ∇V — the form the TD(λ) trace consumes. `HalfSquare` is the
/// usual ½(out − target)² regression cost.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Cost {
    Linear,
    HalfSquare,
}

impl Cost {
    #[inline]
    fn derivative(self, out: f64, target: f64) -> f64 {
        match self {
            Self::Linear => 1.0,
            Self::HalfSquare => out - target,
        }
    }
}

/// Gradient of one layer, shaped like the layer's parameters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LayerGradient {
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

impl LayerGradient {
    fn scale(&mut self, factor: f64) {
        for w in &mut self.weights {
            *w *= factor;
        }
        for b in &mut self.biases {
            *b *= factor;
        }
    }
}

/// Reusable forward-pass scratch: the post-activation output of every
/// layer, with the input in front.
#[derive(Debug, Clone, Default)]
pub struct NetContext {
    activations: Vec<Vec<f64>>,
}

impl NetContext {
    /// Scalar output of the latest forward pass.
    fn out(&self) -> f64 {
        self.activations.last().expect("no forward pass was run")[0]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Relu,
    Linear,
}

impl Activation {
    #[inline]
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Relu => x.max(0.0),
            Self::Linear => x,
        }
    }

    /// Derivative expressed through the post-activation output (enough
    /// for both supported functions).
    #[inline]
    fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Self::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Linear => 1.0,
        }
    }
}

/// One fully-connected layer: row-major `out_dim x in_dim` weights.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct Layer {
    in_dim: usize,
    out_dim: usize,
    weights: Vec<f64>,
    biases: Vec<f64>,
    activation: Activation,
}

impl Layer {
    fn new(in_dim: usize, out_dim: usize, activation: Activation) -> Self {
        // Xavier-style uniform initialization.
        let mut rng = thread_rng();
        let bound = (6.0 / (in_dim + out_dim) as f64).sqrt();
        Self {
            in_dim,
            out_dim,
            weights: (0..in_dim * out_dim)
                .map(|_| rng.gen_range(-bound..bound))
                .collect(),
            biases: vec![0.0; out_dim],
            activation,
        }
    }

    fn forward(&self, input: &[f64], output: &mut Vec<f64>) {
        debug_assert_eq!(input.len(), self.in_dim);
        output.clear();
        output.reserve(self.out_dim);
        for row in 0..self.out_dim {
            let row_weights = &self.weights[row * self.in_dim..(row + 1) * self.in_dim];
            let sum: f64 = row_weights
                .iter()
                .zip(input)
                .map(|(w, x)| w * x)
                .sum::<f64>()
                + self.biases[row];
            output.push(self.activation.apply(sum));
        }
    }
}

/// A feed-forward regressor: ReLU hidden layers and a single linear
/// output. Weights are `f64` so serialized agents reproduce bit for bit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Layer>,
}

impl Mlp {
    /// Builds a net with the given layer dimensions (input first). The
    /// output dimension must be one: the net predicts a scalar value.
    pub fn new(layer_dimensions: &[usize]) -> Self {
        assert!(
            layer_dimensions.len() >= 2 && *layer_dimensions.last().unwrap() == 1,
            "invalid net configuration"
        );

        let mut layers = Vec::with_capacity(layer_dimensions.len() - 1);
        for layer_id in 0..layer_dimensions.len() - 1 {
            let activation = if layer_id + 2 == layer_dimensions.len() {
                Activation::Linear
            } else {
                Activation::Relu
            };
            layers.push(Layer::new(
                layer_dimensions[layer_id],
                layer_dimensions[layer_id + 1],
                activation,
            ));
        }

        Self { layers }
    }

    /// Layer dimensions, input first.
    pub fn dimensions(&self) -> Vec<usize> {
        let mut result = vec![self.layers[0].in_dim];
        result.extend(self.layers.iter().map(|layer| layer.out_dim));
        result
    }

    #[inline]
    pub fn in_size(&self) -> usize {
        self.layers[0].in_dim
    }

    /// Forward pass; the context keeps every layer output for a
    /// subsequent gradient pass.
    pub fn act(&self, input: &[f64], context: &mut NetContext) -> f64 {
        context.activations.resize(self.layers.len() + 1, Vec::new());
        context.activations[0].clear();
        context.activations[0].extend_from_slice(input);

        for (layer_id, layer) in self.layers.iter().enumerate() {
            let (front, back) = context.activations.split_at_mut(layer_id + 1);
            layer.forward(&front[layer_id], &mut back[0]);
        }

        context.out()
    }

    /// Scales `out_gradient` by `gradient_scale_factor`, adds the
    /// gradient of `cost` at `input`, and reports the forward value in
    /// `out_value`. A misshapen gradient container is (re)allocated to
    /// zeros first.
    pub fn calc_gradient_and_value(
        &self,
        input: &[f64],
        target: &[f64],
        cost: Cost,
        out_gradient: &mut Vec<LayerGradient>,
        out_value: &mut Vec<f64>,
        gradient_scale_factor: f64,
        context: &mut NetContext,
    ) {
        if !self.is_allocated(out_gradient) {
            self.allocate(out_gradient, true);
        }

        let out = self.act(input, context);
        out_value.clear();
        out_value.push(out);

        for gradient in out_gradient.iter_mut() {
            gradient.scale(gradient_scale_factor);
        }

        let target_value = target.first().copied().unwrap_or(0.0);

        // Output-layer delta, then walk the layers backwards.
        let last = self.layers.len() - 1;
        let mut delta =
            vec![cost.derivative(out, target_value)
                * self.layers[last].activation.derivative_from_output(out)];

        for layer_id in (0..self.layers.len()).rev() {
            let layer = &self.layers[layer_id];
            let layer_input = &context.activations[layer_id];
            let gradient = &mut out_gradient[layer_id];

            for row in 0..layer.out_dim {
                let d = delta[row];
                gradient.biases[row] += d;
                let grad_row = &mut gradient.weights[row * layer.in_dim..(row + 1) * layer.in_dim];
                for (g, x) in grad_row.iter_mut().zip(layer_input) {
                    *g += d * x;
                }
            }

            if layer_id == 0 {
                break;
            }

            // delta for the previous layer: (W^T delta) * act'(input).
            let mut prev_delta = vec![0.0; layer.in_dim];
            for row in 0..layer.out_dim {
                let d = delta[row];
                let row_weights = &layer.weights[row * layer.in_dim..(row + 1) * layer.in_dim];
                for (pd, w) in prev_delta.iter_mut().zip(row_weights) {
                    *pd += d * w;
                }
            }
            let prev_activation = self.layers[layer_id - 1].activation;
            for (pd, y) in prev_delta.iter_mut().zip(layer_input) {
                *pd *= prev_activation.derivative_from_output(*y);
            }
            delta = prev_delta;
        }
    }

    /// In-place SGD step: W ← W(1 − lr·l2) − lr·g.
    pub fn update(&mut self, gradient: &[LayerGradient], learning_rate: f64, l2_coeff: f64) {
        assert!(self.is_allocated(gradient), "gradient shape mismatch");

        let decay = 1.0 - learning_rate * l2_coeff;
        for (layer, layer_gradient) in self.layers.iter_mut().zip(gradient) {
            for (w, g) in layer.weights.iter_mut().zip(&layer_gradient.weights) {
                *w = *w * decay - learning_rate * g;
            }
            for (b, g) in layer.biases.iter_mut().zip(&layer_gradient.biases) {
                *b = *b * decay - learning_rate * g;
            }
        }
    }

    /// Shapes `gradient` to match the net's parameters.
    pub fn allocate(&self, gradient: &mut Vec<LayerGradient>, assign_zero: bool) {
        if !self.is_allocated(gradient) {
            gradient.clear();
            gradient.extend(self.layers.iter().map(|layer| LayerGradient {
                weights: vec![0.0; layer.weights.len()],
                biases: vec![0.0; layer.biases.len()],
            }));
            return;
        }

        if assign_zero {
            for layer_gradient in gradient.iter_mut() {
                layer_gradient.weights.fill(0.0);
                layer_gradient.biases.fill(0.0);
            }
        }
    }

    fn is_allocated(&self, gradient: &[LayerGradient]) -> bool {
        gradient.len() == self.layers.len()
            && gradient.iter().zip(&self.layers).all(|(g, layer)| {
                g.weights.len() == layer.weights.len() && g.biases.len() == layer.biases.len()
            })
    }
}

/// The network surface the TD(λ) sub-agent drives.
pub trait ValueNet {
    /// See [`Mlp::calc_gradient_and_value`]; the input is already a
    /// network tensor.
    #[allow(clippy::too_many_arguments)]
    fn calc_gradient_and_value(
        &self,
        input: &[f64],
        target: &[f64],
        cost: Cost,
        out_gradient: &mut Vec<LayerGradient>,
        out_value: &mut Vec<f64>,
        gradient_scale_factor: f64,
        context: &mut NetContext,
    );

    /// Converts an int-vector state into its tensor rendition (left in
    /// `out_state_converted`) and returns the net's value at it.
    fn evaluate(
        &self,
        state: &[i32],
        out_state_converted: &mut Vec<f64>,
        context: &mut NetContext,
    ) -> f64;

    /// In-place SGD step.
    fn update(&mut self, gradient: &[LayerGradient], learning_rate: f64, l2_coeff: f64);

    /// Shapes `gradient` to match the net's parameters.
    fn allocate(&self, gradient: &mut Vec<LayerGradient>, assign_zero: bool);

    /// Whether the input layer fits a state of the given size.
    fn validate_input_size(&self, state_size: usize) -> bool;
}

/// A value network bundled with its state converter — the form the TD
/// search clones and trains as a scratch net.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NetWithConverter {
    converter: StateConverter,
    net: Mlp,
}

impl NetWithConverter {
    pub fn new(net: Mlp, converter: StateConverter) -> Self {
        Self { converter, net }
    }

    pub fn net(&self) -> &Mlp {
        &self.net
    }

    pub fn converter(&self) -> &StateConverter {
        &self.converter
    }

    pub(crate) fn set_converter(&mut self, converter: StateConverter) {
        self.converter = converter;
    }

    pub(crate) fn replace_net(&mut self, net: Mlp) {
        self.net = net;
    }

    /// Input layer size implied by a state size and a converter.
    pub fn input_size_for(state_size: usize, converter: &StateConverter) -> usize {
        state_size * converter.expansion_factor()
    }
}

impl ValueNet for NetWithConverter {
    fn calc_gradient_and_value(
        &self,
        input: &[f64],
        target: &[f64],
        cost: Cost,
        out_gradient: &mut Vec<LayerGradient>,
        out_value: &mut Vec<f64>,
        gradient_scale_factor: f64,
        context: &mut NetContext,
    ) {
        self.net.calc_gradient_and_value(
            input,
            target,
            cost,
            out_gradient,
            out_value,
            gradient_scale_factor,
            context,
        );
    }

    fn evaluate(
        &self,
        state: &[i32],
        out_state_converted: &mut Vec<f64>,
        context: &mut NetContext,
    ) -> f64 {
        self.converter.convert(state, out_state_converted);
        self.net.act(out_state_converted, context)
    }

    fn update(&mut self, gradient: &[LayerGradient], learning_rate: f64, l2_coeff: f64) {
        self.net.update(gradient, learning_rate, l2_coeff);
    }

    fn allocate(&self, gradient: &mut Vec<LayerGradient>, assign_zero: bool) {
        self.net.allocate(gradient, assign_zero);
    }

    fn validate_input_size(&self, state_size: usize) -> bool {
        Self::input_size_for(state_size, &self.converter) == self.net.in_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_net() -> Mlp {
        Mlp::new(&[4, 5, 1])
    }

    #[test]
    fn test_dimensions() {
        let net = Mlp::new(&[32, 64, 16, 1]);
        assert_eq!(net.dimensions(), vec![32, 64, 16, 1]);
        assert_eq!(net.in_size(), 32);
    }

    #[test]
    fn test_allocate_shapes_and_zeroes() {
        let net = small_net();
        let mut gradient = Vec::new();
        net.allocate(&mut gradient, true);
        assert_eq!(gradient.len(), 2);
        assert_eq!(gradient[0].weights.len(), 4 * 5);
        assert_eq!(gradient[0].biases.len(), 5);
        assert_eq!(gradient[1].weights.len(), 5);
        assert!(gradient.iter().all(|g| g.weights.iter().all(|&w| w == 0.0)));

        gradient[0].weights[0] = 3.0;
        net.allocate(&mut gradient, false);
        assert_eq!(gradient[0].weights[0], 3.0);
        net.allocate(&mut gradient, true);
        assert_eq!(gradient[0].weights[0], 0.0);
    }

    #[test]
    fn test_gradient_matches_numeric_differentiation() {
        let mut net = small_net();
        let input = [0.4, -1.2, 0.7, 2.0];
        let target = [0.3];
        let mut context = NetContext::default();

        let mut gradient = Vec::new();
        let mut out_value = Vec::new();
        net.calc_gradient_and_value(
            &input,
            &target,
            Cost::HalfSquare,
            &mut gradient,
            &mut out_value,
            0.0,
            &mut context,
        );

        let eps = 1e-6;
        for layer_id in 0..2 {
            for weight_id in 0..net.layers[layer_id].weights.len() {
                let original = net.layers[layer_id].weights[weight_id];

                net.layers[layer_id].weights[weight_id] = original + eps;
                let up = net.act(&input, &mut context);
                net.layers[layer_id].weights[weight_id] = original - eps;
                let down = net.act(&input, &mut context);
                net.layers[layer_id].weights[weight_id] = original;

                let cost_up = 0.5 * (up - target[0]).powi(2);
                let cost_down = 0.5 * (down - target[0]).powi(2);
                let numeric = (cost_up - cost_down) / (2.0 * eps);
                assert!(
                    (numeric - gradient[layer_id].weights[weight_id]).abs() < 1e-5,
                    "layer {layer_id} weight {weight_id}: {numeric} vs {}",
                    gradient[layer_id].weights[weight_id]
                );
            }
        }
    }

    #[test]
    fn test_linear_cost_yields_value_gradient() {
        let net = small_net();
        let input = [1.0, 0.5, -0.5, 0.25];
        let mut context = NetContext::default();

        let mut gradient = Vec::new();
        let mut out_value = Vec::new();
        net.calc_gradient_and_value(
            &input,
            &[0.0],
            Cost::Linear,
            &mut gradient,
            &mut out_value,
            0.0,
            &mut context,
        );

        // Descending along the negated gradient must increase the value.
        let before = out_value[0];
        let mut stepped = net.clone();
        stepped.update(&gradient, -0.01, 0.0);
        let after = stepped.act(&input, &mut context);
        assert!(after > before);
    }

    #[test]
    fn test_scale_factor_implements_the_trace_recurrence() {
        let net = small_net();
        let input_a = [1.0, 2.0, 3.0, 4.0];
        let input_b = [-1.0, 0.5, 0.0, 1.5];
        let mut context = NetContext::default();
        let mut out_value = Vec::new();

        let mut grad_a = Vec::new();
        net.calc_gradient_and_value(
            &input_a,
            &[0.0],
            Cost::Linear,
            &mut grad_a,
            &mut out_value,
            0.0,
            &mut context,
        );
        let mut grad_b = Vec::new();
        net.calc_gradient_and_value(
            &input_b,
            &[0.0],
            Cost::Linear,
            &mut grad_b,
            &mut out_value,
            0.0,
            &mut context,
        );

        // z = grad_a, then z <- grad_b + 0.7 z in one call.
        let mut z = grad_a.clone();
        net.calc_gradient_and_value(
            &input_b,
            &[0.0],
            Cost::Linear,
            &mut z,
            &mut out_value,
            0.7,
            &mut context,
        );

        for layer_id in 0..z.len() {
            for (i, value) in z[layer_id].weights.iter().enumerate() {
                let expected = grad_b[layer_id].weights[i] + 0.7 * grad_a[layer_id].weights[i];
                assert!((value - expected).abs() < 1e-12);
            }
            for (i, value) in z[layer_id].biases.iter().enumerate() {
                let expected = grad_b[layer_id].biases[i] + 0.7 * grad_a[layer_id].biases[i];
                assert!((value - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_update_applies_learning_rate_sign() {
        let mut net = small_net();
        let reference = net.clone();
        let mut gradient = Vec::new();
        net.allocate(&mut gradient, true);
        gradient[0].weights[0] = 2.0;

        net.update(&gradient, 0.5, 0.0);
        assert!(
            (net.layers[0].weights[0] - (reference.layers[0].weights[0] - 1.0)).abs() < 1e-12
        );
    }
}
