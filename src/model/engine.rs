//! Fixed-arena inference engine.
//!
//! The engine is built once at boot around a `[f32; A]` arena and then
//! re-loaded each time a new model arrives.  Loading is two-phase: the
//! image is decoded and an arena plan computed without touching the
//! arena; only once the plan is known to fit are parameters copied in and
//! the new plan swapped for the old one.  Any rejected image therefore
//! leaves the previous model running.
//!
//! Arena layout for a loaded model:
//!
//! ```text
//! [ layer params ... | input(2) | output(2) | scratch A | scratch B ]
//! ```

use log::{debug, info};

use super::format::{self, Activation, Layer, MAX_LAYERS};
use super::store::ModelImage;
use crate::error::{InferenceError, LoadError};

/// Default arena size in `f32` words.
pub const ARENA_WORDS: usize = 1024;

const VARIANCE_EPSILON: f32 = 1e-7;

/// Output scores of one forward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub stay: f32,
    pub water: f32,
}

impl Scores {
    /// What callers fall back to whenever inference cannot run.
    pub const DO_NOT_WATER: Self = Self {
        stay: 1.0,
        water: 0.0,
    };
}

/// A region of the arena bound to a named tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorHandle {
    offset: usize,
    len: usize,
}

impl TensorHandle {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Summary of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub image_bytes: usize,
    pub layers: usize,
    pub arena_words: usize,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Normalize {
        mean: usize,
        inv_std: usize,
        width: usize,
    },
    Dense {
        weights: usize,
        bias: usize,
        inputs: usize,
        outputs: usize,
        activation: Activation,
    },
}

impl Op {
    fn output_width(&self) -> usize {
        match *self {
            Self::Normalize { width, .. } => width,
            Self::Dense { outputs, .. } => outputs,
        }
    }
}

struct Plan {
    ops: heapless::Vec<Op, MAX_LAYERS>,
    input: TensorHandle,
    output: TensorHandle,
    scratch: [usize; 2],
    used: usize,
}

pub struct InferenceEngine<const A: usize = ARENA_WORDS> {
    arena: [f32; A],
    plan: Option<Plan>,
}

impl<const A: usize> InferenceEngine<A> {
    pub fn new() -> Self {
        Self {
            arena: [0.0; A],
            plan: None,
        }
    }

    /// Load a finalized model image.
    pub fn load(&mut self, image: &ModelImage) -> Result<ModelInfo, LoadError> {
        self.load_bytes(image.as_bytes())
    }

    /// Load from raw image bytes.
    pub fn load_bytes(&mut self, image: &[u8]) -> Result<ModelInfo, LoadError> {
        let graph = format::decode(image)?;

        let width = graph.max_width();
        let params = graph.parameter_words();
        let required = params + format::INPUTS + format::OUTPUTS + 2 * width;
        if required > A {
            return Err(LoadError::ArenaExhausted {
                required,
                available: A,
            });
        }

        let mut ops: heapless::Vec<Op, MAX_LAYERS> = heapless::Vec::new();
        let mut cursor = 0;
        for layer in &graph.layers {
            let op = match layer {
                Layer::Normalize { mean, .. } => {
                    let width = mean.len();
                    let op = Op::Normalize {
                        mean: cursor,
                        inv_std: cursor + width,
                        width,
                    };
                    cursor += 2 * width;
                    op
                }
                Layer::Dense {
                    inputs,
                    outputs,
                    weights,
                    bias,
                    activation,
                } => {
                    let op = Op::Dense {
                        weights: cursor,
                        bias: cursor + weights.len(),
                        inputs: *inputs as usize,
                        outputs: *outputs as usize,
                        activation: *activation,
                    };
                    cursor += weights.len() + bias.len();
                    op
                }
            };
            ops.push(op).map_err(|_| LoadError::InvalidGraph("too many layers"))?;
        }

        // Plan fits: from here on the old model is replaced.  Parameters
        // are copied in the same order the offsets above were assigned.
        let mut at = 0;
        for layer in &graph.layers {
            match layer {
                Layer::Normalize { mean, variance } => {
                    let width = mean.len();
                    self.arena[at..at + width].copy_from_slice(mean);
                    for (slot, var) in self.arena[at + width..at + 2 * width]
                        .iter_mut()
                        .zip(variance)
                    {
                        *slot = 1.0 / var.max(VARIANCE_EPSILON).sqrt();
                    }
                    at += 2 * width;
                }
                Layer::Dense { weights, bias, .. } => {
                    self.arena[at..at + weights.len()].copy_from_slice(weights);
                    at += weights.len();
                    self.arena[at..at + bias.len()].copy_from_slice(bias);
                    at += bias.len();
                }
            }
        }
        debug_assert_eq!(at, cursor);

        let input = TensorHandle {
            offset: cursor,
            len: format::INPUTS,
        };
        let output = TensorHandle {
            offset: input.offset + input.len,
            len: format::OUTPUTS,
        };
        let scratch_a = output.offset + output.len;
        let scratch = [scratch_a, scratch_a + width];
        let used = scratch_a + 2 * width;
        debug_assert_eq!(used, required);

        self.plan = Some(Plan {
            ops,
            input,
            output,
            scratch,
            used,
        });

        let info = ModelInfo {
            image_bytes: image.len(),
            layers: graph.layers.len(),
            arena_words: used,
        };
        info!(
            "engine: loaded {} layers ({} of {} arena words)",
            info.layers, used, A
        );
        Ok(info)
    }

    /// Run one forward pass.
    pub fn run(&mut self, temperature: f32, moisture: f32) -> Result<Scores, InferenceError> {
        let Some(plan) = self.plan.as_ref() else {
            return Err(InferenceError::NotReady);
        };
        if !temperature.is_finite() || !moisture.is_finite() {
            debug!("engine: non-finite input");
            return Err(InferenceError::ExecutionFailed);
        }

        let arena = &mut self.arena;
        arena[plan.input.offset] = temperature;
        arena[plan.input.offset + 1] = moisture;

        let mut src = plan.input.offset;
        let last = plan.ops.len() - 1;
        for (i, op) in plan.ops.iter().enumerate() {
            let dst = if i == last {
                plan.output.offset
            } else {
                plan.scratch[i % 2]
            };
            execute(arena, *op, src, dst)?;

            let out = &arena[dst..dst + op.output_width()];
            if !out.iter().all(|v| v.is_finite()) {
                return Err(InferenceError::ExecutionFailed);
            }
            src = dst;
        }

        let out = plan.output.offset;
        Ok(Scores {
            stay: arena[out],
            water: arena[out + 1],
        })
    }

    pub fn is_ready(&self) -> bool {
        self.plan.is_some()
    }

    /// Input tensor (temperature, moisture) of the loaded model.
    pub fn input(&self) -> Option<TensorHandle> {
        self.plan.as_ref().map(|p| p.input)
    }

    /// Output tensor (stay, water) of the loaded model.
    pub fn output(&self) -> Option<TensorHandle> {
        self.plan.as_ref().map(|p| p.output)
    }

    /// Arena words taken by the loaded model, 0 when unloaded.
    pub fn arena_used(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.used)
    }

    pub const fn capacity(&self) -> usize {
        A
    }
}

impl<const A: usize> Default for InferenceEngine<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one op from `src` into `dst`.  A Dense pre-activation that is not
/// finite fails the pass here, before Relu or Softmax can hide it.
fn execute(arena: &mut [f32], op: Op, src: usize, dst: usize) -> Result<(), InferenceError> {
    match op {
        Op::Normalize {
            mean,
            inv_std,
            width,
        } => {
            for i in 0..width {
                arena[dst + i] = (arena[src + i] - arena[mean + i]) * arena[inv_std + i];
            }
        }
        Op::Dense {
            weights,
            bias,
            inputs,
            outputs,
            activation,
        } => {
            for o in 0..outputs {
                let row = weights + o * inputs;
                let mut acc = arena[bias + o];
                for i in 0..inputs {
                    acc += arena[row + i] * arena[src + i];
                }
                if !acc.is_finite() {
                    debug!("engine: non-finite accumulator at output {}", o);
                    return Err(InferenceError::ExecutionFailed);
                }
                arena[dst + o] = acc;
            }
            activate(&mut arena[dst..dst + outputs], activation);
        }
    }
    Ok(())
}

fn activate(values: &mut [f32], activation: Activation) {
    match activation {
        Activation::Linear => {}
        Activation::Relu => {
            for v in values.iter_mut() {
                *v = v.max(0.0);
            }
        }
        Activation::Softmax => {
            let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mut sum = 0.0;
            for v in values.iter_mut() {
                *v = (*v - max).exp();
                sum += *v;
            }
            for v in values.iter_mut() {
                *v /= sum;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────
