//! The Social LSTM: forward step, sequence loss, and backpropagation
//! through time.
//!
//! Per frame `t` and slot `i`:
//!
//! ```text
//! social_i = pool(mask_t, h_{t-1})                     [G²·H]
//! x_i      = [relu(pos_i·Wc + bc), relu(social_i·Wt + bt)]   [2E]
//! h_i, c_i = lstm([x_i, h_{t-1,i}], c_{t-1,i})
//! z_i      = h_i·Wo + bo                              [5]
//! ```
//!
//! The social tensor for frame `t` reads only the state from `t - 1`.
//! Empty slots are advanced like occupied ones; the loss ignores them.

use throng_core::{Frame, ModelConfig, Sequence, ShapeError, OUTPUT_SIZE};
use throng_pool::{social_tensor, social_tensor_backward, GridMask};

use crate::density::Gaussian2d;
use crate::error::ModelError;
use crate::linalg::{add_assign, mat_vec_acc, outer_acc, vec_mat_acc};
use crate::lstm::{self, LstmCache};
use crate::params::Params;
use crate::state::RecurrentState;

/// Result of one inference step.
#[derive(Clone, Debug)]
pub struct StepOutput {
    /// State after the step.
    pub state: RecurrentState,
    /// Predicted next-position distribution for every slot.
    pub distributions: Vec<Gaussian2d>,
}

/// Loss of one sequence, optionally with its gradient.
#[derive(Clone, Debug)]
pub struct SequenceLoss {
    /// Mean clamped NLL over valid (slot, frame) pairs; 0.0 if none.
    pub data_loss: f64,
    /// `λ · Σ w²`.
    pub l2_penalty: f64,
    /// Pairs where both the input and the target slot are occupied.
    pub valid_pairs: usize,
    /// Gradient of `data_loss` alone. `None` when there are no valid
    /// pairs or when only the loss was requested.
    pub grad: Option<Params>,
}

impl SequenceLoss {
    /// `data_loss + l2_penalty`.
    pub fn total(&self) -> f64 {
        self.data_loss + self.l2_penalty
    }
}

// Everything the backward pass needs from one frame.
struct FrameTrace {
    // [N, 2E + H]: post-relu embeddings followed by h_prev.
    xh: Vec<f64>,
    // [N, G²·H]
    social: Vec<f64>,
    lstm: Vec<LstmCache>,
    raw: Vec<[f64; OUTPUT_SIZE]>,
}

/// Shared-weight Social LSTM.
#[derive(Clone, Debug)]
pub struct SocialLstm {
    config: ModelConfig,
    params: Params,
}

impl SocialLstm {
    /// A freshly initialised model.
    ///
    /// # Errors
    ///
    /// [`ModelError::Config`] if `config` fails validation.
    pub fn new(config: ModelConfig, seed: u64) -> Result<Self, ModelError> {
        config.validate()?;
        let params = Params::init(&config, seed);
        Ok(Self { config, params })
    }

    /// Wrap existing weights, checking them against `config`.
    ///
    /// # Errors
    ///
    /// [`ModelError::Config`] or [`ModelError::ParamLength`].
    pub fn from_params(config: ModelConfig, params: Params) -> Result<Self, ModelError> {
        config.validate()?;
        params.check_shapes(&config)?;
        Ok(Self { config, params })
    }

    /// The hyperparameter record.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Current weights.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Mutable weights, for the optimizer.
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Consume the model, returning its weights.
    pub fn into_params(self) -> Params {
        self.params
    }

    /// All-zero state for a new sequence.
    pub fn initial_state(&self) -> RecurrentState {
        RecurrentState::zeros(self.config.max_num_peds, self.config.rnn_size)
    }

    /// `λ · Σ w²` over every tensor.
    pub fn l2_penalty(&self) -> f64 {
        self.config.l2_param * self.params.squared_norm()
    }

    /// Advance every slot by one frame.
    ///
    /// `mask` must be the grid mask of `frame`. The returned state
    /// replaces `state`; `state` itself is only read.
    ///
    /// # Errors
    ///
    /// [`ModelError::Shape`] if the frame, mask, or state does not match
    /// the configured slot capacity and grid.
    pub fn step(
        &self,
        frame: &Frame,
        mask: &GridMask,
        state: &RecurrentState,
    ) -> Result<StepOutput, ModelError> {
        self.check_frame(frame, 0)?;
        mask.check_shape(self.config.max_num_peds, self.config.grid_size)?;
        self.check_state(state)?;

        let (trace, state) = self.forward_frame(frame, mask, state);
        let distributions = trace.raw.iter().map(Gaussian2d::from_raw).collect();
        Ok(StepOutput {
            state,
            distributions,
        })
    }

    /// Loss of one `(input, target)` pair without a gradient.
    ///
    /// `masks[t]` is the grid mask of `input` frame `t`.
    ///
    /// # Errors
    ///
    /// [`ModelError::Shape`] on mismatched shapes,
    /// [`ModelError::NonFinite`] if the loss is NaN or infinite.
    pub fn sequence_loss(
        &self,
        input: &Sequence,
        target: &Sequence,
        masks: &[GridMask],
    ) -> Result<SequenceLoss, ModelError> {
        self.check_sequence(input, target, masks)?;
        let traces = self.forward_sequence(input, masks);
        let (data_loss, valid_pairs) = data_loss(&traces, input, target);
        if !data_loss.is_finite() {
            return Err(ModelError::NonFinite {
                context: "sequence loss",
            });
        }
        Ok(SequenceLoss {
            data_loss,
            l2_penalty: self.l2_penalty(),
            valid_pairs,
            grad: None,
        })
    }

    /// Loss of one `(input, target)` pair and the gradient of its data
    /// term, by backpropagation through time.
    ///
    /// The L2 term's gradient is not included; add it with
    /// [`Params::add_l2_grad`] once per update.
    ///
    /// # Errors
    ///
    /// As [`sequence_loss`](Self::sequence_loss), plus
    /// [`ModelError::NonFinite`] for a non-finite gradient.
    pub fn loss_and_grad(
        &self,
        input: &Sequence,
        target: &Sequence,
        masks: &[GridMask],
    ) -> Result<SequenceLoss, ModelError> {
        self.check_sequence(input, target, masks)?;
        let traces = self.forward_sequence(input, masks);
        let (data_loss, valid_pairs) = data_loss(&traces, input, target);
        if !data_loss.is_finite() {
            return Err(ModelError::NonFinite {
                context: "sequence loss",
            });
        }

        let grad = if valid_pairs == 0 {
            None
        } else {
            let grad = self.backward(&traces, input, target, masks, valid_pairs);
            if !grad.is_finite() {
                return Err(ModelError::NonFinite {
                    context: "sequence gradient",
                });
            }
            Some(grad)
        };

        Ok(SequenceLoss {
            data_loss,
            l2_penalty: self.l2_penalty(),
            valid_pairs,
            grad,
        })
    }

    // ── Validation ──────────────────────────────────────────────

    fn check_frame(&self, frame: &Frame, index: usize) -> Result<(), ShapeError> {
        if frame.capacity() != self.config.max_num_peds {
            return Err(ShapeError::FrameCapacity {
                frame: index,
                expected: self.config.max_num_peds,
                found: frame.capacity(),
            });
        }
        Ok(())
    }

    fn check_state(&self, state: &RecurrentState) -> Result<(), ShapeError> {
        let expected = self.config.max_num_peds * self.config.rnn_size;
        if state.rnn_size() != self.config.rnn_size || state.hidden_all().len() != expected {
            return Err(ShapeError::ArrayLength {
                expected,
                found: state.hidden_all().len(),
            });
        }
        Ok(())
    }

    fn check_sequence(
        &self,
        input: &Sequence,
        target: &Sequence,
        masks: &[GridMask],
    ) -> Result<(), ShapeError> {
        input.check_capacity(self.config.max_num_peds)?;
        target.check_capacity(self.config.max_num_peds)?;
        if target.len() != input.len() {
            return Err(ShapeError::LengthMismatch {
                expected: input.len(),
                found: target.len(),
            });
        }
        if masks.len() != input.len() {
            return Err(ShapeError::MaskShape {
                reason: format!("{} masks for {} frames", masks.len(), input.len()),
            });
        }
        for mask in masks {
            mask.check_shape(self.config.max_num_peds, self.config.grid_size)?;
        }
        Ok(())
    }

    // ── Forward ─────────────────────────────────────────────────

    fn forward_frame(
        &self,
        frame: &Frame,
        mask: &GridMask,
        prev: &RecurrentState,
    ) -> (FrameTrace, RecurrentState) {
        let p = &self.params;
        let n = self.config.max_num_peds;
        let e = self.config.embedding_size;
        let h = self.config.rnn_size;
        let soc = self.config.social_size();
        let width = 2 * e + h;

        let social = social_tensor(mask, prev.hidden_all(), h);
        let mut xh = vec![0.0; n * width];
        let mut caches = Vec::with_capacity(n);
        let mut raw = Vec::with_capacity(n);
        let mut hidden = vec![0.0; n * h];
        let mut cell = vec![0.0; n * h];

        for (i, slot) in frame.slots().iter().enumerate() {
            let row = &mut xh[i * width..(i + 1) * width];
            let (emb_pos, rest) = row.split_at_mut(e);
            let (emb_soc, h_prev) = rest.split_at_mut(e);

            emb_pos.copy_from_slice(&p.coord_b);
            vec_mat_acc(&slot.position(), &p.coord_w, e, emb_pos);
            relu(emb_pos);

            emb_soc.copy_from_slice(&p.tensor_b);
            vec_mat_acc(&social[i * soc..(i + 1) * soc], &p.tensor_w, e, emb_soc);
            relu(emb_soc);

            h_prev.copy_from_slice(prev.hidden(i));

            let cache = lstm::forward(&p.lstm_w, &p.lstm_b, row, prev.cell(i), h);

            let mut z = [0.0; OUTPUT_SIZE];
            z.copy_from_slice(&p.out_b);
            vec_mat_acc(&cache.hidden, &p.out_w, OUTPUT_SIZE, &mut z);

            hidden[i * h..(i + 1) * h].copy_from_slice(&cache.hidden);
            cell[i * h..(i + 1) * h].copy_from_slice(&cache.cell);
            caches.push(cache);
            raw.push(z);
        }

        let trace = FrameTrace {
            xh,
            social,
            lstm: caches,
            raw,
        };
        (trace, RecurrentState::from_parts(h, hidden, cell))
    }

    fn forward_sequence(&self, input: &Sequence, masks: &[GridMask]) -> Vec<FrameTrace> {
        let mut state = self.initial_state();
        let mut traces = Vec::with_capacity(input.len());
        for (frame, mask) in input.frames().iter().zip(masks) {
            let (trace, next) = self.forward_frame(frame, mask, &state);
            traces.push(trace);
            state = next;
        }
        traces
    }

    // ── Backward ────────────────────────────────────────────────

    fn backward(
        &self,
        traces: &[FrameTrace],
        input: &Sequence,
        target: &Sequence,
        masks: &[GridMask],
        valid_pairs: usize,
    ) -> Params {
        let p = &self.params;
        let n = self.config.max_num_peds;
        let e = self.config.embedding_size;
        let h = self.config.rnn_size;
        let soc = self.config.social_size();
        let width = 2 * e + h;
        let inv_valid = 1.0 / valid_pairs as f64;

        let mut grads = Params::zeros_like(&self.config);
        let zero_cell = vec![0.0; h];
        // Gradients flowing into frame t's outputs from frame t + 1.
        let mut dh_next = vec![0.0; n * h];
        let mut dc_next = vec![0.0; n * h];

        for t in (0..traces.len()).rev() {
            let trace = &traces[t];
            let in_frame = &input.frames()[t];
            let tgt_frame = &target.frames()[t];

            let mut dh_prev = vec![0.0; n * h];
            let mut dc_prev = vec![0.0; n * h];
            let mut d_social = vec![0.0; n * soc];

            for i in 0..n {
                let cache = &trace.lstm[i];
                let mut dh = dh_next[i * h..(i + 1) * h].to_vec();

                let (src, dst) = (&in_frame.slots()[i], &tgt_frame.slots()[i]);
                if src.exists() && dst.exists() {
                    let (_, mut dz) = Gaussian2d::from_raw(&trace.raw[i]).nll_with_grad(dst.x, dst.y);
                    dz.iter_mut().for_each(|g| *g *= inv_valid);
                    outer_acc(&cache.hidden, &dz, &mut grads.out_w);
                    add_assign(&mut grads.out_b, &dz);
                    mat_vec_acc(&p.out_w, OUTPUT_SIZE, &dz, &mut dh);
                }

                let c_prev = if t == 0 {
                    &zero_cell[..]
                } else {
                    &traces[t - 1].lstm[i].cell[..]
                };
                let xh = &trace.xh[i * width..(i + 1) * width];
                let mut dxh = vec![0.0; width];
                let dc = lstm::backward(
                    &p.lstm_w,
                    cache,
                    xh,
                    c_prev,
                    &dh,
                    &dc_next[i * h..(i + 1) * h],
                    &mut grads.lstm_w,
                    &mut grads.lstm_b,
                    &mut dxh,
                );
                dc_prev[i * h..(i + 1) * h].copy_from_slice(&dc);
                add_assign(&mut dh_prev[i * h..(i + 1) * h], &dxh[2 * e..]);

                let (d_pos, rest) = dxh.split_at_mut(e);
                let d_soc = &mut rest[..e];
                relu_backward(&xh[..e], d_pos);
                relu_backward(&xh[e..2 * e], d_soc);

                outer_acc(&src.position(), d_pos, &mut grads.coord_w);
                add_assign(&mut grads.coord_b, d_pos);

                let social_i = &trace.social[i * soc..(i + 1) * soc];
                outer_acc(social_i, d_soc, &mut grads.tensor_w);
                add_assign(&mut grads.tensor_b, d_soc);
                mat_vec_acc(&p.tensor_w, e, d_soc, &mut d_social[i * soc..(i + 1) * soc]);
            }

            social_tensor_backward(&masks[t], &d_social, h, &mut dh_prev);
            dh_next = dh_prev;
            dc_next = dc_prev;
        }
        grads
    }
}

fn data_loss(traces: &[FrameTrace], input: &Sequence, target: &Sequence) -> (f64, usize) {
    let mut total = 0.0;
    let mut valid = 0usize;
    for ((trace, in_frame), tgt_frame) in traces.iter().zip(input.frames()).zip(target.frames()) {
        for ((raw, src), dst) in trace.raw.iter().zip(in_frame.slots()).zip(tgt_frame.slots()) {
            if src.exists() && dst.exists() {
                total += Gaussian2d::from_raw(raw).nll(dst.x, dst.y);
                valid += 1;
            }
        }
    }
    if valid == 0 {
        (0.0, 0)
    } else {
        (total / valid as f64, valid)
    }
}

fn relu(v: &mut [f64]) {
    v.iter_mut().for_each(|x| *x = x.max(0.0));
}

// `out` is the post-activation value.
fn relu_backward(out: &[f64], grad: &mut [f64]) {
    for (g, &o) in grad.iter_mut().zip(out) {
        if o <= 0.0 {
            *g = 0.0;
        }
    }
}
