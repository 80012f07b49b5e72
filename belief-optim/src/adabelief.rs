use crate::config::AdaBeliefConfig;
use crate::plan::{StepPlan, Update};
use crate::state::Moments;
use belief_core::tensor::l2_norm;
use belief_core::{BeliefError, Layout, ParamId, ParamStore, Parameter, Promoted};
use rand::{rngs::SmallRng, SeedableRng};
use std::collections::BTreeSet;

/// Smallest mean of the cautious mask, bounds its rescaling factor.
const CAUTIOUS_MIN_MEAN: f32 = 1e-3;

/// Parameters sharing one set of hyperparameters and one step counter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    config: AdaBeliefConfig,
    params: Vec<ParamId>,
    step: u64,
}

impl ParamGroup {
    /// Hyperparameters of this group
    #[must_use]
    pub fn config(&self) -> &AdaBeliefConfig {
        &self.config
    }

    /// Members of this group
    #[must_use]
    pub fn params(&self) -> &[ParamId] {
        &self.params
    }

    /// Number of steps taken, 0 before the first step and after reset
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }
}

#[derive(Debug, Clone)]
struct Slot {
    id: ParamId,
    group: usize,
    state: Option<Moments>,
}

/// # Adapting stepsizes by the belief in observed gradients
///
/// AdaBelief scales each step by how far the gradient deviates from its
/// running average, the "belief" in the gradient. Optional variants are
/// RAdam style rectification, AMSBound, AdaNorm gradient norm
/// reweighting and cautious masking, all selected per group by
/// [AdaBeliefConfig].
///
/// Parameters, their gradients and values, live in a [ParamStore]. The
/// optimizer only keeps the handles and per parameter state.
/// ```
/// use belief_core::{ParamStore, Tensor};
/// use belief_optim::{AdaBelief, AdaBeliefConfig};
/// let mut store = ParamStore::new();
/// let w = store.insert(Tensor::from([1., 2.]));
/// let mut optim = AdaBelief::new([w], AdaBeliefConfig::default())?;
/// store.set_grad(w, Tensor::from([0.5, -0.5]))?;
/// optim.step(&mut store)?;
/// assert_eq!(optim.groups()[0].step(), 1);
/// # Ok::<(), belief_core::BeliefError>(())
/// ```
#[derive(Debug, Clone)]
pub struct AdaBelief {
    groups: Vec<ParamGroup>,
    // Indexed by ParamId::i
    slots: Vec<Option<Slot>>,
    seed: u64,
}

impl core::fmt::Display for AdaBelief {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AdaBelief")
    }
}

impl AdaBelief {
    const SEED: u64 = 69420;

    /// Optimizer with a single group
    pub fn new(
        params: impl IntoIterator<Item = ParamId>,
        config: AdaBeliefConfig,
    ) -> Result<AdaBelief, BeliefError> {
        AdaBelief::with_groups([(params, config)])
    }

    /// Optimizer with multiple groups. A parameter may belong to at most
    /// one group.
    pub fn with_groups<P: IntoIterator<Item = ParamId>>(
        groups: impl IntoIterator<Item = (P, AdaBeliefConfig)>,
    ) -> Result<AdaBelief, BeliefError> {
        let mut optim = AdaBelief { groups: Vec::new(), slots: Vec::new(), seed: Self::SEED };
        for (params, config) in groups {
            optim.add_param_group(params, config)?;
        }
        Ok(optim)
    }

    /// Seed of the stochastic rounding used for reduced precision parameters
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> AdaBelief {
        self.seed = seed;
        self
    }

    /// Add new group of parameters. The optimizer is not modified on error.
    pub fn add_param_group(
        &mut self,
        params: impl IntoIterator<Item = ParamId>,
        config: AdaBeliefConfig,
    ) -> Result<(), BeliefError> {
        config.validate()?;
        let params: Vec<ParamId> = params.into_iter().collect();
        let mut seen = BTreeSet::new();
        for &id in &params {
            let taken = matches!(self.slots.get(id.i()), Some(Some(_)));
            if taken || !seen.insert(id) {
                return Err(BeliefError::DuplicateParameter { param: id });
            }
        }
        let group = self.groups.len();
        for &id in &params {
            if self.slots.len() <= id.i() {
                self.slots.resize_with(id.i() + 1, || None);
            }
            if let Some(slot) = self.slots.get_mut(id.i()) {
                *slot = Some(Slot { id, group, state: None });
            }
        }
        log::debug!("AdaBelief group {group} with {} parameters: {config:?}", params.len());
        self.groups.push(ParamGroup { config, params, step: 0 });
        Ok(())
    }

    /// Parameter groups in insertion order
    #[must_use]
    pub fn groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    /// State of parameter, None if the parameter is not registered or has
    /// not received a gradient since creation
    #[must_use]
    pub fn state(&self, id: ParamId) -> Option<&Moments> {
        self.slots.get(id.i())?.as_ref()?.state.as_ref()
    }

    /// Learning rate of group
    #[must_use]
    pub fn learning_rate(&self, group: usize) -> Option<f32> {
        self.groups.get(group).map(|g| g.config.lr)
    }

    /// Set learning rate of all groups, used by schedulers
    pub fn set_learning_rate(&mut self, lr: f32) -> Result<(), BeliefError> {
        for group in &self.groups {
            AdaBeliefConfig { lr, ..group.config }.validate()?;
        }
        for group in &mut self.groups {
            group.config.lr = lr;
        }
        Ok(())
    }

    /// Set step counters to zero and zero all state. Hyperparameters and
    /// group membership stay. Calling reset twice is the same as once.
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            group.step = 0;
        }
        for slot in self.slots.iter_mut().flatten() {
            if let Some(state) = &mut slot.state {
                state.fill_zero();
            }
        }
        log::debug!("AdaBelief reset");
    }

    /// Evaluate closure, then step. Returns the value of the closure.
    /// Closure usually computes loss and sets gradients.
    pub fn step_with_closure<F>(&mut self, params: &mut ParamStore, closure: F) -> Result<f32, BeliefError>
    where
        F: FnOnce(&mut ParamStore) -> Result<f32, BeliefError>,
    {
        let loss = closure(params)?;
        self.step(params)?;
        Ok(loss)
    }

    /// Update all parameters that have a gradient.
    ///
    /// Parameters without gradient are skipped and their state is left
    /// untouched. Every registered parameter is checked against the store
    /// before anything changes. If a single parameter fails afterwards,
    /// the step is aborted and other parameters may or may not have been
    /// updated.
    pub fn step(&mut self, params: &mut ParamStore) -> Result<(), BeliefError> {
        self.check(params)?;
        let plans: Vec<StepPlan> = self
            .groups
            .iter_mut()
            .enumerate()
            .map(|(g, group)| {
                group.step += 1;
                let plan = StepPlan::new(&group.config, group.step);
                log::trace!("AdaBelief group {g} step {}: {:?}", plan.step, plan.update);
                match plan.update {
                    Update::Momentum { .. } => {
                        log::debug!("AdaBelief group {g} step {}: n_sma {:?} below threshold, momentum update", plan.step, plan.n_sma);
                    }
                    Update::Skip => {
                        log::debug!("AdaBelief group {g} step {}: n_sma {:?} below threshold, parameters stay", plan.step, plan.n_sma);
                    }
                    Update::Adaptive { .. } => {}
                }
                plan
            })
            .collect();
        update_all(&self.groups, &plans, params.as_mut_slice(), &mut self.slots, self.seed)
    }

    fn check(&self, params: &ParamStore) -> Result<(), BeliefError> {
        for slot in self.slots.iter().flatten() {
            let Some(param) = params.get(slot.id) else {
                return Err(BeliefError::UnknownParameter { param: slot.id });
            };
            if let Some(grad) = &param.grad {
                if grad.shape() != param.data.shape() {
                    return Err(BeliefError::ShapeMismatch {
                        expected: param.data.shape().clone(),
                        found: grad.shape().clone(),
                    });
                }
                if grad.layout() != Layout::Dense {
                    return Err(BeliefError::UnsupportedGradientLayout { param: slot.id });
                }
            }
            if let Some(state) = &slot.state {
                state.check_shape(param.data.shape())?;
            }
        }
        Ok(())
    }
}

/// Independent generator per parameter and step, so the result does not
/// depend on the order parameters are updated in.
fn param_rng(seed: u64, step: u64, id: ParamId) -> SmallRng {
    const PHI: u64 = 0x9e37_79b9_7f4a_7c15;
    const A: u64 = 0xbf58_476d_1ce4_e5b9;
    SmallRng::seed_from_u64(seed ^ step.wrapping_mul(PHI) ^ (id.i() as u64).wrapping_mul(A))
}

/// Single pass over the store, every slot is updated with the plan of its
/// own group.
fn update_all(
    groups: &[ParamGroup],
    plans: &[StepPlan],
    params: &mut [Parameter],
    slots: &mut [Option<Slot>],
    seed: u64,
) -> Result<(), BeliefError> {
    let update = |(param, slot): (&mut Parameter, &mut Option<Slot>)| -> Result<(), BeliefError> {
        let Some(slot) = slot else {
            return Ok(());
        };
        match (groups.get(slot.group), plans.get(slot.group)) {
            (Some(group), Some(plan)) => {
                let mut rng = param_rng(seed, plan.step, slot.id);
                update_param(slot.id, param, &mut slot.state, &group.config, plan, &mut rng)
            }
            _ => Ok(()),
        }
    };
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        params.par_iter_mut().zip(slots.par_iter_mut()).try_for_each(update)
    }
    #[cfg(not(feature = "parallel"))]
    {
        params.iter_mut().zip(slots.iter_mut()).try_for_each(update)
    }
}

fn update_param(
    id: ParamId,
    param: &mut Parameter,
    state: &mut Option<Moments>,
    config: &AdaBeliefConfig,
    plan: &StepPlan,
    rng: &mut SmallRng,
) -> Result<(), BeliefError> {
    let Parameter { data, grad } = param;
    let Some(grad) = grad else {
        return Ok(());
    };
    let grad = grad.as_dense().ok_or(BeliefError::UnsupportedGradientLayout { param: id })?;
    if grad.shape() != data.shape() {
        return Err(BeliefError::ShapeMismatch { expected: data.shape().clone(), found: grad.shape().clone() });
    }
    let moments = state.get_or_insert_with(|| Moments::zeros_like(data, config));
    moments.check_shape(data.shape())?;
    let Moments { exp_avg, exp_avg_var, exp_grad_norm, max_exp_avg_var } = moments;

    // Gradient is copied, user's gradient is never modified
    let mut grad = grad.to_f32_vec();
    let mut p = Promoted::new(data);
    let mut m = Promoted::new(exp_avg);
    let mut v = Promoted::new(exp_avg_var);
    let mut egn = exp_grad_norm.as_mut().map(Promoted::new);
    let mut vmax = max_exp_avg_var.as_mut().map(Promoted::new);

    if config.weight_decay > 0. {
        if config.weight_decouple {
            let decay = if config.fixed_decay { config.weight_decay } else { config.lr * config.weight_decay };
            for x in p.as_mut_slice() {
                *x *= 1. - decay;
            }
        } else {
            for (g, &x) in grad.iter_mut().zip(p.as_slice()) {
                *g += config.weight_decay * x;
            }
        }
    }

    let scale = match egn.as_mut().and_then(|e| e.as_mut_slice().first_mut()) {
        Some(egn) if config.adanorm => adanorm_scale(&grad, egn, config.r),
        _ => 1.,
    };

    let (beta1, beta2, eps) = (config.beta1, config.beta2, config.eps);
    for ((m, v), &g) in m.as_mut_slice().iter_mut().zip(v.as_mut_slice()).zip(&grad) {
        *m = beta1 * *m + (1. - beta1) * g * scale;
        let residual = g - *m;
        *v = beta2 * *v + (1. - beta2) * residual * residual + eps;
    }
    if let Some(vmax) = &mut vmax {
        for (mx, &v) in vmax.as_mut_slice().iter_mut().zip(v.as_slice()) {
            *mx = mx.max(v);
        }
    }

    let cautious = config.cautious.then(|| cautious_scale(m.as_slice(), &grad));
    let mask = |m: f32, g: f32| match cautious {
        Some(scale) if m * g > 0. => scale,
        Some(_) => 0.,
        None => 1.,
    };
    let denom = match &vmax {
        Some(vmax) => vmax.as_slice(),
        None => v.as_slice(),
    };
    match plan.update {
        Update::Adaptive { step_size, denom_correction } => {
            for (((p, &m), &d), &g) in p.as_mut_slice().iter_mut().zip(m.as_slice()).zip(denom).zip(&grad) {
                *p -= step_size * m * mask(m, g) / ((d.sqrt() + eps) / denom_correction);
            }
        }
        Update::Momentum { step_size } => {
            for ((p, &m), &g) in p.as_mut_slice().iter_mut().zip(m.as_slice()).zip(&grad) {
                *p -= step_size * m * mask(m, g);
            }
        }
        Update::Skip => {}
    }

    m.finish(rng)?;
    v.finish(rng)?;
    if let Some(egn) = egn {
        egn.finish(rng)?;
    }
    if let Some(vmax) = vmax {
        vmax.finish(rng)?;
    }
    p.finish(rng)
}

/// Updates the running gradient norm and returns the factor the gradient
/// is scaled by in the first moment. Gradients larger than the running
/// norm are scaled down to it.
fn adanorm_scale(grad: &[f32], exp_grad_norm: &mut f32, r: f32) -> f32 {
    let norm = l2_norm(grad);
    *exp_grad_norm = r * *exp_grad_norm + (1. - r) * norm;
    if norm > *exp_grad_norm {
        *exp_grad_norm / norm
    } else {
        1.
    }
}

/// Scale applied where momentum and gradient agree in sign, the inverse of
/// the fraction of such elements.
fn cautious_scale(exp_avg: &[f32], grad: &[f32]) -> f32 {
    let agree = exp_avg.iter().zip(grad).filter(|(&m, &g)| m * g > 0.).count();
    let mean = if grad.is_empty() { 0. } else { agree as f32 / grad.len() as f32 };
    1. / mean.max(CAUTIOUS_MIN_MEAN)
}
