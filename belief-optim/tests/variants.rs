use belief_core::{BeliefError, Gradient, ParamId, ParamStore, Tensor};
use belief_optim::{AdaBelief, AdaBeliefConfig};

fn values(store: &ParamStore, id: ParamId) -> Vec<f32> {
    store.data(id).map(Tensor::to_f32_vec).unwrap_or_default()
}

fn assert_close(x: &[f32], y: &[f32], tol: f32) {
    assert_eq!(x.len(), y.len());
    for (a, b) in x.iter().zip(y) {
        assert!((a - b).abs() <= tol, "{x:?} != {y:?}");
    }
}

#[test]
fn ams_bound_never_decreases() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([1., -1., 0.5]));
    let mut optim = AdaBelief::new([p], AdaBeliefConfig { ams_bound: true, ..Default::default() })?;
    let mut prev = vec![0.; 3];
    for t in 1..=20 {
        let g = 10. / t as f32;
        store.set_grad(p, Tensor::from([g, -g, g * (t % 3) as f32]))?;
        optim.step(&mut store)?;
        let state = optim.state(p).ok_or(BeliefError::UnknownParameter { param: p })?;
        let max = state.max_exp_avg_var().map(Tensor::to_f32_vec).unwrap_or_default();
        let var = state.exp_avg_var().to_f32_vec();
        for i in 0..3 {
            assert!(max[i] >= prev[i] && max[i] >= var[i], "{max:?} {prev:?} {var:?}");
        }
        prev = max;
    }
    Ok(())
}

#[test]
fn cautious_masks_disagreeing_elements() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let cautious = store.insert(Tensor::from([1.; 4]));
    let plain = store.insert(Tensor::from([1.; 4]));
    let mut optim = AdaBelief::with_groups([
        (vec![cautious], AdaBeliefConfig { cautious: true, ..Default::default() }),
        (vec![plain], AdaBeliefConfig::default()),
    ])?;
    // Momentum and gradient agree everywhere, mask is all ones
    store.set_grad(cautious, Tensor::from([10.; 4]))?;
    store.set_grad(plain, Tensor::from([10.; 4]))?;
    optim.step(&mut store)?;
    assert_eq!(values(&store, cautious), values(&store, plain));

    let (c0, p0) = (values(&store, cautious), values(&store, plain));
    store.set_grad(cautious, Tensor::from([1., 1., -1., -1.]))?;
    store.set_grad(plain, Tensor::from([1., 1., -1., -1.]))?;
    optim.step(&mut store)?;
    let state = optim.state(cautious).ok_or(BeliefError::UnknownParameter { param: cautious })?;
    assert_close(&state.exp_avg().to_f32_vec(), &[1., 1., 0.8, 0.8], 1e-6);

    // Half the elements agree, those get twice the step, the rest stay
    let (c1, p1) = (values(&store, cautious), values(&store, plain));
    assert_eq!(c1[2..], c0[2..]);
    for i in 0..2 {
        let (dc, dp) = (c1[i] - c0[i], p1[i] - p0[i]);
        assert!(dp < 0. && (dc - 2. * dp).abs() <= 1e-6, "{dc} {dp}");
    }
    Ok(())
}

#[test]
fn cautious_without_agreement_does_not_move() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([1., 2.]));
    let mut optim = AdaBelief::new([p], AdaBeliefConfig { cautious: true, ..Default::default() })?;
    store.set_grad(p, Tensor::from([10., 10.]))?;
    optim.step(&mut store)?;
    let before = values(&store, p);
    store.set_grad(p, Tensor::from([-1., -1.]))?;
    optim.step(&mut store)?;
    assert_eq!(values(&store, p), before);
    assert!(before.iter().all(|x| x.is_finite()));
    Ok(())
}

#[test]
fn rectify_skips_until_variance_is_tractable() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([1.]));
    let config = AdaBeliefConfig { rectify: true, degenerated_to_sgd: false, ..Default::default() };
    let mut optim = AdaBelief::new([p], config)?;
    for step in 1..=5 {
        store.set_grad(p, Tensor::from([1.]))?;
        optim.step(&mut store)?;
        assert_eq!(values(&store, p), [1.], "moved at step {step}");
    }
    // Moments kept updating while the parameter stayed
    let m = optim.state(p).map(|s| s.exp_avg().to_f32_vec()).unwrap_or_default();
    assert_close(&m, &[1. - 0.9f32.powi(5)], 1e-5);
    store.set_grad(p, Tensor::from([1.]))?;
    optim.step(&mut store)?;
    assert!(values(&store, p)[0] < 1.);
    Ok(())
}

#[test]
fn rectify_degenerates_to_sgd() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([1.]));
    let mut optim = AdaBelief::new([p], AdaBeliefConfig { rectify: true, ..Default::default() })?;
    store.set_grad(p, Tensor::from([1.]))?;
    optim.step(&mut store)?;
    // lr / bias_correction1 * exp_avg
    assert_close(&values(&store, p), &[0.999], 1e-6);
    Ok(())
}

#[test]
fn adanorm_scales_first_moment() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([1., 1.]));
    let mut optim = AdaBelief::new([p], AdaBeliefConfig { adanorm: true, ..Default::default() })?;
    store.set_grad(p, Tensor::from([3., 4.]))?;
    optim.step(&mut store)?;
    let state = optim.state(p).ok_or(BeliefError::UnknownParameter { param: p })?;
    // Running norm 0.05 * 5, gradient scaled by 0.25 / 5 in the first moment
    assert_close(&state.exp_grad_norm().map(Tensor::to_f32_vec).unwrap_or_default(), &[0.25], 1e-6);
    assert_close(&state.exp_avg().to_f32_vec(), &[0.015, 0.02], 1e-6);
    assert!(values(&store, p).iter().all(|&x| x < 1.));
    Ok(())
}

#[test]
fn adanorm_handles_zero_gradient() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let fresh = store.insert(Tensor::from([1., 1.]));
    let warm = store.insert(Tensor::from([1., 1.]));
    let mut optim = AdaBelief::new([fresh, warm], AdaBeliefConfig { adanorm: true, ..Default::default() })?;
    store.set_grad(warm, Tensor::from([3., 4.]))?;
    optim.step(&mut store)?;
    let before = values(&store, warm);

    store.set_grad(fresh, Tensor::from([0., 0.]))?;
    store.set_grad(warm, Tensor::from([0., 0.]))?;
    optim.step(&mut store)?;
    // Running norm of zero stays zero, nothing moves
    let state = optim.state(fresh).ok_or(BeliefError::UnknownParameter { param: fresh })?;
    assert_eq!(state.exp_grad_norm().and_then(Tensor::item), Some(0.));
    assert_eq!(values(&store, fresh), [1., 1.]);
    // Running norm decays by r, first moment decays by beta1 with scale 1
    let state = optim.state(warm).ok_or(BeliefError::UnknownParameter { param: warm })?;
    assert_close(&state.exp_grad_norm().map(Tensor::to_f32_vec).unwrap_or_default(), &[0.95 * 0.25], 1e-7);
    assert_close(&state.exp_avg().to_f32_vec(), &[0.9 * 0.015, 0.9 * 0.02], 1e-7);
    let after = values(&store, warm);
    assert!(after.iter().all(|x| x.is_finite()));
    assert!(after.iter().zip(&before).all(|(a, b)| a < b));
    Ok(())
}

#[test]
fn decoupled_weight_decay() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let scaled = store.insert(Tensor::from([2.]));
    let fixed = store.insert(Tensor::from([2.]));
    let config = AdaBeliefConfig { lr: 0.1, weight_decay: 0.5, ..Default::default() };
    let mut optim = AdaBelief::with_groups([
        (vec![scaled], config),
        (vec![fixed], AdaBeliefConfig { fixed_decay: true, ..config }),
    ])?;
    store.set_grad(scaled, Tensor::from([0.]))?;
    store.set_grad(fixed, Tensor::from([0.]))?;
    optim.step(&mut store)?;
    assert_close(&values(&store, scaled), &[1.9], 1e-6);
    assert_close(&values(&store, fixed), &[1.], 1e-6);
    Ok(())
}

#[test]
fn coupled_weight_decay_keeps_user_gradient() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([2.]));
    let config = AdaBeliefConfig { weight_decay: 0.5, weight_decouple: false, ..Default::default() };
    let mut optim = AdaBelief::new([p], config)?;
    store.set_grad(p, Tensor::from([0.]))?;
    optim.step(&mut store)?;
    // Effective gradient is 0.5 * 2
    let m = optim.state(p).map(|s| s.exp_avg().to_f32_vec()).unwrap_or_default();
    assert_close(&m, &[0.1], 1e-6);
    assert_close(&values(&store, p), &[1.998_889], 1e-6);
    assert_eq!(store.get(p).and_then(|p| p.grad.clone()), Some(Gradient::from(Tensor::from([0.]))));
    Ok(())
}

#[test]
fn adam_debias_keeps_step_size() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([1.]));
    let mut optim = AdaBelief::new([p], AdaBeliefConfig { adam_debias: true, ..Default::default() })?;
    store.set_grad(p, Tensor::from([1.]))?;
    optim.step(&mut store)?;
    assert_close(&values(&store, p), &[0.999_888_9], 1e-7);
    Ok(())
}

#[test]
fn all_variants_together_stay_finite() -> Result<(), BeliefError> {
    let mut store = ParamStore::new();
    let p = store.insert(Tensor::from([0.3, -0.7, 1.5, 0., 2.]));
    let config = AdaBeliefConfig {
        lr: 1e-2,
        weight_decay: 1e-2,
        rectify: true,
        ams_bound: true,
        adanorm: true,
        cautious: true,
        ..Default::default()
    };
    let mut optim = AdaBelief::new([p], config)?;
    for t in 0..100 {
        let grad: Vec<f32> = (0..5).map(|i| (0.37 * t as f32 + i as f32).sin() * (1 + i) as f32).collect();
        store.set_grad(p, Tensor::from(grad))?;
        optim.step(&mut store)?;
    }
    assert!(values(&store, p).iter().all(|x| x.is_finite()));
    assert_eq!(optim.groups()[0].step(), 100);
    Ok(())
}
