use belief_core::{BeliefError, DType, ParamStore, Tensor};
use belief_optim::{AdaBelief, AdaBeliefConfig};

fn trained() -> Result<(ParamStore, AdaBelief), BeliefError> {
    let mut store = ParamStore::new();
    let a = store.insert(Tensor::from([1., -2., 3.]));
    let b = store.insert(Tensor::from_f32([0.5, 0.25], 2, DType::BF16)?);
    let config = AdaBeliefConfig { ams_bound: true, adanorm: true, ..Default::default() };
    let mut optim = AdaBelief::new([a, b], config)?;
    for t in 0..4 {
        let t = t as f32;
        store.set_grad(a, Tensor::from([t, 1. - t, 0.5]))?;
        store.set_grad(b, Tensor::from([-t, 2.]))?;
        optim.step(&mut store)?;
    }
    Ok((store, optim))
}

#[test]
fn reset_zeroes_state() -> Result<(), BeliefError> {
    let (store, mut optim) = trained()?;
    optim.reset();
    assert_eq!(optim.groups()[0].step(), 0);
    for id in store.ids() {
        let state = optim.state(id).ok_or(BeliefError::UnknownParameter { param: id })?;
        assert!(state.exp_avg().to_f32_vec().iter().all(|&x| x == 0.));
        assert!(state.exp_avg_var().to_f32_vec().iter().all(|&x| x == 0.));
        assert_eq!(state.exp_grad_norm().and_then(Tensor::item), Some(0.));
        assert!(state.max_exp_avg_var().is_some_and(|t| t.to_f32_vec().iter().all(|&x| x == 0.)));
        // Dtype survives reset
        assert_eq!(state.dtype(), store.data(id).map_or(DType::F32, Tensor::dtype));
    }
    Ok(())
}

#[test]
fn reset_is_idempotent() -> Result<(), BeliefError> {
    let (store, mut optim) = trained()?;
    optim.reset();
    let once: Vec<_> = store.ids().map(|id| optim.state(id).cloned()).collect();
    optim.reset();
    let twice: Vec<_> = store.ids().map(|id| optim.state(id).cloned()).collect();
    assert_eq!(once, twice);
    assert_eq!(optim.groups()[0].step(), 0);
    Ok(())
}

#[test]
fn step_after_reset_matches_fresh_optimizer() -> Result<(), BeliefError> {
    let (mut store, mut optim) = trained()?;
    optim.reset();
    let mut fresh_store = store.clone();
    let mut fresh = AdaBelief::new(store.ids(), *optim.groups()[0].config())?;
    for s in [&mut store, &mut fresh_store] {
        let ids: Vec<_> = s.ids().collect();
        s.set_grad(ids[0], Tensor::from([0.1, 0.2, -0.3]))?;
        s.set_grad(ids[1], Tensor::from([1., -1.]))?;
    }
    optim.step(&mut store)?;
    fresh.step(&mut fresh_store)?;
    for id in store.ids() {
        assert_eq!(store.data(id), fresh_store.data(id));
        assert_eq!(optim.state(id), fresh.state(id));
    }
    assert_eq!(optim.groups()[0].step(), 1);
    Ok(())
}

#[test]
fn reset_keeps_hyperparameters_and_members() -> Result<(), BeliefError> {
    let (store, mut optim) = trained()?;
    let before = optim.groups()[0].clone();
    optim.reset();
    let after = &optim.groups()[0];
    assert_eq!(after.config(), before.config());
    assert_eq!(after.params(), before.params());
    assert_eq!(after.params().len(), store.len());
    Ok(())
}
