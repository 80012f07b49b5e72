use belief_core::BeliefError;
use nanoserde::{DeJson, SerJson};

/// # Hyperparameters of one AdaBelief parameter group
///
/// Field names are stable, they are the keys of the JSON form and of
/// the [schema](crate::FieldSchema).
#[derive(Debug, Clone, Copy, PartialEq, SerJson)]
pub struct AdaBeliefConfig {
    /// learning rate (default: 1e-3)
    pub lr: f32,
    /// coefficient used for the running average of the gradient (default: 0.9)
    pub beta1: f32,
    /// coefficient used for the running average of the squared residual (default: 0.999)
    pub beta2: f32,
    /// weight decay (default: 0)
    pub weight_decay: f32,
    /// use decoupled weight decay as in AdamW instead of L2 penalty (default: true)
    pub weight_decouple: bool,
    /// decoupled weight decay is not scaled by the learning rate (default: false)
    pub fixed_decay: bool,
    /// perform the rectified update similar to RAdam (default: false)
    pub rectify: bool,
    /// length of the approximated SMA from which the rectified update is used (default: 5)
    pub n_sma_threshold: u32,
    /// perform momentum SGD update while the rectification term is not available (default: true)
    pub degenerated_to_sgd: bool,
    /// whether to use the AMSBound variant, the denominator never decreases (default: false)
    pub ams_bound: bool,
    /// EMA factor of the gradient norm, between 0.9 and 0.99 is preferred (default: 0.95)
    pub r: f32,
    /// whether to use the AdaNorm variant (default: false)
    pub adanorm: bool,
    /// only correct the denominator to avoid inflating step sizes early in training (default: false)
    pub adam_debias: bool,
    /// term added to the variance every step and to the denominator (default: 1e-16)
    pub eps: f32,
    /// zero updates where momentum and gradient disagree in sign (default: false)
    pub cautious: bool,
}

impl Default for AdaBeliefConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            weight_decay: 0.0,
            weight_decouple: true,
            fixed_decay: false,
            rectify: false,
            n_sma_threshold: 5,
            degenerated_to_sgd: true,
            ams_bound: false,
            r: 0.95,
            adanorm: false,
            adam_debias: false,
            eps: 1e-16,
            cautious: false,
        }
    }
}

impl AdaBeliefConfig {
    /// Check that all hyperparameters are in their valid ranges.
    /// NaNs are rejected everywhere.
    pub fn validate(&self) -> Result<(), BeliefError> {
        if !(self.lr >= 0.) {
            return Err(BeliefError::invalid_config(format!(
                "learning rate must be >= 0, got {}",
                self.lr
            )));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0. ..1.).contains(&beta) {
                return Err(BeliefError::invalid_config(format!(
                    "{name} must be in [0, 1), got {beta}"
                )));
            }
        }
        if !(self.weight_decay >= 0.) {
            return Err(BeliefError::invalid_config(format!(
                "weight_decay must be >= 0, got {}",
                self.weight_decay
            )));
        }
        // eps is the only floor of the denominator
        if !(self.eps > 0.) {
            return Err(BeliefError::invalid_config(format!(
                "eps must be > 0, got {}",
                self.eps
            )));
        }
        if self.adanorm && !(0. ..=1.).contains(&self.r) {
            return Err(BeliefError::invalid_config(format!(
                "r must be in [0, 1], got {}",
                self.r
            )));
        }
        // Rectification term contains sqrt(n_sma - 4)
        if self.rectify && self.n_sma_threshold <= 4 {
            return Err(BeliefError::invalid_config(format!(
                "n_sma_threshold must be > 4, got {}",
                self.n_sma_threshold
            )));
        }
        Ok(())
    }

    /// Parse and validate config from JSON. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> Result<AdaBeliefConfig, BeliefError> {
        AdaBeliefConfig::default().merge_json(json)
    }

    /// Overwrite the fields present in JSON, keep the rest, then validate.
    /// Used when a form posts only the fields that changed.
    pub fn merge_json(&self, json: &str) -> Result<AdaBeliefConfig, BeliefError> {
        let patch = ConfigPatch::deserialize_json(json)
            .map_err(|e| BeliefError::invalid_config(format!("could not parse config: {e}")))?;
        let mut config = *self;
        patch.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Serialize config into JSON
    #[must_use]
    pub fn to_json(&self) -> String {
        self.serialize_json()
    }
}

macro_rules! config_patch {
    ($($field:ident: $ty:ident),* $(,)?) => {
        // Every field optional, absent keys deserialize to None
        #[derive(DeJson)]
        struct ConfigPatch {
            $($field: Option<$ty>,)*
        }

        impl ConfigPatch {
            fn apply(self, config: &mut AdaBeliefConfig) {
                $(if let Some(x) = self.$field {
                    config.$field = x;
                })*
            }
        }
    };
}

config_patch! {
    lr: f32,
    beta1: f32,
    beta2: f32,
    weight_decay: f32,
    weight_decouple: bool,
    fixed_decay: bool,
    rectify: bool,
    n_sma_threshold: u32,
    degenerated_to_sgd: bool,
    ams_bound: bool,
    r: f32,
    adanorm: bool,
    adam_debias: bool,
    eps: f32,
    cautious: bool,
}
