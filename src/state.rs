use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    config::Config,
    store::{SurveyStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub surveys: Arc<dyn SurveyStore>,
    pub users: Arc<dyn UserStore>,
    pub config: Config,
    /// Random source for the question sampler. Only locked while sampling.
    pub rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// Seeds the sampler from `config.sampler_seed`, or from OS entropy when unset.
    pub fn new(surveys: Arc<dyn SurveyStore>, users: Arc<dyn UserStore>, config: Config) -> Self {
        let rng = match config.sampler_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            surveys,
            users,
            config,
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
