use crate::domain::errors::{FetchError, ObservationError};
use crate::domain::market::Observation;
use crate::domain::ports::ObservationSource;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::sync::Mutex;
use tracing::debug;

/// Random-walk generator standing in for a live quote feed.
///
/// The auxiliary signals wander on their own and the tracked price is a
/// linear function of them plus noise, so a fitted model has something real
/// to find.
pub struct SimulatedSource {
    state: Mutex<WalkState>,
    noise_pct: f64,
}

#[derive(Debug, Clone)]
struct WalkState {
    usd_try: f64,
    sentiment: f64,
}

impl SimulatedSource {
    pub fn new(usd_try: f64, noise_pct: f64) -> Self {
        Self {
            state: Mutex::new(WalkState {
                usd_try,
                sentiment: 0.0,
            }),
            noise_pct,
        }
    }

    fn price_for(usd_try: f64, sentiment: f64) -> f64 {
        1_500.0 + 28.0 * usd_try + 40.0 * sentiment
    }

    fn step(&self) -> Result<(f64, Vec<f64>), FetchError> {
        let mut rng = rand::rng();
        let mut state = self.state.lock().map_err(|e| FetchError::Unavailable {
            source_name: self.name().to_string(),
            reason: e.to_string(),
        })?;

        // -0.25% to +0.25% per step
        state.usd_try *= 1.0 + rng.random_range(-0.0025..=0.0025);
        state.sentiment = (state.sentiment + rng.random_range(-0.1..=0.1)).clamp(-1.0, 1.0);

        let noise = rng.random_range(-self.noise_pct..=self.noise_pct);
        let price = Self::price_for(state.usd_try, state.sentiment) * (1.0 + noise);
        Ok((price, vec![state.usd_try, state.sentiment]))
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(32.0, 0.002)
    }
}

#[async_trait]
impl ObservationSource for SimulatedSource {
    async fn fetch(&self) -> Result<Observation, FetchError> {
        let (price, auxiliary) = self.step()?;
        debug!("SimulatedSource: price={:.2} aux={:?}", price, auxiliary);

        Observation::new(Utc::now(), price, auxiliary).map_err(|e: ObservationError| {
            FetchError::Malformed {
                source_name: self.name().to_string(),
                reason: e.to_string(),
            }
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }

    fn auxiliary_arity(&self) -> Option<usize> {
        Some(2)
    }
}
