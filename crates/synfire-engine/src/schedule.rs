// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Time schedules
//!
//! A schedule yields a sorted sequence of event times, addressed by half-open
//! windows `[t_from, t_to)` presented in non-decreasing order. Schedules are
//! restartable: `reset()` rewinds any internal state (the Poisson variant
//! re-seeds its RNG, so a reset run reproduces the same times).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use synfire_neural::TimeType;

/// A producer of sorted event times.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Times `t0 + n*dt` for integer `n >= 0`.
    Regular { t0: TimeType, dt: TimeType },
    /// An explicit sorted list of times.
    Explicit { times: Vec<TimeType> },
    /// A Poisson process with the given mean rate (events per unit time),
    /// deterministic for a fixed seed.
    Poisson {
        t0: TimeType,
        rate: TimeType,
        seed: u64,
        rng: StdRng,
        next: Option<TimeType>,
    },
}

impl Schedule {
    pub fn regular(t0: TimeType, dt: TimeType) -> Self {
        assert!(dt > 0.0 && dt.is_finite(), "regular schedule requires dt > 0");
        Self::Regular { t0, dt }
    }

    pub fn explicit(mut times: Vec<TimeType>) -> Self {
        times.sort_by(TimeType::total_cmp);
        Self::Explicit { times }
    }

    pub fn poisson(t0: TimeType, rate: TimeType, seed: u64) -> Self {
        assert!(rate > 0.0 && rate.is_finite(), "poisson schedule requires rate > 0");
        Self::Poisson {
            t0,
            rate,
            seed,
            rng: StdRng::seed_from_u64(seed),
            next: None,
        }
    }

    /// Event times in `[t_from, t_to)`, sorted ascending.
    ///
    /// Successive calls must use non-decreasing `t_from`; stateful variants
    /// discard times that fall behind the window.
    pub fn events(&mut self, t_from: TimeType, t_to: TimeType) -> Vec<TimeType> {
        match self {
            Self::Regular { t0, dt } => {
                let mut out = Vec::new();
                let mut n = if t_from <= *t0 {
                    0
                } else {
                    ((t_from - *t0) / *dt).ceil() as i64
                };
                // Guard against the ceil landing one step short under rounding.
                while *t0 + n as TimeType * *dt < t_from {
                    n += 1;
                }
                loop {
                    let t = *t0 + n as TimeType * *dt;
                    if t >= t_to {
                        break;
                    }
                    out.push(t);
                    n += 1;
                }
                out
            }
            Self::Explicit { times } => {
                let lo = times.partition_point(|&t| t < t_from);
                let hi = times.partition_point(|&t| t < t_to);
                times[lo..hi].to_vec()
            }
            Self::Poisson {
                t0,
                rate,
                rng,
                next,
                ..
            } => {
                let mut t = next.unwrap_or_else(|| *t0 + exp_gap(rng, *rate));
                let mut out = Vec::new();
                while t < t_to {
                    if t >= t_from {
                        out.push(t);
                    }
                    t += exp_gap(rng, *rate);
                }
                *next = Some(t);
                out
            }
        }
    }

    /// Rewind to the pre-run state.
    pub fn reset(&mut self) {
        if let Self::Poisson {
            seed, rng, next, ..
        } = self
        {
            *rng = StdRng::seed_from_u64(*seed);
            *next = None;
        }
    }
}

// Exponential inter-arrival gap by inverse CDF; gen() is in [0, 1) so the
// argument of ln stays in (0, 1].
fn exp_gap(rng: &mut StdRng, rate: TimeType) -> TimeType {
    let u: f64 = rng.gen();
    -(1.0 - u).ln() / rate
}
