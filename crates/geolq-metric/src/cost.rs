//! Cost model - link quality aging and cost combination
//!
//! Pure numeric functions shared by both GPS variants. Every function is
//! total: out-of-range inputs are clamped and degenerate results map to the
//! broken sentinel instead of panicking.

use crate::{
    LINK_COST_BROKEN, LQ_PLUGIN_LC_MULTIPLIER, LQ_QUICKSTART_AGING, LQ_QUICKSTART_STEPS,
    MAX_PLAUSIBLE_SPEED, MINIMAL_USEFUL_LQ,
};

/// Integer routing cost, lower is better
pub type LinkCost = u32;

/// Aging phase of a link, derived from its quickstart counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingPhase {
    /// Fast aging; holds the number of outcomes already aged
    Quickstart(u16),
    /// Configured aging factor applies from now on
    Steady,
}

impl AgingPhase {
    /// Phase of a link whose quickstart counter is `quickstart`
    pub fn of(quickstart: u16) -> Self {
        if quickstart < LQ_QUICKSTART_STEPS {
            AgingPhase::Quickstart(quickstart)
        } else {
            AgingPhase::Steady
        }
    }
}

/// Aging factor for the next packet outcome.
///
/// During quickstart this returns [`LQ_QUICKSTART_AGING`] and advances the
/// counter; afterwards it returns `steady_alpha` and leaves the counter alone.
pub fn next_alpha(quickstart: &mut u16, steady_alpha: f32) -> f32 {
    match AgingPhase::of(*quickstart) {
        AgingPhase::Quickstart(n) => {
            *quickstart = n + 1;
            LQ_QUICKSTART_AGING
        }
        AgingPhase::Steady => steady_alpha,
    }
}

/// Exponential moving average of a link quality.
///
/// A lost packet only decays the value; a received one adds
/// `alpha * observed_ratio`.
pub fn age_lq(lq: f32, alpha: f32, lost: bool, observed_ratio: f32) -> f32 {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut lq = lq.clamp(0.0, 1.0) * (1.0 - alpha);
    if !lost {
        lq += alpha * observed_ratio.clamp(0.0, 1.0);
    }
    lq
}

/// One aging step: pick the factor for the current phase and apply it
pub fn age(
    lq: f32,
    quickstart: &mut u16,
    steady_alpha: f32,
    lost: bool,
    observed_ratio: f32,
) -> f32 {
    let alpha = next_alpha(quickstart, steady_alpha);
    age_lq(lq, alpha, lost, observed_ratio)
}

/// Combine both link directions and a multiplier into a routing cost.
///
/// `cost = 1 / (lq * nlq) * multiplier * 1024`, truncated. Links below
/// [`MINIMAL_USEFUL_LQ`] in either direction, and costs above the sentinel,
/// yield [`LINK_COST_BROKEN`]. Zero means "not measured" to the routing core
/// and is reported as 1.
pub fn combine_cost(lq: f32, nlq: f32, multiplier: f32) -> LinkCost {
    if !(lq >= MINIMAL_USEFUL_LQ) || !(nlq >= MINIMAL_USEFUL_LQ) {
        return LINK_COST_BROKEN;
    }

    let multiplier = if multiplier.is_nan() {
        f32::INFINITY
    } else {
        multiplier.max(0.0)
    };
    let raw = (1.0 / (lq * nlq)) * multiplier * LQ_PLUGIN_LC_MULTIPLIER as f32;
    if raw.is_nan() || raw >= (LINK_COST_BROKEN as f32 + 1.0) {
        return LINK_COST_BROKEN;
    }

    let cost = raw as LinkCost;
    if cost > LINK_COST_BROKEN {
        return LINK_COST_BROKEN;
    }
    if cost == 0 {
        return 1;
    }
    cost
}

/// Convert a cost back to the unscaled ETX value shown in diagnostics
pub fn cost_to_etx(cost: LinkCost) -> f32 {
    cost as f32 / LQ_PLUGIN_LC_MULTIPLIER as f32
}

/// Radial speed from a distance change over `elapsed_ms` milliseconds.
///
/// Speeds beyond [`MAX_PLAUSIBLE_SPEED`] in either direction are GPS noise and
/// count as zero, as does a zero interval.
pub fn instantaneous_speed(delta_distance: f32, elapsed_ms: u32) -> f32 {
    if elapsed_ms == 0 {
        return 0.0;
    }
    let speed = delta_distance * 1000.0 / elapsed_ms as f32;
    if speed.is_nan() || !(-MAX_PLAUSIBLE_SPEED..=MAX_PLAUSIBLE_SPEED).contains(&speed) {
        0.0
    } else {
        speed
    }
}

/// Exponential smoothing of the radial speed
pub fn smooth_speed(previous: f32, instantaneous: f32, gamma: f32) -> f32 {
    let gamma = gamma.clamp(0.0, 1.0);
    previous * (1.0 - gamma) + gamma * instantaneous
}

/// Lite motion multiplier: `exp(speed * beta)`
pub fn speed_multiplier(speed: f32, beta: f32) -> f32 {
    (speed * beta).exp()
}

/// Pud distance multiplier: `alpha * exp(delta_distance / delta_time * beta)`
pub fn distance_multiplier(alpha: f32, delta_distance: f32, delta_time: f32, beta: f32) -> f32 {
    if !(delta_time > 0.0) {
        return alpha;
    }
    alpha * (delta_distance / delta_time * beta).exp()
}
