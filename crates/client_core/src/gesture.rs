//! Drag offset to card visuals and swipe decisions.
//!
//! Everything here is a pure function of the horizontal drag offset so the
//! decision threshold can be exercised without a renderer.

use shared::domain::Decision;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub screen_width: f32,
    /// Minimum horizontal travel before a drag is claimed by the card.
    pub claim_threshold: f32,
    /// Release travel that must be exceeded to record a decision.
    pub decision_threshold: f32,
    /// Offset at which rotation and stamp opacity saturate.
    pub clamp_distance: f32,
    pub max_rotation_deg: f32,
    pub next_card_min_scale: f32,
    /// Extra travel past the screen edge for the fly-out animation.
    pub fly_out_margin: f32,
}

impl GestureConfig {
    pub fn for_screen_width(screen_width: f32) -> Self {
        Self {
            screen_width,
            claim_threshold: 5.0,
            decision_threshold: 100.0,
            clamp_distance: screen_width / 2.0,
            max_rotation_deg: 10.0,
            next_card_min_scale: 0.8,
            fly_out_margin: 100.0,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::for_screen_width(crate::config::DEFAULT_SCREEN_WIDTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardVisuals {
    pub translate_x: f32,
    pub rotation_deg: f32,
    /// "YES" stamp, visible while dragging right.
    pub accept_opacity: f32,
    /// "NO" stamp, visible while dragging left.
    pub reject_opacity: f32,
    pub next_card_scale: f32,
    pub next_card_opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAction {
    SpringBack,
    Decide(Decision),
}

/// Whether a move belongs to the card rather than to vertical scrolling.
pub fn claims_drag(config: &GestureConfig, dx: f32, dy: f32) -> bool {
    dx.abs() > config.claim_threshold && dx.abs() > dy.abs()
}

/// Signed progress toward the clamp bound, in `[-1, 1]`.
fn progress(config: &GestureConfig, offset_x: f32) -> f32 {
    if !offset_x.is_finite() || config.clamp_distance <= 0.0 {
        return 0.0;
    }
    (offset_x / config.clamp_distance).clamp(-1.0, 1.0)
}

pub fn card_visuals(config: &GestureConfig, offset_x: f32) -> CardVisuals {
    let p = progress(config, offset_x);
    let magnitude = p.abs();
    CardVisuals {
        translate_x: if offset_x.is_finite() { offset_x } else { 0.0 },
        rotation_deg: p * config.max_rotation_deg,
        accept_opacity: p.max(0.0),
        reject_opacity: (-p).max(0.0),
        next_card_scale: config.next_card_min_scale
            + (1.0 - config.next_card_min_scale) * magnitude,
        next_card_opacity: magnitude,
    }
}

pub fn resolve_release(config: &GestureConfig, dx: f32) -> ReleaseAction {
    if dx > config.decision_threshold {
        ReleaseAction::Decide(Decision::Like)
    } else if dx < -config.decision_threshold {
        ReleaseAction::Decide(Decision::Dislike)
    } else {
        ReleaseAction::SpringBack
    }
}

/// Offset the card animates to when it leaves the screen.
pub fn fly_out_offset(config: &GestureConfig, decision: Decision) -> f32 {
    let distance = config.screen_width + config.fly_out_margin;
    match decision {
        Decision::Like => distance,
        Decision::Dislike => -distance,
    }
}

/// Transient drag state of the top card.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    offset_x: f32,
    claimed: bool,
}

impl DragState {
    /// Feeds a cumulative move; returns whether the drag is (now) claimed.
    ///
    /// Once claimed, the card follows the horizontal offset until release.
    pub fn on_move(&mut self, config: &GestureConfig, dx: f32, dy: f32) -> bool {
        if !self.claimed && claims_drag(config, dx, dy) {
            self.claimed = true;
        }
        if self.claimed {
            self.offset_x = dx;
        }
        self.claimed
    }

    pub fn offset_x(&self) -> f32 {
        self.offset_x
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
