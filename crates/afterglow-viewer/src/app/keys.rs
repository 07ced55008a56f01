//! Keyboard bindings for the viewer.

use winit::keyboard::{Key, NamedKey};

use afterglow_config::EffectKind;

/// Radians per arrow-key press.
const ORBIT_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Action {
    /// Flip the effect at this position of the default order.
    ToggleEffect(EffectKind),
    Orbit(f32),
    /// Throw away accumulated samples and effect caches.
    Restart,
    Exit,
}

/// `1`-`6` toggle effects, arrows orbit, `r` restarts, Escape quits.
pub(super) fn action_for(key: &Key) -> Option<Action> {
    match key {
        Key::Named(NamedKey::Escape) => Some(Action::Exit),
        Key::Named(NamedKey::ArrowLeft) => Some(Action::Orbit(-ORBIT_STEP)),
        Key::Named(NamedKey::ArrowRight) => Some(Action::Orbit(ORBIT_STEP)),
        Key::Character(c) => match c.as_str() {
            "r" | "R" => Some(Action::Restart),
            digit => {
                let index = digit.parse::<usize>().ok()?.checked_sub(1)?;
                EffectKind::DEFAULT_ORDER
                    .get(index)
                    .map(|&kind| Action::ToggleEffect(kind))
            }
        },
        _ => None,
    }
}
