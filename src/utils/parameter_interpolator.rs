//! Linear interpolation of parameters in rendering loops.

/// Ramps a value towards a target over a fixed number of samples.
///
/// The interpolator only holds the increment, the ramped value itself stays
/// with the caller so several ramps can run in the same loop without
/// borrowing issues.
#[derive(Debug, Default, Copy, Clone)]
pub struct ParameterInterpolator {
    increment: f32,
}

impl ParameterInterpolator {
    pub fn new(value: f32, new_value: f32, size: usize) -> Self {
        let mut interpolator = Self::default();
        interpolator.init(value, new_value, size);
        interpolator
    }

    pub fn init(&mut self, value: f32, new_value: f32, size: usize) {
        self.increment = if size == 0 {
            0.0
        } else {
            (new_value - value) / (size as f32)
        };
    }

    #[inline]
    pub fn increment(&self) -> f32 {
        self.increment
    }

    #[inline]
    pub fn update(&self, value: &mut f32) -> f32 {
        *value += self.increment;
        *value
    }
}
