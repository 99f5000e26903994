//! Preset records as consumed from an external loader.
//!
//! Presets arrive already parsed (name, style tag, slider bounds); this
//! module only defines the in-memory shape. Loading and file-format
//! concerns live in the host.

use crate::id::PresetIndex;
use std::collections::HashMap;

/// A named numeric range on a preset. Bounds may be equal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slider {
    pub min: f32,
    pub max: f32,
}

impl Slider {
    /// A slider pinned to a single value.
    pub fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// A slider spanning `[min, max]`.
    pub fn range(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// Sliders of a preset, keyed by slider name (unique within the preset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliderSet {
    sliders: HashMap<String, Slider>,
}

impl SliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a slider, merging with any existing slider of the same name:
    /// a zero bound on the stored slider is replaced by a non-zero incoming
    /// bound, otherwise the stored bound wins. Loaders feed the same slider
    /// name twice when a preset specifies its small and big sizes
    /// separately.
    pub fn insert(&mut self, name: &str, slider: Slider) {
        match self.sliders.get_mut(name) {
            Some(current) => {
                if current.min == 0.0 && slider.min != 0.0 {
                    current.min = slider.min;
                }
                if current.max == 0.0 && slider.max != 0.0 {
                    current.max = slider.max;
                }
            }
            None => {
                self.sliders.insert(name.to_string(), slider);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Slider> {
        self.sliders.get(name)
    }

    pub fn len(&self) -> usize {
        self.sliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sliders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slider)> {
        self.sliders.iter().map(|(name, s)| (name.as_str(), s))
    }
}

/// A loaded preset. Immutable after load except for the lazy index
/// assignment performed by `PresetStore::assign_indexes`.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    /// Unique within the originating category; lookups are case-insensitive.
    pub name: String,
    /// Free-form style tag from the source file.
    pub style: String,
    pub sliders: SliderSet,
    /// Assigned lazily, stable for the lifetime of the save.
    pub index: Option<PresetIndex>,
}

impl Preset {
    pub fn new(name: &str, style: &str, sliders: SliderSet) -> Self {
        Self {
            name: name.to_string(),
            style: style.to_string(),
            sliders,
            index: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_fixed_pins_both_bounds() {
        let s = Slider::fixed(0.5);
        assert_eq!(s.min, 0.5);
        assert_eq!(s.max, 0.5);
    }

    #[test]
    fn insert_new_slider() {
        let mut set = SliderSet::new();
        set.insert("Waist", Slider::range(0.1, 0.4));
        assert_eq!(set.get("Waist"), Some(&Slider::range(0.1, 0.4)));
    }

    #[test]
    fn insert_merges_zero_bounds() {
        let mut set = SliderSet::new();
        // "small" size sets only the lower bound.
        set.insert("Hips", Slider::range(0.2, 0.0));
        // "big" size arrives later and fills in the upper bound.
        set.insert("Hips", Slider::range(0.0, 0.8));
        assert_eq!(set.get("Hips"), Some(&Slider::range(0.2, 0.8)));
    }

    #[test]
    fn insert_keeps_non_zero_bounds() {
        let mut set = SliderSet::new();
        set.insert("Arms", Slider::range(0.3, 0.6));
        set.insert("Arms", Slider::range(0.9, 0.9));
        // Both stored bounds were non-zero, so neither is replaced.
        assert_eq!(set.get("Arms"), Some(&Slider::range(0.3, 0.6)));
    }

    #[test]
    fn preset_starts_without_index() {
        let p = Preset::new("Aphrodite", "hourglass", SliderSet::new());
        assert!(p.index.is_none());
    }
}
