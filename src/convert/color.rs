use crate::{
    document::descriptor::Descriptor,
    foundation::core::Rgba,
    foundation::math::clamp01,
};

/// Color as stored in a Photoshop color descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PsdColor {
    /// `RGBC` with `Rd  `/`Grn `/`Bl  ` channels in `0..=255`.
    RgbByte {
        /// Red.
        r: f64,
        /// Green.
        g: f64,
        /// Blue.
        b: f64,
    },
    /// `RGBC` with `redFloat`/`greenFloat`/`blueFloat` channels in `[0, 1]`.
    RgbFloat {
        /// Red.
        r: f64,
        /// Green.
        g: f64,
        /// Blue.
        b: f64,
    },
    /// `CMYC` with percentages in `0..=100`.
    Cmyk {
        /// Cyan.
        c: f64,
        /// Magenta.
        m: f64,
        /// Yellow.
        y: f64,
        /// Black.
        k: f64,
    },
    /// `Grsc` with a gray percentage in `0..=100` (100 is black).
    Gray(f64),
}

impl PsdColor {
    /// Recognize a color descriptor by its channel keys.
    pub fn from_descriptor(desc: &Descriptor) -> Option<Self> {
        if let (Some(r), Some(g), Some(b)) = (
            desc.number("redFloat"),
            desc.number("greenFloat"),
            desc.number("blueFloat"),
        ) {
            return Some(Self::RgbFloat { r, g, b });
        }
        if let (Some(r), Some(g), Some(b)) =
            (desc.number("Rd  "), desc.number("Grn "), desc.number("Bl  "))
        {
            return Some(Self::RgbByte { r, g, b });
        }
        if let (Some(c), Some(m), Some(y), Some(k)) = (
            desc.number("Cyn "),
            desc.number("Mgnt"),
            desc.number("Ylw "),
            desc.number("Blck"),
        ) {
            return Some(Self::Cmyk { c, m, y, k });
        }
        desc.number("Gry ").map(Self::Gray)
    }

    /// Normalize to an opaque color with channels clamped to `[0, 1]`.
    pub fn to_rgba(self) -> Rgba {
        match self {
            Self::RgbByte { r, g, b } => Rgba::opaque(r / 255.0, g / 255.0, b / 255.0),
            Self::RgbFloat { r, g, b } => Rgba::opaque(clamp01(r), clamp01(g), clamp01(b)),
            Self::Cmyk { c, m, y, k } => {
                let k = clamp01(k / 100.0);
                let ch = |v: f64| (1.0 - clamp01(v / 100.0)) * (1.0 - k);
                Rgba::opaque(ch(c), ch(m), ch(y))
            }
            Self::Gray(v) => {
                let l = 1.0 - clamp01(v / 100.0);
                Rgba::opaque(l, l, l)
            }
        }
    }
}

/// Normalize a color descriptor, or `None` when the color model is not recognized.
pub fn normalize_color(desc: &Descriptor) -> Option<Rgba> {
    PsdColor::from_descriptor(desc).map(PsdColor::to_rgba)
}

/// Normalize the color stored under `key` (usually `Clr `) of a content descriptor.
pub fn nested_color(desc: &Descriptor, key: &str) -> Option<Rgba> {
    desc.object(key).and_then(normalize_color)
}

#[cfg(test)]
#[path = "../../tests/unit/convert/color.rs"]
mod tests;
