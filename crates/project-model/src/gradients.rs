//! Built-in background gradient presets.
//!
//! Unit points use the pixel convention: `(0, 0)` top-left, `(1, 1)`
//! bottom-right.

use crate::style::RgbaColor;

/// A normalized anchor inside a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPoint {
    pub x: f64,
    pub y: f64,
}

impl UnitPoint {
    pub const TOP_LEADING: UnitPoint = UnitPoint { x: 0.0, y: 0.0 };
    pub const TOP: UnitPoint = UnitPoint { x: 0.5, y: 0.0 };
    pub const TOP_TRAILING: UnitPoint = UnitPoint { x: 1.0, y: 0.0 };
    pub const LEADING: UnitPoint = UnitPoint { x: 0.0, y: 0.5 };
    pub const CENTER: UnitPoint = UnitPoint { x: 0.5, y: 0.5 };
    pub const TRAILING: UnitPoint = UnitPoint { x: 1.0, y: 0.5 };
    pub const BOTTOM_LEADING: UnitPoint = UnitPoint { x: 0.0, y: 1.0 };
    pub const BOTTOM: UnitPoint = UnitPoint { x: 0.5, y: 1.0 };
    pub const BOTTOM_TRAILING: UnitPoint = UnitPoint { x: 1.0, y: 1.0 };
}

/// A named multi-stop linear gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientPreset {
    pub id: u32,
    pub name: &'static str,
    /// Evenly spaced colour stops as `0xRRGGBB`.
    pub stops: &'static [u32],
    pub start: UnitPoint,
    pub end: UnitPoint,
}

impl GradientPreset {
    pub fn colors(&self) -> Vec<RgbaColor> {
        self.stops.iter().map(|hex| RgbaColor::from_hex(*hex)).collect()
    }

    /// Look up a preset by id.
    pub fn by_id(id: u32) -> Option<&'static GradientPreset> {
        GRADIENT_PRESETS.iter().find(|p| p.id == id)
    }
}

const fn preset(
    id: u32,
    name: &'static str,
    stops: &'static [u32],
    start: UnitPoint,
    end: UnitPoint,
) -> GradientPreset {
    GradientPreset {
        id,
        name,
        stops,
        start,
        end,
    }
}

pub static GRADIENT_PRESETS: &[GradientPreset] = &[
    preset(0, "Hyper", &[0xEC4899, 0xEF4444, 0xEAB308], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(1, "Oceanic", &[0x86EFAC, 0x3B82F6, 0x9333EA], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(2, "Cotton Candy", &[0xF9A8D4, 0xD8B4FE, 0x818CF8], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(3, "Gotham", &[0x374151, 0x111827, 0x000000], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(4, "Sunset", &[0xC7D2FE, 0xFECACA, 0xFEF9C3], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(5, "Mojave", &[0xFEF9C3, 0xFDE047, 0xEAB308], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(6, "Beachside", &[0xFEF08A, 0xBBF7D0, 0x22C55E], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(7, "Gunmetal", &[0xE5E7EB, 0x9CA3AF, 0x4B5563], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(8, "Peachy", &[0xFECACA, 0xFCA5A5, 0xFEF08A], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(9, "Seafoam", &[0xBBF7D0, 0x86EFAC, 0x3B82F6], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(10, "Pumpkin", &[0xFEF08A, 0xFACC15, 0xA16207], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(11, "Pandora", &[0xBBF7D0, 0x4ADE80, 0x7E22CE], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(12, "Valentine", &[0xFECACA, 0xDC2626], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(13, "Hawaii", &[0x86EFAC, 0xFDE047, 0xF9A8D4], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(14, "Lavender", &[0xA5B4FC, 0xC084FC], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(15, "Wintergreen", &[0xBBF7D0, 0x22C55E], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(16, "Huckleberry", &[0xE9D5FF, 0xC084FC, 0x6B21A8], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(17, "Blue Steel", &[0x9CA3AF, 0x4B5563, 0x1E40AF], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(18, "Arendelle", &[0xDBEAFE, 0x93C5FD, 0x3B82F6], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(19, "Spearmint", &[0xBBF7D0, 0x4ADE80, 0x22C55E], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(20, "Minnesota", &[0xC084FC, 0xFACC15], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(21, "Bombpop", &[0xF87171, 0xD1D5DB, 0x3B82F6], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(22, "Acadia", &[0x991B1B, 0xCA8A04, 0xEAB308], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(23, "Sonora", &[0xFEF08A, 0xEAB308], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(24, "Paradise", &[0x93C5FD, 0xBBF7D0, 0xFDE047], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(25, "Sierra Mist", &[0xFEF08A, 0xBBF7D0, 0x86EFAC], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(26, "Creamsicle", &[0xFEF08A, 0xFDE047, 0xFACC15], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(27, "Midnight", &[0x1D4ED8, 0x1E40AF, 0x111827], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(28, "Borealis", &[0x86EFAC, 0xC084FC], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(29, "Strawberry", &[0xFEF08A, 0xFBCFE8, 0xF472B6], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(30, "Flamingo", &[0xF472B6, 0xDB2777], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(31, "Burning Sunrise", &[0xCA8A04, 0xDC2626], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(32, "Apple", &[0x22C55E, 0x15803D], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(33, "Watermelon", &[0xEF4444, 0x22C55E], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(34, "Flare", &[0xEA580C, 0xF97316], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(35, "Rasta", &[0x65A30D, 0xFDE047, 0xDC2626], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(36, "Lust", &[0xBE123C, 0xDB2777], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(37, "Sublime", &[0xFB7185, 0xD946EF, 0x6366F1], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(38, "Witch", &[0x0F172A, 0x581C87, 0x0F172A], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(39, "Powerpuff", &[0x38BDF8, 0xFB7185, 0xA3E635], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(40, "Solid Blue", &[0x3B82F6, 0x2563EB], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(41, "Ice", &[0xFFE4E6, 0xCCFBF1], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(42, "Sky", &[0x38BDF8, 0xBAE6FD], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(43, "Horizon", &[0xF97316, 0xFDE047], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(44, "Morning", &[0xFB7185, 0xFDBA74], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(45, "Space", &[0x111827, 0x4B5563], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(46, "Earth", &[0x99F6E4, 0xD9F99D], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(47, "Picture", &[0xD946EF, 0xDC2626, 0xFB923C], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(48, "Messenger", &[0x38BDF8, 0x3B82F6], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(49, "Sea", &[0xA5F3FC, 0x22D3EE], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(50, "Payment", &[0x38BDF8, 0x67E8F9], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(51, "Video", &[0xEF4444, 0x991B1B], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(52, "Passion", &[0xF43F5E, 0xF87171, 0xEF4444], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(53, "Flower", &[0xC4B5FD, 0xA78BFA], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(54, "Cool Sunset", &[0xFDBA74, 0xFDA4AF], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(55, "Pink Neon", &[0xC026D3, 0xDB2777], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(56, "Blue Sand", &[0x64748B, 0xFEF9C3], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(57, "Emerald", &[0x10B981, 0x65A30D], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(58, "Relaxed Rose", &[0xFDA4AF, 0xF43F5E], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(59, "Purple Haze", &[0x6B21A8, 0x4C1D95, 0x6B21A8], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(60, "Silver", &[0xF3F4F6, 0xD1D5DB], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(61, "Orange Coral", &[0xFB923C, 0xFB7185], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(62, "Blue Coral", &[0x60A5FA, 0x34D399], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(63, "Beam of Light", &[0x111827, 0xF3F4F6, 0x111827], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(64, "Safari Sunset", &[0xEAB308, 0xA855F7, 0x3B82F6], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(65, "High Tide", &[0x0EA5E9, 0xFED7AA, 0xCA8A04], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(66, "Hunniepop", &[0xF0ABFC, 0x4ADE80, 0xBE123C], UnitPoint::BOTTOM_LEADING, UnitPoint::TOP_TRAILING),
    preset(67, "Soft Metal", &[0xC7D2FE, 0x475569, 0xC7D2FE], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(68, "Coral Sun", &[0xFEF08A, 0xA7F3D0, 0xFEF08A], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(69, "Power Pink", &[0xF43F5E, 0x4338CA], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(70, "Powder Blue", &[0x38BDF8, 0x1E40AF], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(71, "Moody Sunset", &[0x881337, 0x92400E, 0xFB7185], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(72, "Burnt Sand", &[0xFEF08A, 0xEF4444, 0xD946EF], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(73, "Blue White Split", &[0xFFFFFF, 0x0EA5E9, 0x0EA5E9], UnitPoint::BOTTOM, UnitPoint::TOP),
    preset(74, "Purple Beam", &[0x312E81, 0x818CF8, 0x312E81], UnitPoint::TOP_TRAILING, UnitPoint::BOTTOM_LEADING),
    preset(75, "Sand Beam", &[0x7C2D12, 0xFEF3C7, 0x7C2D12], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(76, "Island Waves", &[0xFACC15, 0xF9FAFB, 0x5EEAD4], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(77, "Big Sur", &[0x8B5CF6, 0xFDBA74], UnitPoint::BOTTOM_LEADING, UnitPoint::TOP_TRAILING),
    preset(78, "Oahu", &[0xFB923C, 0x38BDF8], UnitPoint::BOTTOM, UnitPoint::TOP),
    preset(79, "Peach Pie", &[0x7F1D1D, 0xDDD6FE, 0xF97316], UnitPoint::LEADING, UnitPoint::TRAILING),
    preset(80, "Salem", &[0x111827, 0x581C87, 0x7C3AED], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(81, "Purple Burst", &[0x581C87, 0x6366F1], UnitPoint::TOP_LEADING, UnitPoint::BOTTOM_TRAILING),
    preset(82, "Amber Sunrise", &[0x78350F, 0xFDE047], UnitPoint::BOTTOM, UnitPoint::TOP),
    preset(83, "Sky Sea", &[0x38BDF8, 0x312E81], UnitPoint::TRAILING, UnitPoint::LEADING),
    preset(84, "Rocket Power", &[0xB45309, 0xFDBA74, 0x9F1239], UnitPoint::TOP, UnitPoint::BOTTOM),
    preset(85, "Blue Flame", &[0xFDE68A, 0x7C3AED, 0x0C4A6E], UnitPoint::BOTTOM, UnitPoint::TOP),
    preset(86, "Warm Glow", &[0xD1D5DB, 0xC026D3, 0xEA580C], UnitPoint::TOP, UnitPoint::BOTTOM),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_ids_unique() {
        let mut ids: Vec<u32> = GRADIENT_PRESETS.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), GRADIENT_PRESETS.len());
    }

    #[test]
    fn test_lookup_hyper() {
        let hyper = GradientPreset::by_id(0).unwrap();
        assert_eq!(hyper.name, "Hyper");
        assert_eq!(hyper.stops, &[0xEC4899, 0xEF4444, 0xEAB308]);
        assert_eq!(hyper.start, UnitPoint::LEADING);
        assert!(GradientPreset::by_id(9999).is_none());
    }

    #[test]
    fn test_every_preset_has_stops() {
        assert!(GRADIENT_PRESETS.iter().all(|p| p.stops.len() >= 2));
    }
}
