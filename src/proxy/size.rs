//! Output size tiers.

use std::fmt;

/// One of the four fixed output-resolution tiers a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeClass {
    Thumb,
    #[default]
    Medium,
    Large,
    Full,
}

impl SizeClass {
    /// Every tier, smallest first.
    pub const ALL: [SizeClass; 4] = [Self::Thumb, Self::Medium, Self::Large, Self::Full];

    /// Normalize untrusted input. Anything that is not a known tier after
    /// dropping non `a-z` characters becomes [`SizeClass::Medium`].
    pub fn normalize(raw: &str) -> Self {
        let cleaned: String = raw.chars().filter(|c| c.is_ascii_lowercase()).collect();
        Self::from_wire(&cleaned).unwrap_or_default()
    }

    /// Exact wire value lookup.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "t" => Some(Self::Thumb),
            "m" => Some(Self::Medium),
            "l" => Some(Self::Large),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    /// Value used in the `size_class` query parameter.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Thumb => "t",
            Self::Medium => "m",
            Self::Large => "l",
            Self::Full => "full",
        }
    }

    /// Longest side of the output bounding box, in pixels.
    pub fn max_dimension(self) -> u32 {
        match self {
            Self::Thumb => 150,
            Self::Medium => 306,
            Self::Large => 640,
            Self::Full => 1080,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_table() {
        let dims: Vec<u32> = SizeClass::ALL.iter().map(|s| s.max_dimension()).collect();
        assert_eq!(dims, vec![150, 306, 640, 1080]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(SizeClass::normalize("t"), SizeClass::Thumb);
        assert_eq!(SizeClass::normalize("full"), SizeClass::Full);
        assert_eq!(SizeClass::normalize("l1"), SizeClass::Large);
        assert_eq!(SizeClass::normalize("fu-ll"), SizeClass::Full);
        assert_eq!(SizeClass::normalize("M"), SizeClass::Medium);
        assert_eq!(SizeClass::normalize("huge"), SizeClass::Medium);
        assert_eq!(SizeClass::normalize(""), SizeClass::Medium);
    }

    #[test]
    fn test_wire_values_round_trip() {
        for size in SizeClass::ALL {
            assert_eq!(SizeClass::from_wire(size.as_wire()), Some(size));
        }
    }
}
