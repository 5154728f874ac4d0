/// Maps luma to the gray entries of the ANSI 256-color palette.
///
/// The usable grays are 16 (black), the 24-step ramp 232-255 and 231 (white).
use std::sync::OnceLock;

static GRAY_LUT: OnceLock<[u8; 256]> = OnceLock::new();

pub struct GrayQuantizer;

impl GrayQuantizer {
    /// Nearest palette index for a luma value.
    pub fn quantize(luma: u8) -> u8 {
        GRAY_LUT.get_or_init(Self::build_lut)[luma as usize]
    }

    fn build_lut() -> [u8; 256] {
        let mut candidates = vec![(16u8, 0u8), (231, 255)];
        candidates.extend((232..=255u8).map(|index| (index, Self::gray_level(index))));

        let mut lut = [0u8; 256];
        for (luma, slot) in lut.iter_mut().enumerate() {
            let (index, _) = candidates
                .iter()
                .min_by_key(|(_, level)| (*level as i16 - luma as i16).abs())
                .copied()
                .unwrap_or((16, 0));
            *slot = index;
        }
        lut
    }

    /// Brightness of a gray palette index.
    pub fn gray_level(index: u8) -> u8 {
        match index {
            16 => 0,
            231 => 255,
            232..=255 => 8 + (index - 232) * 10,
            _ => 0,
        }
    }
}
