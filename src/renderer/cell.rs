/// One terminal character cell showing two vertically stacked pixels.
///
/// `top` is drawn as the foreground of `▀`, `bottom` as its background.
/// Both are luma samples.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CellData {
    pub top: u8,
    pub bottom: u8,
}

impl CellData {
    pub const GLYPH: char = '▀';

    /// Average brightness, used by the ASCII mode.
    pub fn brightness(&self) -> u8 {
        ((self.top as u16 + self.bottom as u16) / 2) as u8
    }
}
