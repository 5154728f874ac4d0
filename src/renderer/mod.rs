pub mod cell;
pub mod display;
pub mod processor;
pub mod quantizer;

pub use display::DisplayManager;
pub use display::DisplayMode;
