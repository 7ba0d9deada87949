pub mod color;
mod component;
mod error;
mod interrupt;
pub mod ppu;

pub use color::{Color, ColorBuffer, CorrectionMode, ShadeTheme};
pub use component::{Address, Addressable, DmaByteSource, TCycles};
pub use error::{Error, Result};
pub use interrupt::{Interrupt, InterruptRegs};
pub use ppu::{HardwareGeneration, Ppu};
