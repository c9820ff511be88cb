#[macro_use]
mod macros;

pub mod energy;
pub mod money;
pub mod price;
mod zero;

pub use self::zero::Zero;
