pub mod trading;
pub mod signal;
pub mod tick;

pub use trading::*;
pub use signal::*;
pub use tick::*;
