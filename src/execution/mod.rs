// Order sizing and execution
pub mod sizer;
pub mod trader;

pub use sizer::{compute_bracket, SizerParams, SizingError};
pub use trader::Trader;
