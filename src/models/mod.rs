pub mod filter;
pub mod period;
pub mod rows;

pub use filter::*;
pub use period::*;
pub use rows::*;
