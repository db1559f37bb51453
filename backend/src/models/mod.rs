pub mod incident;
pub mod time;
pub mod views;

pub use incident::*;
pub use time::*;
pub use views::*;
