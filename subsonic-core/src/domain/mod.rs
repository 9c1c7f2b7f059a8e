//! Domain types for the Subsonic scanner.

pub mod bar;
pub mod side;

pub use bar::Bar;
pub use side::Side;
