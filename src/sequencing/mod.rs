pub mod division;
pub mod meter;
pub mod tempo;

pub use division::Division;
pub use meter::{Beat, Meter};
pub use tempo::Tempo;
