pub mod compose;
pub mod levels;
pub mod power;
