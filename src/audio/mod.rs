pub mod discovery;
pub mod tags;
pub mod tempo;
