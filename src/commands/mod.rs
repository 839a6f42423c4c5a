pub mod grid;
pub mod run;
