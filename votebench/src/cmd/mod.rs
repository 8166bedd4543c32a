pub mod mock;
pub mod run;
