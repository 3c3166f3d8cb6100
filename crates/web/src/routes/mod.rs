pub mod bootparameters;
pub mod bootscript;
pub mod docs;
pub mod dumpstate;
pub mod health;
pub mod hosts;
