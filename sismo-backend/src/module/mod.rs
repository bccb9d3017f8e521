pub mod monitor;
pub mod push;
pub mod region;
pub mod scheduled;
pub mod sismo;
pub mod store;
