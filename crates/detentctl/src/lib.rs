pub mod client;
pub mod macros;
pub mod wire;
