pub mod client;
pub mod list;
pub mod serve;
