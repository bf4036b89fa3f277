pub mod command;
pub mod fastx;
pub mod file;
pub mod streams;
pub mod system;
