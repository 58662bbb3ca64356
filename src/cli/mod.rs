pub mod command;
pub mod info;
