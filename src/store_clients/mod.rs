pub mod filesystem;
pub mod memory;
pub mod quicktime;
