pub mod driver;
pub mod handle;
pub mod process;
