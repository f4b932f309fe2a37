pub mod machine;
pub mod stats;
