pub mod export;
pub mod persist;
pub mod seed;
pub mod settings;
