pub mod core;
pub mod permissions;
pub mod sandbox;
pub mod tools;

// Optional components
pub mod cli;
pub mod logging;
