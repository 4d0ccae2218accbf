pub mod fs;
pub mod paths;
