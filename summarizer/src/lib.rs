pub mod errors;
pub mod handlers;
pub mod state;
pub mod upstream;
pub mod utils;
