pub mod aviz;
pub mod state;
