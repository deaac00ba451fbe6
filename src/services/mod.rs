pub mod history;
pub mod spotify;
pub mod sync;
