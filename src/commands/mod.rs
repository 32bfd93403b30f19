pub mod check;
pub mod count;
pub mod init;
pub mod models;
pub mod prune;
pub mod remaining;
