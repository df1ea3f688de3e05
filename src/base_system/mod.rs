pub mod album_id;
pub mod config;
pub mod context;
pub mod logging;
