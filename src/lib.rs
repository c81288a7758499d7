pub mod app;
pub mod article;
pub mod config;
pub mod runner;
pub mod search;
pub mod settings;
pub mod theme;
pub mod tui;

pub use app::AppContext;
