pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod output;
pub mod owid;
pub mod store;
pub mod tui;
pub mod view;
pub mod worldbank;
