pub mod api;
pub mod cancel;
pub mod canvas;
pub mod cli;
pub mod compress;
pub mod config;
pub mod controller;
pub mod draft;
pub mod error;
pub mod scanner;
pub mod session;
pub mod wizard;
