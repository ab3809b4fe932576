pub mod api;
pub mod app;
pub mod config;
pub mod creator;
pub mod export;
pub mod gallery;
pub mod images;
pub mod models;
pub mod pdf;
pub mod routes;
pub mod text;
pub mod viewer;
