pub mod api;
pub mod capture;
pub mod catalog;
pub mod city;
pub mod config;
pub mod detector;
pub mod device;
pub mod exploration;
pub mod explored;
pub mod runner;
pub mod screen;
pub mod state;
pub mod ui_config;
