pub mod adapter;
pub mod aspect_ratio;
pub mod compositor;
pub mod config;
pub mod fill_service;
pub mod gemini_client;
pub mod session;
pub mod source_image;
pub mod transport;
