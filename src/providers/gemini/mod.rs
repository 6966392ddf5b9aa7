//! Gemini Provider Module
//!
//! Implements `GenerativeModel` against the Generative Language REST API:
//! `generateContent` for multimodal and text calls, `predict` for Imagen
//! thumbnails.

mod client;
mod mapper;
mod models;

pub use client::GeminiProvider;
