pub mod config;
pub mod directory;
pub mod discord;
pub mod document;
pub mod error;
pub mod images;
pub mod message;
pub mod reference;
pub mod style;
pub mod theme;
pub mod tokenizer;
pub mod transcript;
pub mod wrap;
pub mod xml;
