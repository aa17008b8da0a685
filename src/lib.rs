pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod downloads;
pub mod error;
pub mod expenses;
pub mod mail;
pub mod password_reset;
pub mod premium;
pub mod purchase;
pub mod state;
pub mod storage;
pub mod test_utils;
