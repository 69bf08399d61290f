pub mod category;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logger;
pub mod normalize;
pub mod provider;
pub mod seeder;
pub mod sheet;
pub mod stock;
