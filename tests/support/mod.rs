#![allow(dead_code)]

pub mod architecture;
pub mod engine;
pub mod temp_db;
