pub mod audit;
pub mod blacklist;
pub mod config;
pub mod export;
pub mod inspect;
pub mod rules;
