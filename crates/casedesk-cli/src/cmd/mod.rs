pub mod check_config;
pub mod export;
pub mod serve;
pub mod verify_token;
