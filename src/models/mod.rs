pub mod circuit_breaker;
pub mod error;
pub mod github;
pub mod health;
pub mod rates;
pub mod retry;
