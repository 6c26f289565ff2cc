pub mod circuit_breaker;
pub mod github;
pub mod health;
pub mod rates;
pub mod resilient;
pub mod transport;
