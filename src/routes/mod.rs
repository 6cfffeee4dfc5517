pub mod health;
pub mod helius;
