mod helius;

pub use helius::HeliusClient;
