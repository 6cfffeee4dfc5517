mod handler;
mod model;

pub use handler::{get_assets, get_block_height, rpc_proxy};
pub use model::AssetsQuery;
