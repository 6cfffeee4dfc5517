pub mod asset;
pub mod rpc;

pub use asset::{Asset, Content, Metadata, Ownership, PriceInfo, TokenInfo};
pub use rpc::{ProxyRequest, ProxyResponse, RPC_REQUEST_ID, RpcRequest, RpcResponse};
