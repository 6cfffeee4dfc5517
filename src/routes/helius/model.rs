use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AssetsQuery {
    pub owner: Option<String>,
}
