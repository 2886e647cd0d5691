//! Helper functions to build Ethereum [providers](https://docs.rs/alloy/latest/alloy/providers/trait.Provider.html)

use alloy::{
    network::Ethereum,
    providers::{
        ProviderBuilder, RootProvider, fillers::FillProvider, utils::JoinedRecommendedFillers,
    },
    transports::http::reqwest::Url,
};

use crate::rpc::NodeClient;

/// Provider connected to blockchain URL.
///
/// Transactions are signed by the node's own unlocked accounts, so no wallet
/// filler is attached.
pub type HttpProvider = FillProvider<JoinedRecommendedFillers, RootProvider, Ethereum>;

pub fn build_provider(url: Url) -> HttpProvider {
    ProviderBuilder::new().connect_http(url)
}

/// a handy thin wrapper returning an [`RpcClient`](crate::rpc::RpcClient) over HTTP
pub fn connect_http(url: Url) -> NodeClient<HttpProvider> {
    tracing::debug!(%url, "connecting to node");
    NodeClient::new(build_provider(url))
}
