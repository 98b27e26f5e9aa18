//! Built-in recipe catalog
//!
//! One recipe per third-party library the downstream project links against.
//! Recipes read only the [`BuildEnvironment`] and the install paths of the
//! dependencies they declare.

pub mod crypto;
pub mod headers;
pub mod network;
pub mod support;
pub mod tools;

use crate::core::build_env::BuildEnvironment;
use crate::core::recipe::{Recipe, RecipeCatalog};
use crate::error::GraphError;

/// Every built-in recipe, constructed for `env`
pub fn builtin_catalog(env: &BuildEnvironment) -> Result<RecipeCatalog, GraphError> {
    let recipes: Vec<Box<dyn Recipe>> = vec![
        Box::new(crypto::OpenSsl),
        Box::new(network::Jansson),
        Box::new(network::Cjose),
        Box::new(network::ZeroMq::new(env)),
        Box::new(network::LibWebsockets),
        Box::new(network::Curl),
        Box::new(support::Sqlite),
        Box::new(crypto::Botan),
        Box::new(crypto::Mpir),
        Box::new(crypto::LibBtc),
        Box::new(support::Protobuf),
        Box::new(support::GTest::new(env)),
        Box::new(network::LibUv),
        Box::new(network::AmqpCpp),
        Box::new(crypto::LibChaCha20Poly1305),
        Box::new(support::LibQrEncode),
        Box::new(headers::spdlog()),
        Box::new(headers::nlohmann_json()),
        Box::new(headers::tomlplusplus()),
        Box::new(headers::args()),
        Box::new(headers::bips()),
        Box::new(headers::trezor_common()),
    ];

    let mut catalog = RecipeCatalog::new();
    for recipe in recipes {
        catalog.add(recipe)?;
    }
    Ok(catalog)
}
