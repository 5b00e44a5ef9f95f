mod errors;
mod http;
mod types;

pub use errors::GatewayError;
pub use http::{CloudGateway, HttpCloudGateway};
pub use types::{Factor, ModelDescriptor, RemoteVerifyDecision, RemoteVerifyRequest};
