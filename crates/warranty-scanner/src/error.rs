use thiserror::Error;
use warranty_client::ClientError;
use warranty_core::CoverageError;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("session token unavailable after {attempts} attempt(s), token issuance is rate limited")]
    TokenUnavailable { attempts: u32 },

    #[error("transport failed {failures} time(s) while looking up {identifier}: {source}")]
    TransportExhausted {
        identifier: String,
        failures: u32,
        #[source]
        source: ClientError,
    },

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("output error: {0}")]
    Sink(#[from] CoverageError),
}

pub type Result<T> = std::result::Result<T, LookupError>;
