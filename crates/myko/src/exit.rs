//! Process exit codes for failure classes.

use myko_client::Error;
use myko_config::ConfigError;

pub const FAILURE: u8 = 1;
pub const AUTH: u8 = 3;
pub const CONNECTION: u8 = 4;
pub const HTTP_STATUS: u8 = 5;
pub const MALFORMED: u8 = 6;
pub const RETRIES_EXHAUSTED: u8 = 7;
pub const CONFIG: u8 = 8;
pub const TIMEOUT: u8 = 124;

/// Map an error to an exit code by the first recognized cause in its chain.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<Error>() {
            return client_exit_code(e);
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return CONFIG;
        }
    }
    FAILURE
}

fn client_exit_code(err: &Error) -> u8 {
    match err {
        Error::Auth(_) => AUTH,
        Error::HttpStatus {
            status: 401 | 403, ..
        } => AUTH,
        Error::HttpStatus { .. } => HTTP_STATUS,
        Error::Connection(_) | Error::Tls(_) => CONNECTION,
        Error::Timeout(_) => TIMEOUT,
        Error::MalformedResponse(_) => MALFORMED,
        Error::RetriesExhausted { last, .. } => match **last {
            Error::Connection(_) | Error::Tls(_) => CONNECTION,
            Error::Timeout(_) => TIMEOUT,
            _ => RETRIES_EXHAUSTED,
        },
        Error::Config(_) | Error::InvalidUrl(_) => CONFIG,
        Error::SessionClosed | Error::Http(_) => FAILURE,
    }
}
