//! Inbound payload decoding
//!
//! Turns raw payload bytes into a `DecodedRequest`. Malformed input
//! is isolated here: any parse or format error is logged and yields
//! the all-unset request, which the dispatcher routes to its default
//! branch.

use serde::Deserialize;

use crate::error::{RelayError, Result};
use crate::types::{Action, DecodedRequest};

/// Inbound JSON payload as clients send it
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InboundPayload {
    contract: Option<String>,
    address: Option<String>,
    action: Option<String>,
    encoded_function_call: Option<String>,
    token: Option<String>,
    gas_price: Option<String>,
}

/// Decode a raw payload; never fails
pub fn decode(raw: &[u8]) -> DecodedRequest {
    match try_decode(raw) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Couldn't parse incoming payload");
            DecodedRequest::default()
        }
    }
}

fn try_decode(raw: &[u8]) -> Result<DecodedRequest> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| RelayError::Decode(format!("payload is not utf-8: {}", e)))?;
    let inbound: InboundPayload = serde_json::from_str(text)?;

    let mut request = DecodedRequest {
        contract: inbound.contract,
        address: inbound.address,
        ..DecodedRequest::default()
    };

    match inbound.action.as_deref() {
        Some("transaction") => {
            let call = inbound.encoded_function_call.ok_or_else(|| {
                RelayError::Decode("transaction without encodedFunctionCall".to_string())
            })?;
            // "0x" + 4-byte selector = 10 chars; the rest is arguments.
            // Hex-only keeps the byte-index split on char boundaries.
            if !call.starts_with("0x")
                || call.len() < 10
                || !call.as_bytes()[2..].iter().all(u8::is_ascii_hexdigit)
            {
                return Err(RelayError::Decode(format!(
                    "malformed encoded call '{}'",
                    call
                )));
            }
            request.function_name = Some(call[..10].to_string());
            request.function_parameters = Some(format!("0x{}", &call[10..]));
            request.payload = Some(call);
            request.action = Some(Action::Transaction);
        }
        Some("availability") => {
            request.token = inbound.token;
            request.gas_price = inbound.gas_price;
            request.action = Some(Action::Availability);
        }
        Some(other) => {
            request.action = Some(Action::Other(other.to_string()));
        }
        None => {}
    }

    Ok(request)
}
