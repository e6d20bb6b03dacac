//! Hex Address Codec Adapter
//!
//! Implements `AddressCodec` for 20-byte hex addresses with an optional
//! network prefix.

use shared_types::Address;

use crate::domain::DecodeError;
use crate::ports::outbound::AddressCodec;

/// Length of an address body in hex characters.
const ADDRESS_HEX_LEN: usize = 40;

/// Normalizes `[prefix]<40 hex chars>` to lowercase.
#[derive(Clone, Debug, Default)]
pub struct HexAddressCodec {
    /// Network prefix kept in front of the normalized body.
    prefix: Option<String>,
}

impl HexAddressCodec {
    /// Codec for addresses carrying `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn reject(input: &str, reason: impl Into<String>) -> DecodeError {
        DecodeError::Address {
            address: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl AddressCodec for HexAddressCodec {
    fn normalize(&self, input: &str) -> Result<Address, DecodeError> {
        let trimmed = input.trim();
        let body = match &self.prefix {
            Some(prefix) => trimmed
                .strip_prefix(prefix.as_str())
                .ok_or_else(|| Self::reject(input, format!("missing prefix {prefix}")))?,
            None => trimmed.strip_prefix("0x").unwrap_or(trimmed),
        };

        if body.len() != ADDRESS_HEX_LEN {
            return Err(Self::reject(
                input,
                format!("expected {ADDRESS_HEX_LEN} hex characters, got {}", body.len()),
            ));
        }
        if !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Self::reject(input, "not hex"));
        }

        let body = body.to_ascii_lowercase();
        Ok(match &self.prefix {
            Some(prefix) => Address::new(format!("{prefix}{body}")),
            None => Address::new(body),
        })
    }
}
