//! EVM account addresses

use crate::{PennyVaultError, Result};
pub use alloy_primitives::Address;

/// Parse a `0x`-prefixed, 40 hex digit address.
///
/// Used for configured addresses, so failures are `Configuration` errors.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    if !(s.starts_with("0x") || s.starts_with("0X")) {
        return Err(PennyVaultError::configuration(format!(
            "address {s:?} must be 0x-prefixed"
        )));
    }
    s.parse::<Address>()
        .map_err(|e| PennyVaultError::configuration(format!("address {s:?}: {e}")))
}

/// Abbreviated form for display, e.g. `0x119c...c8ba`
pub fn short_address(address: &Address) -> String {
    let full = format!("{address:#x}");
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const VAULT: &str = "0x119CFa5bF364B5D4F9d66c8E65Fc46BD5B42c8ba";

    #[test]
    fn test_parse_ignores_case() {
        let addr = parse_address(VAULT).unwrap();
        assert_eq!(addr, address!("119cfa5bf364b5d4f9d66c8e65fc46bd5b42c8ba"));
        assert_eq!(addr, parse_address(&VAULT.to_ascii_lowercase()).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "119CFa5bF364B5D4F9d66c8E65Fc46BD5B42c8ba",
            "0x1234",
            "0xzz9CFa5bF364B5D4F9d66c8E65Fc46BD5B42c8ba",
        ] {
            assert!(
                matches!(parse_address(bad), Err(PennyVaultError::Configuration { .. })),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn test_short() {
        let addr = parse_address(VAULT).unwrap();
        assert_eq!(short_address(&addr), "0x119c...c8ba");
    }
}
