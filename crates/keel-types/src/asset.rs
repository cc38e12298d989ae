use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Width class of an asset, used as part of grouping keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetType {
    Native,
    CreditAlphanum4,
    CreditAlphanum12,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Native => "native",
            Self::CreditAlphanum4 => "credit_alphanum4",
            Self::CreditAlphanum12 => "credit_alphanum12",
        };
        f.write_str(s)
    }
}

/// An asset traded or held on the ledger.
///
/// Credit assets are identified by their code and issuing account. Codes of
/// up to four characters are `CreditAlphanum4`; five to twelve are
/// `CreditAlphanum12`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    Native,
    CreditAlphanum4 { code: String, issuer: String },
    CreditAlphanum12 { code: String, issuer: String },
}

impl Asset {
    /// Build a credit asset, choosing the width class from the code length.
    pub fn credit(code: impl Into<String>, issuer: impl Into<String>) -> Result<Self, TypeError> {
        let code = code.into();
        let valid = !code.is_empty()
            && code.len() <= 12
            && code.bytes().all(|b| b.is_ascii_alphanumeric());
        if !valid {
            return Err(TypeError::InvalidAssetCode(code));
        }
        let issuer = issuer.into();
        if code.len() <= 4 {
            Ok(Self::CreditAlphanum4 { code, issuer })
        } else {
            Ok(Self::CreditAlphanum12 { code, issuer })
        }
    }

    pub fn asset_type(&self) -> AssetType {
        match self {
            Self::Native => AssetType::Native,
            Self::CreditAlphanum4 { .. } => AssetType::CreditAlphanum4,
            Self::CreditAlphanum12 { .. } => AssetType::CreditAlphanum12,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Asset code, empty for the native asset.
    pub fn code(&self) -> &str {
        match self {
            Self::Native => "",
            Self::CreditAlphanum4 { code, .. } | Self::CreditAlphanum12 { code, .. } => code,
        }
    }

    /// Issuing account, empty for the native asset.
    pub fn issuer(&self) -> &str {
        match self {
            Self::Native => "",
            Self::CreditAlphanum4 { issuer, .. } | Self::CreditAlphanum12 { issuer, .. } => issuer,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            _ => write!(f, "{}/{}/{}", self.asset_type(), self.code(), self.issuer()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "GC3C4AKRBQLHOJ45U4XG35ESVWRDECWO5XLDGYADO6DPR3L7KIDVUMML";

    #[test]
    fn credit_width_follows_code_length() {
        let usd = Asset::credit("USD", ISSUER).unwrap();
        assert_eq!(usd.asset_type(), AssetType::CreditAlphanum4);

        let long = Asset::credit("LONGCODE", ISSUER).unwrap();
        assert_eq!(long.asset_type(), AssetType::CreditAlphanum12);
    }

    #[test]
    fn rejects_bad_codes() {
        assert!(matches!(
            Asset::credit("", ISSUER),
            Err(TypeError::InvalidAssetCode(_))
        ));
        assert!(Asset::credit("THIRTEENCHARS", ISSUER).is_err());
        assert!(Asset::credit("US-D", ISSUER).is_err());
    }

    #[test]
    fn display_form() {
        assert_eq!(Asset::Native.to_string(), "native");
        let usd = Asset::credit("USD", ISSUER).unwrap();
        assert_eq!(usd.to_string(), format!("credit_alphanum4/USD/{ISSUER}"));
    }
}
