/// Formats a `u64` as a JSON-RPC quantity with "0x" prefix.
///
/// Zero is formatted as "0x0"; no leading zeros are emitted otherwise.
#[must_use]
pub fn format_hex_u64(value: u64) -> String {
    format!("0x{value:x}")
}

/// Parses a hex quantity to `u64`.
///
/// Accepts strings with or without "0x"/"0X" prefix. Returns `None` if the digits are
/// missing, invalid, or overflow.
#[must_use]
pub fn parse_hex_u64(hex: &str) -> Option<u64> {
    let hex_str = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
    u64::from_str_radix(hex_str, 16).ok()
}

/// Serde adapter for `u64` fields encoded as hex quantities.
///
/// ```ignore
/// #[serde(with = "quantity")]
/// pub block_number: u64,
/// ```
pub mod quantity {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::borrow::Cow;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hex_u64(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = Cow::<'de, str>::deserialize(deserializer)?;
        super::parse_hex_u64(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid hex quantity: {raw}")))
    }

    /// Same encoding for `Option<u64>`; `null` maps to `None`.
    pub mod option {
        use serde::{de::Error, Deserialize, Deserializer, Serializer};
        use std::borrow::Cow;

        pub fn serialize<S: Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_str(&super::super::format_hex_u64(*v)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            let raw = Option::<Cow<'de, str>>::deserialize(deserializer)?;
            raw.map(|raw| {
                super::super::parse_hex_u64(&raw)
                    .ok_or_else(|| D::Error::custom(format!("invalid hex quantity: {raw}")))
            })
            .transpose()
        }
    }
}
