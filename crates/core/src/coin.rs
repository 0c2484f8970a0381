use std::fmt::{self, Display};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// A token balance. Amounts are raw integer units, serialized as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount")]
    pub amount: BigUint,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<BigUint>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Serde adapter for `BigUint` amounts written as base-10 strings.
pub mod amount {
    use std::str::FromStr as _;

    use num_bigint::BigUint;
    use serde::{Deserialize as _, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(amount: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BigUint::from_str(&raw).map_err(|e| de::Error::custom(format!("invalid amount {raw:?}: {e}")))
    }

    /// Same as the parent module, for `Option<BigUint>` fields.
    pub mod option {
        use std::str::FromStr as _;

        use num_bigint::BigUint;
        use serde::{Deserialize as _, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(
            amount: &Option<BigUint>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match amount {
                Some(amount) => serializer.serialize_some(&amount.to_str_radix(10)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<BigUint>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    BigUint::from_str(&raw)
                        .map_err(|e| de::Error::custom(format!("invalid amount {raw:?}: {e}")))
                })
                .transpose()
        }
    }
}
