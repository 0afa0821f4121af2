use primitive_types::U256;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 32-byte data feed identifier, written as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FeedId(pub [u8; 32]);

impl FeedId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedId({})", self)
    }
}

impl FromStr for FeedId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| format!("feed id {s} missing 0x prefix"))?;
        let bytes = hex::decode(digits).map_err(|e| format!("feed id {s}: {e}"))?;
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("feed id {s}: expected 32 bytes, got {}", b.len()))?;
        Ok(Self(raw))
    }
}

impl Serialize for FeedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FeedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeedIdVisitor;

        impl Visitor<'_> for FeedIdVisitor {
            type Value = FeedId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 0x-prefixed 32-byte hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FeedId, E> {
                FeedId::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FeedIdVisitor)
    }
}

/// One signed price report for a feed, as delivered by a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedReport {
    #[serde(rename = "FeedID")]
    pub feed_id: FeedId,

    /// Opaque report bytes passed through to the chain.
    #[serde(rename = "FullReport")]
    pub full_report: Vec<u8>,

    #[serde(rename = "ReportContext", default)]
    pub report_context: Vec<u8>,

    #[serde(rename = "Signatures", default)]
    pub signatures: Vec<Vec<u8>>,

    /// Accepts a hex or decimal string, or a non-negative integer.
    #[serde(rename = "BenchmarkPrice", deserialize_with = "deserialize_price")]
    pub benchmark_price: U256,

    /// Unix seconds.
    #[serde(rename = "ObservationTimestamp")]
    pub observation_timestamp: i64,
}

fn deserialize_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    struct PriceVisitor;

    impl Visitor<'_> for PriceVisitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a hex or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
            u64::try_from(v)
                .map(U256::from)
                .map_err(|_| E::custom(format!("negative price {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            match v.strip_prefix("0x") {
                Some(digits) => U256::from_str(digits).map_err(|e| E::custom(format!("price {v}: {e:?}"))),
                None => U256::from_dec_str(v).map_err(|e| E::custom(format!("price {v}: {e:?}"))),
            }
        }
    }

    deserializer.deserialize_any(PriceVisitor)
}
