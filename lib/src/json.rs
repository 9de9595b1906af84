//! The `[version, params, stamp, payload]` envelope wrapping `-j` responses.

use std::{fmt, marker::PhantomData};

use serde::{
    Deserialize, Deserializer,
    de::{self, DeserializeOwned, IgnoredAny, SeqAccess, Visitor},
};

use crate::Error;

/// A decoded JSON response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub version: u64,
    pub params: Vec<String>,
    pub stamp: f64,
    pub payload: T,
}

impl<'de, T> Deserialize<'de> for Envelope<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(EnvelopeVisitor(PhantomData))
    }
}

struct EnvelopeVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for EnvelopeVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Envelope<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of version, params, stamp and payload")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let version = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let params = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let stamp = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
        let payload = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(3, &self))?;
        while seq.next_element::<IgnoredAny>()?.is_some() {}

        Ok(Envelope {
            version,
            params,
            stamp,
            payload,
        })
    }
}

/// Decodes the payload of a JSON response body.
///
/// # Errors
///
/// Returns [`Error::InvalidJsonResponse`] when `body` is not an array of at
/// least four elements headed by an integer, a string array and a number, or
/// when the payload does not decode into `T`.
pub fn parse_json_response<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice::<Envelope<T>>(body)
        .map(|envelope| envelope.payload)
        .map_err(Error::InvalidJsonResponse)
}
