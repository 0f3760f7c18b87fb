//! The codec interface consumed by the Request Builder and Response Decoder:
//! `serialize`/`deserialize` plus `encoding_from_content_type`, which
//! inspects `Content-Type` to pick among the supported encodings.

use crate::error::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A wire encoding this crate knows how to read and write. Unknown
/// `Content-Type`s surface as [`Error::serialization`]/[`Error::decoding`]
/// with an `UnsupportedEncoding`-flavored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Xml,
    FormUrlEncoded,
    Plain,
}

/// Picks an [`Encoding`] from a `Content-Type` header value.
///
/// # Errors
/// Returns [`Error::decoding`] if the media type isn't one of the
/// supported encodings.
pub fn encoding_from_content_type(content_type: &str) -> Result<Encoding, Error> {
    let media_type = crate::constants::media_type(content_type);
    if crate::constants::is_json_content_type(content_type) {
        Ok(Encoding::Json)
    } else {
        match media_type.to_ascii_lowercase().as_str() {
            "application/xml" | "text/xml" => Ok(Encoding::Xml),
            "application/x-www-form-urlencoded" => Ok(Encoding::FormUrlEncoded),
            "text/plain" => Ok(Encoding::Plain),
            other => Err(Error::decoding(format!("unsupported encoding '{other}'"))),
        }
    }
}

/// Serializes and deserializes values for a given [`Encoding`]. The core
/// runtime depends only on this trait; a concrete body/model type is
/// whatever the caller's generated types provide `Serialize`/`Deserialize`
/// for.
pub trait Codec: Send + Sync {
    /// # Errors
    /// Returns [`Error::serialization`] if `value` cannot be encoded in `encoding`.
    fn serialize<T: Serialize>(&self, value: &T, encoding: Encoding) -> Result<Vec<u8>, Error>;

    /// # Errors
    /// Returns [`Error::decoding`] if `bytes` cannot be parsed as `T` under `encoding`.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8], encoding: Encoding) -> Result<T, Error>;
}

/// The default codec: JSON via `serde_json`, form-urlencoded via
/// `serde_urlencoded`-style pair serialization (built on `urlencoding` since
/// that's already the crate's percent-encoding dependency), and a
/// byte-passthrough `Plain`. `Xml` has no default implementation — plans
/// declaring an XML body content type need a caller-supplied [`Codec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCodec;

impl Codec for DefaultCodec {
    fn serialize<T: Serialize>(&self, value: &T, encoding: Encoding) -> Result<Vec<u8>, Error> {
        match encoding {
            Encoding::Json => serde_json::to_vec(value).map_err(|e| Error::serialization(e.to_string())),
            Encoding::FormUrlEncoded => serialize_form(value),
            Encoding::Plain => {
                let text = serde_json::to_value(value)
                    .map_err(|e| Error::serialization(e.to_string()))?
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::serialization("Plain encoding requires a string value"))?;
                Ok(text.into_bytes())
            }
            Encoding::Xml => Err(Error::serialization(
                "DefaultCodec has no XML implementation; supply a Codec",
            )),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8], encoding: Encoding) -> Result<T, Error> {
        match encoding {
            Encoding::Json => serde_json::from_slice(bytes).map_err(|e| Error::decoding(e.to_string())),
            Encoding::Plain => {
                let text = std::str::from_utf8(bytes).map_err(|e| Error::decoding(e.to_string()))?;
                serde_json::from_value(serde_json::Value::String(text.to_string()))
                    .map_err(|e| Error::decoding(e.to_string()))
            }
            Encoding::FormUrlEncoded => Err(Error::decoding(
                "DefaultCodec cannot deserialize form-urlencoded bodies into typed values",
            )),
            Encoding::Xml => Err(Error::decoding(
                "DefaultCodec has no XML implementation; supply a Codec",
            )),
        }
    }
}

/// Serializes a JSON-object-shaped value as `application/x-www-form-urlencoded`
/// pairs, percent-encoding keys and values with the crate's existing
/// `urlencoding` dependency.
fn serialize_form<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    let json = serde_json::to_value(value).map_err(|e| Error::serialization(e.to_string()))?;
    let serde_json::Value::Object(map) = json else {
        return Err(Error::serialization(
            "form-urlencoded serialization requires an object-shaped value",
        ));
    };
    let pairs: Vec<String> = map
        .iter()
        .map(|(k, v)| {
            let value_str = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!(
                "{}={}",
                urlencoding::encode(k),
                urlencoding::encode(&value_str)
            )
        })
        .collect();
    Ok(pairs.join("&").into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_json_ignoring_charset() {
        assert_eq!(
            encoding_from_content_type("application/json; charset=utf-8").unwrap(),
            Encoding::Json
        );
    }

    #[test]
    fn rejects_unknown_encoding() {
        assert!(encoding_from_content_type("application/vnd.custom+weird").is_err());
    }

    #[test]
    fn json_round_trips_a_struct() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Item {
            name: String,
            count: u32,
        }
        let codec = DefaultCodec;
        let item = Item {
            name: "widget".to_string(),
            count: 3,
        };
        let bytes = codec.serialize(&item, Encoding::Json).unwrap();
        let round_tripped: Item = codec.deserialize(&bytes, Encoding::Json).unwrap();
        assert_eq!(item, round_tripped);
    }

    #[test]
    fn form_urlencoded_serializes_object_fields() {
        let codec = DefaultCodec;
        let value = serde_json::json!({"a": "1", "b": "x y"});
        let bytes = codec.serialize(&value, Encoding::FormUrlEncoded).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("a=1"));
        assert!(text.contains("b=x%20y"));
    }
}
