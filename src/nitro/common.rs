// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use ciborium::Value;

pub fn to_bstr(v: &Value, n: &str) -> Result<Vec<u8>, Error> {
    match v {
        Value::Bytes(x) => Ok(x.clone()),
        _ => Err(Error::Decode(format!("{n} MUST be bstr"))),
    }
}

/// Like [`to_bstr`], but `null` maps to `None`
pub fn to_opt_bstr(v: &Value, n: &str) -> Result<Option<Vec<u8>>, Error> {
    match v {
        Value::Null => Ok(None),
        _ => to_bstr(v, n).map(Some),
    }
}

pub fn to_tstr(v: &Value, n: &str) -> Result<String, Error> {
    match v {
        Value::Text(x) => Ok(x.clone()),
        _ => Err(Error::Decode(format!("{n} MUST be tstr"))),
    }
}

pub fn to_uint(v: &Value, n: &str) -> Result<u64, Error> {
    match v {
        Value::Integer(i) => u64::try_from(*i)
            .map_err(|_| Error::Decode(format!("{n} MUST be a non-negative integer"))),
        _ => Err(Error::Decode(format!("{n} MUST be integer"))),
    }
}

/// Decode exactly one CBOR item from `buf`, rejecting trailing bytes.
pub fn decode_value(buf: &[u8], n: &str) -> Result<Value, Error> {
    let mut rest = buf;

    let v: Value = ciborium::de::from_reader(&mut rest)
        .map_err(|e| Error::Decode(format!("{n}: {e}")))?;

    if !rest.is_empty() {
        return Err(Error::Decode(format!(
            "{n}: {} trailing bytes after CBOR item",
            rest.len()
        )));
    }

    Ok(v)
}

pub fn encode_value(v: &Value, n: &str) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();

    ciborium::ser::into_writer(v, &mut buf).map_err(|e| Error::Decode(format!("{n}: {e}")))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn typed_access() {
        assert_eq!(to_bstr(&Value::Bytes(vec![1, 2]), "x").unwrap(), vec![1, 2]);
        assert!(to_bstr(&Value::Text("a".into()), "x").is_err());
        assert_eq!(to_opt_bstr(&Value::Null, "x").unwrap(), None);
        assert_eq!(to_tstr(&Value::Text("a".into()), "x").unwrap(), "a");
        assert_eq!(to_uint(&Value::Integer(5.into()), "x").unwrap(), 5);
        assert!(to_uint(&Value::Integer((-1).into()), "x").is_err());
    }

    #[test]
    fn trailing_bytes_rejected() {
        // 0x01 followed by a spurious 0x02
        assert!(decode_value(&hex!("0102"), "item").is_err());
        assert_eq!(decode_value(&hex!("01"), "item").unwrap(), Value::Integer(1.into()));
    }
}
