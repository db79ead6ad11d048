// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Synthetic certificate chains and attestation documents for unit tests.

use super::sign1::CoseSign1;
use ciborium::Value;
use hex_literal::hex;
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::{hash, MessageDigest};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use std::collections::BTreeMap;

/// Point in time (seconds since epoch) at which the default fixture is valid
pub const T: i64 = 1_700_000_000;
/// Document timestamp, in milliseconds
pub const TIMESTAMP_MS: u64 = 1_700_000_000_123;

pub const NOT_BEFORE: i64 = 1_690_000_000;
pub const NOT_AFTER: i64 = 1_710_000_000;

pub const PCR0: [u8; 48] = [0xaa; 48];
pub const PCR1: [u8; 48] = [0xbb; 48];
pub const NONCE: &[u8] = b"0123456789abcdef";
pub const USER_DATA: &[u8] = b"hello enclave";

// {1: -35}, i.e. alg ES384
pub const PROTECTED: [u8; 4] = hex!("a1013822");

pub fn ec_key() -> EcKey<Private> {
    let group = EcGroup::from_curve_name(Nid::SECP384R1).unwrap();
    EcKey::generate(&group).unwrap()
}

pub fn public(key: &EcKey<Private>) -> PKey<Public> {
    let der = key.public_key_to_der().unwrap();
    PKey::public_key_from_der(&der).unwrap()
}

pub fn rsa_public_key_der() -> Vec<u8> {
    let rsa = Rsa::generate(2048).unwrap();
    PKey::from_rsa(rsa).unwrap().public_key_to_der().unwrap()
}

pub fn rsa_public_key() -> PKey<Public> {
    PKey::public_key_from_der(&rsa_public_key_der()).unwrap()
}

/// Sign `payload` the way the Nitro Security Module does: ES384 over the
/// Sig_structure, raw R || S.
pub fn sign(key: &EcKey<Private>, payload: &[u8]) -> CoseSign1 {
    let mut s = CoseSign1 {
        protected: PROTECTED.to_vec(),
        payload: payload.to_vec(),
        signature: Vec::new(),
    };

    let digest = hash(MessageDigest::sha384(), &s.sig_structure().unwrap()).unwrap();
    let sig = EcdsaSig::sign(&digest, key).unwrap();

    s.signature.extend(sig.r().to_vec_padded(48).unwrap());
    s.signature.extend(sig.s().to_vec_padded(48).unwrap());

    s
}

pub fn encode_envelope(s: &CoseSign1) -> Vec<u8> {
    let v = Value::Array(vec![
        Value::Bytes(s.protected.clone()),
        Value::Map(Vec::new()),
        Value::Bytes(s.payload.clone()),
        Value::Bytes(s.signature.clone()),
    ]);

    let mut buf = Vec::new();
    ciborium::ser::into_writer(&v, &mut buf).unwrap();
    buf
}

pub fn cert(
    cn: &str,
    serial: u32,
    key: &EcKey<Private>,
    issuer: Option<(&X509, &EcKey<Private>)>,
    ca: bool,
    validity: (i64, i64),
) -> X509 {
    let pkey = PKey::from_ec_key(key.clone()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("C", "US").unwrap();
    name.append_entry_by_text("O", "Test").unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();

    let serial = Asn1Integer::from_bn(&BigNum::from_u32(serial).unwrap()).unwrap();
    builder.set_serial_number(&serial).unwrap();

    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some((c, _)) => builder.set_issuer_name(c.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(&pkey).unwrap();

    builder
        .set_not_before(&Asn1Time::from_unix(validity.0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(validity.1).unwrap())
        .unwrap();

    if ca {
        let bc = BasicConstraints::new().critical().ca().build().unwrap();
        builder.append_extension(bc).unwrap();

        let ku = KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .build()
            .unwrap();
        builder.append_extension(ku).unwrap();
    } else {
        let ku = KeyUsage::new()
            .critical()
            .digital_signature()
            .build()
            .unwrap();
        builder.append_extension(ku).unwrap();
    }

    let signer = match issuer {
        Some((_, k)) => PKey::from_ec_key(k.clone()).unwrap(),
        None => pkey,
    };
    builder.sign(&signer, MessageDigest::sha384()).unwrap();

    builder.build()
}

/// A root → intermediate → leaf chain, all P-384
pub struct Chain {
    pub root: X509,
    pub intermediate: X509,
    pub leaf: X509,
    pub leaf_key: EcKey<Private>,
}

impl Chain {
    pub fn new() -> Self {
        let window = (NOT_BEFORE, NOT_AFTER);
        Self::with_validity(window, window, window)
    }

    pub fn with_validity(root: (i64, i64), intermediate: (i64, i64), leaf: (i64, i64)) -> Self {
        let root_key = ec_key();
        let root_cert = cert("Test Root", 1, &root_key, None, true, root);

        let int_key = ec_key();
        let int_cert = cert(
            "Test Intermediate",
            2,
            &int_key,
            Some((&root_cert, &root_key)),
            true,
            intermediate,
        );

        let leaf_key = ec_key();
        let leaf_cert = cert(
            "i-0123456789abcdef0.us-east-1.aws",
            3,
            &leaf_key,
            Some((&int_cert, &int_key)),
            false,
            leaf,
        );

        Self {
            root: root_cert,
            intermediate: int_cert,
            leaf: leaf_cert,
            leaf_key,
        }
    }

    pub fn cabundle(&self) -> Vec<Vec<u8>> {
        vec![
            self.root.to_der().unwrap(),
            self.intermediate.to_der().unwrap(),
        ]
    }

    pub fn root_fingerprint(&self) -> String {
        let d = hash(MessageDigest::sha256(), &self.root.to_der().unwrap()).unwrap();
        hex::encode(&*d)
    }
}

/// A self-signed leaf certificate carrying an RSA key
pub fn rsa_leaf() -> X509 {
    let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "RSA Leaf").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(NOT_BEFORE).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(NOT_AFTER).unwrap())
        .unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();

    builder.build()
}

/// An unrelated self-signed certificate
pub fn stranger() -> X509 {
    let key = ec_key();
    cert("Stranger", 99, &key, None, true, (NOT_BEFORE, NOT_AFTER))
}

pub fn default_pcrs() -> BTreeMap<u32, Vec<u8>> {
    BTreeMap::from([(0, PCR0.to_vec()), (1, PCR1.to_vec())])
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_bytes(v: Option<&[u8]>) -> Value {
    match v {
        Some(b) => Value::Bytes(b.to_vec()),
        None => Value::Null,
    }
}

/// The claims map as a list of entries, so that tests can drop, replace or
/// duplicate individual claims before encoding.
pub fn claims_entries(
    leaf: &[u8],
    cabundle: &[Vec<u8>],
    pcrs: &BTreeMap<u32, Vec<u8>>,
    nonce: Option<&[u8]>,
    user_data: Option<&[u8]>,
) -> Vec<(Value, Value)> {
    let pcrs = pcrs
        .iter()
        .map(|(k, v)| (Value::Integer((*k).into()), Value::Bytes(v.clone())))
        .collect();

    let bundle = cabundle.iter().map(|c| Value::Bytes(c.clone())).collect();

    vec![
        (text("module_id"), text("i-0123456789abcdef0-enc0123456789abcd")),
        (text("digest"), text("SHA384")),
        (text("timestamp"), Value::Integer(TIMESTAMP_MS.into())),
        (text("pcrs"), Value::Map(pcrs)),
        (text("certificate"), Value::Bytes(leaf.to_vec())),
        (text("cabundle"), Value::Array(bundle)),
        (text("public_key"), Value::Bytes(rsa_public_key_der())),
        (text("user_data"), opt_bytes(user_data)),
        (text("nonce"), opt_bytes(nonce)),
    ]
}

pub fn encode_claims(entries: Vec<(Value, Value)>) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&Value::Map(entries), &mut buf).unwrap();
    buf
}

/// Replace the value of claim `key` in `entries`
pub fn set_claim(entries: &mut [(Value, Value)], key: &str, value: Value) {
    for (k, v) in entries.iter_mut() {
        if *k == text(key) {
            *v = value;
            return;
        }
    }
    panic!("no claim {key}");
}

pub fn default_claims(chain: &Chain) -> Vec<u8> {
    encode_claims(claims_entries(
        &chain.leaf.to_der().unwrap(),
        &chain.cabundle(),
        &default_pcrs(),
        Some(NONCE),
        Some(USER_DATA),
    ))
}

/// A complete, correctly signed attestation document
pub fn document(chain: &Chain) -> Vec<u8> {
    encode_envelope(&sign(&chain.leaf_key, &default_claims(chain)))
}
