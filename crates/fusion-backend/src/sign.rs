// Copyright 2026 The FusionStore Authors
// SPDX-License-Identifier: Apache-2.0

//! BCE request signing (bce-auth-v1) for the BOS adapter.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Validity window the signature declares, in seconds.
const EXPIRE_SECS: u32 = 1800;

/// Everything except unreserved characters is percent-encoded.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes a string per the BCE canonicalization rules.
/// `preserve_slash` keeps path separators intact for URIs.
pub(crate) fn uri_encode(input: &str, preserve_slash: bool) -> String {
    if preserve_slash {
        input
            .split('/')
            .map(|seg| utf8_percent_encode(seg, URI_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("/")
    } else {
        utf8_percent_encode(input, URI_ENCODE_SET).to_string()
    }
}

/// Signs requests with a BCE account keypair.
pub(crate) struct BceSigner {
    access_key: String,
    secret_key: String,
}

impl BceSigner {
    pub(crate) fn new(access_key: &str, secret_key: &str) -> Self {
        Self { access_key: access_key.to_string(), secret_key: secret_key.to_string() }
    }

    /// Produces the `Authorization` header value for one request.
    ///
    /// `canonical_uri` must be the already-encoded request path. `headers`
    /// are the headers included in the signature; names are lowercased
    /// before canonicalization.
    pub(crate) fn authorization(
        &self,
        method: &str,
        canonical_uri: &str,
        query: &[(String, String)],
        headers: &BTreeMap<String, String>,
        timestamp: &str,
    ) -> String {
        let prefix = format!("bce-auth-v1/{}/{timestamp}/{EXPIRE_SECS}", self.access_key);
        let signing_key = hmac_sha256_hex(self.secret_key.as_bytes(), prefix.as_bytes());

        let mut pairs: Vec<String> = query
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("authorization"))
            .map(|(k, v)| format!("{}={}", uri_encode(k, false), uri_encode(v, false)))
            .collect();
        pairs.sort();
        let canonical_query = pairs.join("&");

        let mut entries: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        entries.sort();
        let canonical_headers = entries
            .iter()
            .map(|(k, v)| format!("{k}:{}", uri_encode(v, false)))
            .collect::<Vec<_>>()
            .join("\n");
        let signed_headers =
            entries.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");

        let canonical_request =
            format!("{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}");
        let signature =
            hmac_sha256_hex(signing_key.as_bytes(), canonical_request.as_bytes());
        format!("{prefix}/{signed_headers}/{signature}")
    }
}

fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}
