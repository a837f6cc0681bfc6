//! Adapter for Baidu Object Storage.
//!
//! Speaks the native BCE REST protocol directly: bce-auth-v1 signed
//! requests, JSON multipart bodies, streaming object I/O over reqwest.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fusion_core::error::{Error, Result};
use fusion_core::stream::{PutStream, RangeSpec};
use fusion_core::types::{
    CompletePart, Credentials, ListPartsInfo, ObjectInfo, ObjectOptions, PartInfo,
};
use futures::TryStreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Method, Response, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::backend::{probe_bucket_name, trim_etag, Backend};
use crate::sign::{uri_encode, BceSigner};

/// Prefix for user-defined metadata headers at BOS.
const META_PREFIX: &str = "x-bce-meta-";

/// Client for one BOS pool.
pub struct BosBackend {
    http: reqwest::Client,
    base: String,
    host: String,
    signer: BceSigner,
}

impl BosBackend {
    /// Builds a client for the pool endpoint and probes it.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint cannot be parsed, is unreachable, or rejects
    /// the credentials with anything other than a harmless permission error.
    pub async fn new(endpoint: &str, creds: &Credentials) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(Error::InvalidArgument("endpoint empty".to_string()));
        }
        let with_scheme = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let url = Url::parse(&with_scheme)
            .map_err(|e| Error::InvalidArgument(format!("bad bos endpoint {endpoint:?}: {e}")))?;
        let host_str = url
            .host_str()
            .ok_or_else(|| Error::InvalidArgument(format!("bos endpoint {endpoint:?} has no host")))?;
        let host = match url.port() {
            Some(port) => format!("{host_str}:{port}"),
            None => host_str.to_string(),
        };
        let base = with_scheme.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::backend(format!("couldn't build bos http client: {e}")))?;
        let backend = Self {
            http,
            base,
            host,
            signer: BceSigner::new(&creds.access_key, &creds.secret_key),
        };
        backend.probe().await?;
        debug!(endpoint, "bos backend ready");
        Ok(backend)
    }

    async fn probe(&self) -> Result<()> {
        let name = probe_bucket_name();
        let resp = self
            .signed(Method::HEAD, &format!("/{name}"), &[], BTreeMap::new())?
            .send()
            .await
            .map_err(|e| Error::backend(format!("probe: {e}")))?;
        match resp.status().as_u16() {
            200 | 403 | 404 => Ok(()),
            status => Err(Error::backend(format!("probe rejected with http {status}"))),
        }
    }

    /// Builds a signed request. `headers` become part of the signature
    /// alongside `host` and `x-bce-date`; unsigned headers (e.g. `Range`)
    /// can still be added to the returned builder.
    fn signed(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        mut headers: BTreeMap<String, String>,
    ) -> Result<reqwest::RequestBuilder> {
        let canonical_uri = uri_encode(path, true);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        headers.insert("host".to_string(), self.host.clone());
        headers.insert("x-bce-date".to_string(), timestamp.clone());
        let auth =
            self.signer.authorization(method.as_str(), &canonical_uri, query, &headers, &timestamp);

        let url = Url::parse(&format!("{}{canonical_uri}", self.base))
            .map_err(|e| Error::backend(format!("bad request url: {e}")))?;
        let mut req = self.http.request(method, url);
        if !query.is_empty() {
            req = req.query(query);
        }
        for (name, value) in &headers {
            if name != "host" {
                req = req.header(name.as_str(), value);
            }
        }
        Ok(req.header("authorization", auth))
    }

    async fn head_meta(&self, p_bucket: &str, p_object: &str) -> Result<(String, i64)> {
        let resp = self
            .signed(Method::HEAD, &object_path(p_bucket, p_object), &[], BTreeMap::new())?
            .send()
            .await
            .map_err(|e| Error::backend(format!("stat object: {e}")))?;
        let resp = ok_status("stat object", resp).await?;
        let etag = header_string(&resp, "etag");
        let size = header_string(&resp, "content-length").parse().unwrap_or_default();
        Ok((trim_etag(&etag), size))
    }
}

fn object_path(p_bucket: &str, p_object: &str) -> String {
    format!("/{p_bucket}/{p_object}")
}

fn header_string(resp: &Response, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn ok_status(op: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let mut body = resp.text().await.unwrap_or_default();
    body.truncate(256);
    Err(Error::backend(format!("{op}: http {status}: {body}")))
}

fn signed_put_headers(stream: &PutStream, opts: &ObjectOptions) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if let Some(md5) = stream.md5_base64() {
        headers.insert("content-md5".to_string(), md5.to_string());
    }
    if let Some(sha256) = stream.sha256_hex() {
        headers.insert("x-bce-content-sha256".to_string(), sha256.to_string());
    }
    if let Some(content_type) = &opts.content_type {
        headers.insert("content-type".to_string(), content_type.clone());
    }
    for (k, v) in &opts.user_defined {
        headers.insert(format!("{META_PREFIX}{}", k.to_ascii_lowercase()), v.clone());
    }
    headers
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateMultipartResult {
    upload_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ListPartsResult {
    storage_class: String,
    part_number_marker: i32,
    next_part_number_marker: i32,
    max_parts: i32,
    is_truncated: bool,
    parts: Vec<ListPartEntry>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ListPartEntry {
    part_number: i32,
    last_modified: String,
    e_tag: String,
    size: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteMultipartBody<'a> {
    parts: Vec<CompletePartEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletePartEntry<'a> {
    part_number: i32,
    e_tag: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct CompleteMultipartResult {
    e_tag: String,
}

fn decode_parts(result: ListPartsResult, into: &mut ListPartsInfo) {
    into.storage_class = result.storage_class;
    into.next_part_number_marker = result.next_part_number_marker;
    into.is_truncated = result.is_truncated;
    for part in result.parts {
        into.parts.push(PartInfo {
            part_number: part.part_number,
            etag: trim_etag(&part.e_tag),
            size: part.size,
            last_modified: DateTime::parse_from_rfc3339(&part.last_modified)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        });
    }
}

#[async_trait]
impl Backend for BosBackend {
    async fn put_object(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        stream: PutStream,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        let size = stream.size();
        let headers = signed_put_headers(&stream, opts);
        let resp = self
            .signed(Method::PUT, &object_path(p_bucket, p_object), &[], headers)?
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(stream.into_inner()))
            .send()
            .await
            .map_err(|e| Error::backend(format!("put object: {e}")))?;
        let resp = ok_status("put object", resp).await?;
        Ok(ObjectInfo {
            bucket: vbucket.to_string(),
            name: object.to_string(),
            etag: trim_etag(&header_string(&resp, "etag")),
            size,
            content_type: opts.content_type.clone().unwrap_or_default(),
            mod_time: Utc::now(),
            acc_time: Utc::now(),
            ..Default::default()
        })
    }

    async fn get_object(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        range: Option<&RangeSpec>,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        _etag: &str,
        _opts: &ObjectOptions,
    ) -> Result<()> {
        let mut req = self.signed(Method::GET, &object_path(p_bucket, p_object), &[], BTreeMap::new())?;
        if let Some(spec) = range {
            // The BOS protocol has no suffix-length form.
            if spec.suffix {
                return Err(Error::InvalidRange(format!(
                    "suffix range not supported for {vbucket}/{object}"
                )));
            }
            req = req.header("range", spec.to_header());
        }
        let resp = req
            .send()
            .await
            .map_err(|e| Error::backend(format!("get object: {e}")))?;
        let resp = ok_status("get object", resp).await?;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::backend(format!("get object body: {e}")))?
        {
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        Ok(())
    }

    async fn delete_object(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        _opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        let resp = self
            .signed(Method::DELETE, &object_path(p_bucket, p_object), &[], BTreeMap::new())?
            .send()
            .await
            .map_err(|e| Error::backend(format!("delete object: {e}")))?;
        ok_status("delete object", resp).await?;
        Ok(ObjectInfo {
            bucket: vbucket.to_string(),
            name: object.to_string(),
            ..Default::default()
        })
    }

    async fn new_multipart_upload(
        &self,
        p_bucket: &str,
        p_object: &str,
        _vbucket: &str,
        _object: &str,
        opts: &ObjectOptions,
    ) -> Result<String> {
        let query = vec![("uploads".to_string(), String::new())];
        let mut headers = BTreeMap::new();
        if let Some(content_type) = &opts.content_type {
            headers.insert("content-type".to_string(), content_type.clone());
        }
        for (k, v) in &opts.user_defined {
            headers.insert(format!("{META_PREFIX}{}", k.to_ascii_lowercase()), v.clone());
        }
        let resp = self
            .signed(Method::POST, &object_path(p_bucket, p_object), &query, headers)?
            .send()
            .await
            .map_err(|e| Error::backend(format!("new multipart: {e}")))?;
        let resp = ok_status("new multipart", resp).await?;
        let result: InitiateMultipartResult = resp
            .json()
            .await
            .map_err(|e| Error::backend(format!("new multipart decode: {e}")))?;
        Ok(result.upload_id)
    }

    async fn put_object_part(
        &self,
        p_bucket: &str,
        p_object: &str,
        _vbucket: &str,
        _object: &str,
        upload_id: &str,
        part_id: i32,
        stream: PutStream,
        _opts: &ObjectOptions,
    ) -> Result<PartInfo> {
        let size = stream.size();
        let query = vec![
            ("partNumber".to_string(), part_id.to_string()),
            ("uploadId".to_string(), upload_id.to_string()),
        ];
        let mut headers = BTreeMap::new();
        if let Some(md5) = stream.md5_base64() {
            headers.insert("content-md5".to_string(), md5.to_string());
        }
        if let Some(sha256) = stream.sha256_hex() {
            headers.insert("x-bce-content-sha256".to_string(), sha256.to_string());
        }
        let resp = self
            .signed(Method::PUT, &object_path(p_bucket, p_object), &query, headers)?
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(stream.into_inner()))
            .send()
            .await
            .map_err(|e| Error::backend(format!("put part: {e}")))?;
        let resp = ok_status("put part", resp).await?;
        Ok(PartInfo {
            part_number: part_id,
            etag: trim_etag(&header_string(&resp, "etag")),
            size,
            last_modified: Utc::now(),
        })
    }

    async fn list_object_parts(
        &self,
        p_bucket: &str,
        p_object: &str,
        upload_id: &str,
        part_number_marker: i32,
        max_parts: i32,
    ) -> Result<ListPartsInfo> {
        let mut info = ListPartsInfo {
            bucket: p_bucket.to_string(),
            object: p_object.to_string(),
            upload_id: upload_id.to_string(),
            part_number_marker,
            max_parts,
            ..Default::default()
        };
        let mut marker = part_number_marker;
        loop {
            let query = vec![
                ("uploadId".to_string(), upload_id.to_string()),
                ("partNumberMarker".to_string(), marker.to_string()),
                ("maxParts".to_string(), max_parts.to_string()),
            ];
            let resp = self
                .signed(Method::GET, &object_path(p_bucket, p_object), &query, BTreeMap::new())?
                .send()
                .await
                .map_err(|e| Error::backend(format!("list parts: {e}")))?;
            let resp = ok_status("list parts", resp).await?;
            let result: ListPartsResult = resp
                .json()
                .await
                .map_err(|e| Error::backend(format!("list parts decode: {e}")))?;
            decode_parts(result, &mut info);
            if !info.is_truncated || info.parts.len() as i32 >= max_parts {
                break;
            }
            marker = info.next_part_number_marker;
        }
        Ok(info)
    }

    async fn abort_multipart_upload(
        &self,
        p_bucket: &str,
        p_object: &str,
        upload_id: &str,
    ) -> Result<()> {
        let query = vec![("uploadId".to_string(), upload_id.to_string())];
        let resp = self
            .signed(Method::DELETE, &object_path(p_bucket, p_object), &query, BTreeMap::new())?
            .send()
            .await
            .map_err(|e| Error::backend(format!("abort multipart: {e}")))?;
        ok_status("abort multipart", resp).await?;
        Ok(())
    }

    async fn complete_multipart_upload(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletePart],
    ) -> Result<ObjectInfo> {
        let query = vec![("uploadId".to_string(), upload_id.to_string())];
        let body = CompleteMultipartBody {
            parts: parts
                .iter()
                .map(|p| CompletePartEntry { part_number: p.part_number, e_tag: &p.etag })
                .collect(),
        };
        let resp = self
            .signed(Method::POST, &object_path(p_bucket, p_object), &query, BTreeMap::new())?
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::backend(format!("complete multipart: {e}")))?;
        let resp = ok_status("complete multipart", resp).await?;
        let result: CompleteMultipartResult = resp
            .json()
            .await
            .map_err(|e| Error::backend(format!("complete multipart decode: {e}")))?;
        let completion_etag = trim_etag(&result.e_tag);

        let (stat_etag, size) = self.head_meta(p_bucket, p_object).await?;
        if completion_etag != stat_etag {
            return Err(Error::EtagMismatch { completion: completion_etag, stat: stat_etag });
        }
        Ok(ObjectInfo {
            bucket: vbucket.to_string(),
            name: object.to_string(),
            etag: stat_etag,
            size,
            mod_time: Utc::now(),
            acc_time: Utc::now(),
            ..Default::default()
        })
    }
}
