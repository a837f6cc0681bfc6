// Copyright 2026 The FusionStore Authors
// SPDX-License-Identifier: Apache-2.0

//! Adapter for S3-shaped vendors (AWS S3 and Ceph RGW).

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Region, SharedHttpClient, StalledStreamProtectionConfig};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use aws_smithy_types::body::SdkBody;
use aws_smithy_types::error::display::DisplayErrorContext;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fusion_core::error::{Error, Result};
use fusion_core::stream::{PutChunkStream, PutStream, RangeSpec};
use fusion_core::types::{
    CompletePart, Credentials, ListPartsInfo, ObjectInfo, ObjectOptions, PartInfo,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::backend::{probe_bucket_name, trim_etag, Backend};

/// Builds the HTTPS connector shared by every S3-shaped adapter in the
/// process. Connections are pooled per endpoint inside the client.
#[must_use]
pub fn shared_http_client() -> SharedHttpClient {
    HyperClientBuilder::new().build_https()
}

/// Client for one S3-shaped pool.
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Builds a client for the pool endpoint and probes it.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint is empty, unreachable, or rejects the
    /// credentials with anything other than a harmless permission error.
    pub async fn new(
        endpoint: &str,
        creds: &Credentials,
        http_client: SharedHttpClient,
    ) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(Error::InvalidArgument("endpoint empty".to_string()));
        }
        let provider = aws_credential_types::Credentials::from_keys(
            creds.access_key.clone(),
            creds.secret_key.clone(),
            None,
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(provider)
            .http_client(http_client)
            .force_path_style(true)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .build();
        let client = Client::from_conf(config);
        probe(&client).await?;
        debug!(endpoint, "s3 backend ready");
        Ok(Self { client })
    }
}

/// HEAD a bucket that cannot exist. 403/404 prove the endpoint is reachable
/// with valid credentials; anything else fails construction.
async fn probe(client: &Client) -> Result<()> {
    let name = probe_bucket_name();
    match client.head_bucket().bucket(&name).send().await {
        Ok(_) => Ok(()),
        Err(SdkError::ServiceError(ctx)) => {
            let status = ctx.raw().status().as_u16();
            if status == 403 || status == 404 {
                Ok(())
            } else {
                Err(Error::backend(format!("probe rejected with http {status}")))
            }
        }
        Err(err) => Err(sdk_err("probe", &err)),
    }
}

fn sdk_err<E, R>(op: &str, err: &SdkError<E, R>) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    Error::backend(format!("{op}: {}", DisplayErrorContext(err)))
}

/// Bridges a gateway body into an `SdkBody` without buffering. The exact
/// size hint lets the SDK emit a Content-Length header.
struct StreamBody {
    inner: PutChunkStream,
    remaining: u64,
}

impl http_body::Body for StreamBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::io::Result<http_body::Frame<Bytes>>>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.remaining = self.remaining.saturating_sub(chunk.len() as u64);
                Poll::Ready(Some(Ok(http_body::Frame::data(chunk))))
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        http_body::SizeHint::with_exact(self.remaining)
    }
}

fn into_byte_stream(stream: PutStream) -> ByteStream {
    let remaining = stream.size().max(0) as u64;
    let body = StreamBody { inner: stream.into_inner(), remaining };
    ByteStream::new(SdkBody::from_body_1_x(body))
}

fn from_smithy_time(dt: Option<&aws_smithy_types::DateTime>) -> DateTime<Utc> {
    dt.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl Backend for S3Backend {
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
        // Content-MD5 is required for buckets with object locking; sending
        // it always spares a per-request capability check.
        let md5 = stream.md5_base64().map(str::to_string);
        let mut req = self
            .client
            .put_object()
            .bucket(p_bucket)
            .key(p_object)
            .content_length(size)
            .set_content_md5(md5)
            .set_content_type(opts.content_type.clone())
            .set_tagging(opts.tags.clone())
            .body(into_byte_stream(stream));
        for (k, v) in &opts.user_defined {
            req = req.metadata(k.clone(), v.clone());
        }
        let out = req.send().await.map_err(|e| sdk_err("put object", &e))?;
        Ok(ObjectInfo {
            bucket: vbucket.to_string(),
            name: object.to_string(),
            etag: trim_etag(out.e_tag().unwrap_or_default()),
            size,
            content_type: opts.content_type.clone().unwrap_or_default(),
            user_tags: opts.tags.clone().unwrap_or_default(),
            mod_time: Utc::now(),
            acc_time: Utc::now(),
            ..Default::default()
        })
    }

    async fn get_object(
        &self,
        p_bucket: &str,
        p_object: &str,
        _vbucket: &str,
        _object: &str,
        range: Option<&RangeSpec>,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        etag: &str,
        _opts: &ObjectOptions,
    ) -> Result<()> {
        let mut req = self.client.get_object().bucket(p_bucket).key(p_object);
        if let Some(spec) = range {
            req = req.range(spec.to_header());
        }
        if !etag.is_empty() {
            req = req.if_match(format!("\"{etag}\""));
        }
        let out = req.send().await.map_err(|e| sdk_err("get object", &e))?;
        let mut body = out.body;
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
        self.client
            .delete_object()
            .bucket(p_bucket)
            .key(p_object)
            .send()
            .await
            .map_err(|e| sdk_err("delete object", &e))?;
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
        let mut req = self
            .client
            .create_multipart_upload()
            .bucket(p_bucket)
            .key(p_object)
            .set_content_type(opts.content_type.clone())
            .set_tagging(opts.tags.clone());
        for (k, v) in &opts.user_defined {
            req = req.metadata(k.clone(), v.clone());
        }
        let out = req.send().await.map_err(|e| sdk_err("new multipart", &e))?;
        out.upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::backend("backend returned no upload id"))
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
        let md5 = stream.md5_base64().map(str::to_string);
        let out = self
            .client
            .upload_part()
            .bucket(p_bucket)
            .key(p_object)
            .upload_id(upload_id)
            .part_number(part_id)
            .content_length(size)
            .set_content_md5(md5)
            .body(into_byte_stream(stream))
            .send()
            .await
            .map_err(|e| sdk_err("put part", &e))?;
        Ok(PartInfo {
            part_number: part_id,
            etag: trim_etag(out.e_tag().unwrap_or_default()),
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
            let out = self
                .client
                .list_parts()
                .bucket(p_bucket)
                .key(p_object)
                .upload_id(upload_id)
                .part_number_marker(marker.to_string())
                .max_parts(max_parts)
                .send()
                .await
                .map_err(|e| sdk_err("list parts", &e))?;
            for part in out.parts() {
                info.parts.push(PartInfo {
                    part_number: part.part_number().unwrap_or_default(),
                    etag: trim_etag(part.e_tag().unwrap_or_default()),
                    size: part.size().unwrap_or_default(),
                    last_modified: from_smithy_time(part.last_modified()),
                });
            }
            info.is_truncated = out.is_truncated().unwrap_or(false);
            info.next_part_number_marker = out
                .next_part_number_marker()
                .and_then(|m| m.parse().ok())
                .unwrap_or_default();
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
        self.client
            .abort_multipart_upload()
            .bucket(p_bucket)
            .key(p_object)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| sdk_err("abort multipart", &e))?;
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
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|p| {
                        CompletedPart::builder()
                            .part_number(p.part_number)
                            .e_tag(p.etag.clone())
                            .build()
                    })
                    .collect(),
            ))
            .build();
        let out = self
            .client
            .complete_multipart_upload()
            .bucket(p_bucket)
            .key(p_object)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| sdk_err("complete multipart", &e))?;
        let completion_etag = trim_etag(out.e_tag().unwrap_or_default());
        let stat = self
            .client
            .head_object()
            .bucket(p_bucket)
            .key(p_object)
            .send()
            .await
            .map_err(|e| sdk_err("stat after complete", &e))?;
        let stat_etag = trim_etag(stat.e_tag().unwrap_or_default());
        if completion_etag != stat_etag {
            return Err(Error::EtagMismatch { completion: completion_etag, stat: stat_etag });
        }
        Ok(ObjectInfo {
            bucket: vbucket.to_string(),
            name: object.to_string(),
            etag: stat_etag,
            size: stat.content_length().unwrap_or_default(),
            content_type: stat.content_type().unwrap_or_default().to_string(),
            mod_time: from_smithy_time(stat.last_modified()),
            acc_time: Utc::now(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use fusion_core::types::Credentials;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn backend_for(server: &MockServer) -> Result<S3Backend> {
        let creds = Credentials { access_key: "ak".into(), secret_key: "sk".into() };
        S3Backend::new(&server.uri(), &creds, shared_http_client()).await
    }

    #[tokio::test]
    async fn test_probe_accepts_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        assert!(backend_for(&server).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_accepts_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        assert!(backend_for(&server).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_rejects_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        assert!(backend_for(&server).await.is_err());
    }

    #[tokio::test]
    async fn test_put_object_streams_and_returns_etag() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/pb-1/v1/docs/a.txt"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("ETag", "\"5d41402abc4b2a76b9719d911017c592\""),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server).await.unwrap();
        let stream = PutStream::from_bytes(Bytes::from_static(b"hello"));
        let info = backend
            .put_object("pb-1", "v1/docs/a.txt", "v1", "docs/a.txt", stream, &ObjectOptions::default())
            .await
            .unwrap();
        assert_eq!(info.bucket, "v1");
        assert_eq!(info.name, "docs/a.txt");
        assert_eq!(info.size, 5);
        assert_eq!(info.etag, "5d41402abc4b2a76b9719d911017c592");
    }

    #[tokio::test]
    async fn test_get_object_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pb-1/v1/docs/a.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await.unwrap();
        let mut buf = Vec::new();
        backend
            .get_object(
                "pb-1",
                "v1/docs/a.txt",
                "v1",
                "docs/a.txt",
                None,
                &mut buf,
                "",
                &ObjectOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(buf, b"hello");
    }
}
