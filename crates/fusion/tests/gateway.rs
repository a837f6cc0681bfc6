//! End-to-end gateway tests.
//!
//! Stands up an in-process MGS, an in-process MDS shard and a mock vendor
//! endpoint, then drives the full store surface across them.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use fusion_core::error::Error;
use fusion_core::stream::PutStream;
use fusion_core::types::{CompletePart, ObjectOptions};
use fusion_meta::proto;
use fusion_meta::proto::mds_service_server::{MdsService, MdsServiceServer};
use fusion_meta::proto::mgs_service_server::{MgsService, MgsServiceServer};
use fusion_store::{FusionStore, ObjectLayer};
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use wiremock::matchers::{method, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok_status() -> Option<proto::Status> {
    Some(proto::Status { code: proto::Code::Ok as i32, msg: String::new() })
}

fn status(code: proto::Code, msg: &str) -> Option<proto::Status> {
    Some(proto::Status { code: code as i32, msg: msg.to_string() })
}

#[derive(Clone, Default)]
struct MockMgs {
    pools: Vec<proto::Pool>,
    buckets: HashMap<String, Vec<proto::Bucket>>,
    mds: Vec<proto::Mds>,
    vbuckets: Arc<Mutex<HashMap<String, proto::VBucket>>>,
}

#[tonic::async_trait]
impl MgsService for MockMgs {
    async fn list_pools(
        &self,
        _req: Request<proto::ListPoolsRequest>,
    ) -> Result<Response<proto::ListPoolsResponse>, Status> {
        Ok(Response::new(proto::ListPoolsResponse {
            status: ok_status(),
            pools: self.pools.clone(),
        }))
    }

    async fn list_buckets(
        &self,
        req: Request<proto::ListBucketsRequest>,
    ) -> Result<Response<proto::ListBucketsResponse>, Status> {
        let buckets = self.buckets.get(&req.into_inner().pool_id).cloned().unwrap_or_default();
        Ok(Response::new(proto::ListBucketsResponse { status: ok_status(), buckets }))
    }

    async fn list_mds(
        &self,
        _req: Request<proto::ListMdsRequest>,
    ) -> Result<Response<proto::ListMdsResponse>, Status> {
        Ok(Response::new(proto::ListMdsResponse {
            status: ok_status(),
            mds_list: self.mds.clone(),
        }))
    }

    async fn create_vbucket(
        &self,
        req: Request<proto::CreateVbucketRequest>,
    ) -> Result<Response<proto::CreateVbucketResponse>, Status> {
        let vbucket = req.into_inner().vbucket.unwrap_or_default();
        let mut vbuckets = self.vbuckets.lock();
        if vbuckets.contains_key(&vbucket.name) {
            return Ok(Response::new(proto::CreateVbucketResponse {
                status: status(proto::Code::AlreadyExists, "bucket already exists"),
            }));
        }
        vbuckets.insert(vbucket.name.clone(), vbucket);
        Ok(Response::new(proto::CreateVbucketResponse { status: ok_status() }))
    }

    async fn query_vbucket(
        &self,
        req: Request<proto::QueryVbucketRequest>,
    ) -> Result<Response<proto::QueryVbucketResponse>, Status> {
        let name = req.into_inner().name;
        let vbucket = self.vbuckets.lock().get(&name).cloned();
        let resp = match vbucket {
            Some(vbucket) => proto::QueryVbucketResponse {
                status: ok_status(),
                vbucket: Some(vbucket),
            },
            None => proto::QueryVbucketResponse {
                status: status(proto::Code::NotFound, "vbucket not found"),
                vbucket: None,
            },
        };
        Ok(Response::new(resp))
    }

    async fn delete_vbucket(
        &self,
        req: Request<proto::DeleteVbucketRequest>,
    ) -> Result<Response<proto::DeleteVbucketResponse>, Status> {
        self.vbuckets.lock().remove(&req.into_inner().name);
        Ok(Response::new(proto::DeleteVbucketResponse { status: ok_status() }))
    }

    async fn list_vbuckets(
        &self,
        _req: Request<proto::ListVbucketsRequest>,
    ) -> Result<Response<proto::ListVbucketsResponse>, Status> {
        Ok(Response::new(proto::ListVbucketsResponse {
            status: ok_status(),
            vbuckets: self.vbuckets.lock().values().cloned().collect(),
        }))
    }
}

#[derive(Clone, Default)]
struct MockMds {
    objects: Arc<Mutex<HashMap<(String, String), proto::Object>>>,
    multiparts: Arc<Mutex<HashMap<(String, String), proto::Multipart>>>,
    upload_counter: Arc<Mutex<u64>>,
}

#[tonic::async_trait]
impl MdsService for MockMds {
    async fn put_object(
        &self,
        req: Request<proto::PutObjectRequest>,
    ) -> Result<Response<proto::PutObjectResponse>, Status> {
        let object = req.into_inner().object.unwrap_or_default();
        self.objects.lock().insert((object.vbucket.clone(), object.name.clone()), object);
        Ok(Response::new(proto::PutObjectResponse { status: ok_status() }))
    }

    async fn query_object(
        &self,
        req: Request<proto::QueryObjectRequest>,
    ) -> Result<Response<proto::QueryObjectResponse>, Status> {
        let req = req.into_inner();
        let object = self.objects.lock().get(&(req.vbucket, req.object)).cloned();
        let resp = match object {
            Some(object) => proto::QueryObjectResponse { status: ok_status(), object: Some(object) },
            None => proto::QueryObjectResponse {
                status: status(proto::Code::NotFound, "object not found"),
                object: None,
            },
        };
        Ok(Response::new(resp))
    }

    async fn delete_object(
        &self,
        req: Request<proto::DeleteObjectRequest>,
    ) -> Result<Response<proto::DeleteObjectResponse>, Status> {
        let req = req.into_inner();
        self.objects.lock().remove(&(req.vbucket, req.object));
        Ok(Response::new(proto::DeleteObjectResponse { status: ok_status() }))
    }

    async fn list_objects(
        &self,
        req: Request<proto::ListObjectsRequest>,
    ) -> Result<Response<proto::ListObjectsResponse>, Status> {
        let req = req.into_inner();
        let mut names: Vec<proto::Object> = self
            .objects
            .lock()
            .values()
            .filter(|o| o.vbucket == req.vbucket && o.name.starts_with(&req.prefix))
            .filter(|o| req.marker.is_empty() || o.name > req.marker)
            .cloned()
            .collect();
        names.sort_by(|a, b| a.name.cmp(&b.name));
        let truncated = names.len() > req.limit as usize;
        names.truncate(req.limit as usize);
        let next_marker = if truncated {
            names.last().map(|o| o.name.clone()).unwrap_or_default()
        } else {
            String::new()
        };
        Ok(Response::new(proto::ListObjectsResponse {
            status: ok_status(),
            objects: names,
            common_prefixes: Vec::new(),
            next_marker,
        }))
    }

    async fn create_multipart(
        &self,
        req: Request<proto::CreateMultipartRequest>,
    ) -> Result<Response<proto::CreateMultipartResponse>, Status> {
        let mut record = req.into_inner().multipart.unwrap_or_default();
        let mut counter = self.upload_counter.lock();
        *counter += 1;
        record.upload_id = format!("gw-upload-{}", *counter);
        let upload_id = record.upload_id.clone();
        self.multiparts.lock().insert((record.vbucket.clone(), upload_id.clone()), record);
        Ok(Response::new(proto::CreateMultipartResponse { status: ok_status(), upload_id }))
    }

    async fn query_multipart(
        &self,
        req: Request<proto::QueryMultipartRequest>,
    ) -> Result<Response<proto::QueryMultipartResponse>, Status> {
        let req = req.into_inner();
        let record = self.multiparts.lock().get(&(req.vbucket, req.upload_id)).cloned();
        let resp = match record {
            Some(record) => proto::QueryMultipartResponse {
                status: ok_status(),
                multipart: Some(record),
            },
            None => proto::QueryMultipartResponse {
                status: status(proto::Code::NotFound, "multipart not found"),
                multipart: None,
            },
        };
        Ok(Response::new(resp))
    }

    async fn delete_multipart(
        &self,
        req: Request<proto::DeleteMultipartRequest>,
    ) -> Result<Response<proto::DeleteMultipartResponse>, Status> {
        let req = req.into_inner();
        self.multiparts.lock().remove(&(req.vbucket, req.upload_id));
        Ok(Response::new(proto::DeleteMultipartResponse { status: ok_status() }))
    }

    async fn list_multiparts(
        &self,
        req: Request<proto::ListMultipartsRequest>,
    ) -> Result<Response<proto::ListMultipartsResponse>, Status> {
        let req = req.into_inner();
        let multiparts = self
            .multiparts
            .lock()
            .values()
            .filter(|m| m.vbucket == req.vbucket)
            .cloned()
            .collect();
        Ok(Response::new(proto::ListMultipartsResponse {
            status: ok_status(),
            multiparts,
            next: String::new(),
        }))
    }
}

async fn spawn_mgs(mock: MockMgs) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        Server::builder()
            .add_service(MgsServiceServer::new(mock))
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    addr
}

async fn spawn_mds(mock: MockMds) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        Server::builder()
            .add_service(MdsServiceServer::new(mock))
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    addr
}

fn pool(id: &str, vendor: &str, status: &str, endpoint: &str) -> proto::Pool {
    proto::Pool {
        id: id.to_string(),
        name: id.to_string(),
        vendor: vendor.to_string(),
        status: status.to_string(),
        endpoint: endpoint.to_string(),
        creds: Some(proto::Credentials {
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
        }),
        ..Default::default()
    }
}

fn bucket(id: &str, pool_id: &str, status: &str) -> proto::Bucket {
    proto::Bucket {
        id: id.to_string(),
        name: id.to_string(),
        pool_id: pool_id.to_string(),
        status: status.to_string(),
        ..Default::default()
    }
}

fn vbucket(name: &str, pool: &str, mds: &str) -> proto::VBucket {
    proto::VBucket {
        id: format!("vb-{name}"),
        name: name.to_string(),
        status: "active".to_string(),
        owner: "admin".to_string(),
        pool: pool.to_string(),
        mds: mds.to_string(),
        location: "bj".to_string(),
        ..Default::default()
    }
}

struct Fixture {
    store: FusionStore,
    mds: MockMds,
}

/// One active s3 pool with the given physical buckets, one MDS shard, one
/// vbucket `v1`. The vendor endpoint must already answer HEAD probes.
async fn fixture(vendor: &MockServer, physical_buckets: &[&str]) -> Fixture {
    let mds = MockMds::default();
    let mds_addr = spawn_mds(mds.clone()).await;
    let mgs = MockMgs {
        pools: vec![pool("p-aws-1", "s3", "active", &vendor.uri())],
        buckets: HashMap::from([(
            "p-aws-1".to_string(),
            physical_buckets.iter().map(|b| bucket(b, "p-aws-1", "active")).collect(),
        )]),
        mds: vec![proto::Mds {
            id: "mds-a".to_string(),
            name: "mds-a".to_string(),
            status: "active".to_string(),
            addrs: vec![mds_addr.to_string()],
            ..Default::default()
        }],
        vbuckets: Arc::new(Mutex::new(HashMap::from([(
            "v1".to_string(),
            vbucket("v1", "p-aws-1", "mds-a"),
        )]))),
    };
    let mgs_addr = spawn_mgs(mgs).await;
    let store = FusionStore::connect(&mgs_addr.to_string()).await.unwrap();
    Fixture { store, mds }
}

async fn mount_probe(vendor: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(vendor)
        .await;
}

fn put_opts() -> ObjectOptions {
    ObjectOptions::default()
}

#[tokio::test]
async fn test_put_get_info_delete_round_trip() {
    let vendor = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/pb-\d+/v1/docs/a\.txt$"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"etag-hello\""))
        .mount(&vendor)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/pb-\d+/v1/docs/a\.txt$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
        .mount(&vendor)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/pb-\d+/v1/docs/a\.txt$"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&vendor)
        .await;
    mount_probe(&vendor).await;

    let fx = fixture(&vendor, &["pb-1"]).await;
    let info = fx
        .store
        .put_object("v1", "docs/a.txt", PutStream::from_bytes(Bytes::from_static(b"hello")), &put_opts())
        .await
        .unwrap();
    assert_eq!(info.size, 5);
    assert_eq!(info.etag, "etag-hello");

    // The record carries the placement and the physical key format held.
    {
        let objects = fx.mds.objects.lock();
        let record = objects.get(&("v1".to_string(), "docs/a.txt".to_string())).unwrap();
        assert_eq!(record.pool, "p-aws-1");
        assert_eq!(record.bucket, "pb-1");
        assert_eq!(record.size, 5);
    }

    let info = fx.store.get_object_info("v1", "docs/a.txt", &put_opts()).await.unwrap();
    assert_eq!(info.size, 5);
    assert_eq!(info.etag, "etag-hello");

    let mut reader = fx
        .store
        .get_object_reader("v1", "docs/a.txt", None, &put_opts())
        .await
        .unwrap();
    assert_eq!(reader.object_info().size, 5);
    let mut body = Vec::new();
    reader.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"hello");

    fx.store.delete_object("v1", "docs/a.txt", &put_opts()).await.unwrap();
    let err = fx.store.get_object_info("v1", "docs/a.txt", &put_opts()).await.unwrap_err();
    assert!(matches!(err, Error::ObjectNotFound { .. }));
}

#[tokio::test]
async fn test_round_robin_spreads_across_buckets() {
    let vendor = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"e\""))
        .mount(&vendor)
        .await;
    mount_probe(&vendor).await;

    let fx = fixture(&vendor, &["pb-1", "pb-2"]).await;
    for i in 0..4 {
        fx.store
            .put_object(
                "v1",
                &format!("k-{i}"),
                PutStream::from_bytes(Bytes::from_static(b"x")),
                &put_opts(),
            )
            .await
            .unwrap();
    }
    // Exact alternation is covered by the pool manager's unit test; the
    // counter is process-wide, so here we only assert every placement
    // landed in an active bucket of the pool.
    let objects = fx.mds.objects.lock();
    assert_eq!(objects.len(), 4);
    assert!(objects.values().all(|o| o.bucket == "pb-1" || o.bucket == "pb-2"));
    assert!(objects.values().all(|o| o.pool == "p-aws-1"));
}

#[tokio::test]
async fn test_bucket_surface() {
    let vendor = MockServer::start().await;
    mount_probe(&vendor).await;
    let fx = fixture(&vendor, &["pb-1"]).await;

    let info = fx.store.get_bucket_info("v1").await.unwrap();
    assert_eq!(info.name, "v1");

    let err = fx.store.get_bucket_info("nope").await.unwrap_err();
    assert!(matches!(err, Error::BucketNotFound(_)));

    let buckets = fx.store.list_buckets().await.unwrap();
    assert_eq!(buckets.len(), 1);

    assert!(matches!(
        fx.store.make_bucket("v2", "bj").await.unwrap_err(),
        Error::NotImplemented
    ));
    assert!(matches!(
        fx.store.delete_bucket("v1").await.unwrap_err(),
        Error::NotImplemented
    ));
    assert!(matches!(
        fx.store
            .list_objects_v2("v1", "", "", "", 100, "")
            .await
            .unwrap_err(),
        Error::NotImplemented
    ));

    // The admin path refuses names that already exist.
    let err = fx.store.cluster().make_bucket("v1", "bj").await.unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn test_list_objects() {
    let vendor = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"e\""))
        .mount(&vendor)
        .await;
    mount_probe(&vendor).await;

    let fx = fixture(&vendor, &["pb-1"]).await;
    for key in ["docs/a.txt", "docs/b.txt", "other.txt"] {
        fx.store
            .put_object("v1", key, PutStream::from_bytes(Bytes::from_static(b"x")), &put_opts())
            .await
            .unwrap();
    }

    let listing = fx.store.list_objects("v1", "docs/", "", "", 1000).await.unwrap();
    assert_eq!(listing.objects.len(), 2);
    assert!(!listing.is_truncated);
    assert_eq!(listing.next_marker, "");
    assert_eq!(listing.objects[0].name, "docs/a.txt");

    // Above the scan cap the request is rejected before any RPC.
    let err = fx.store.list_objects("v1", "", "", "", 1001).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    // Truncated page surfaces a resume marker.
    let listing = fx.store.list_objects("v1", "docs/", "", "", 1).await.unwrap();
    assert!(listing.is_truncated);
    assert_eq!(listing.next_marker, "docs/a.txt");

    let err = fx.store.list_objects("NOT-valid!", "", "", "", 10).await.unwrap_err();
    assert!(matches!(err, Error::InvalidBucketName(_)));
}

#[tokio::test]
async fn test_multipart_upload_and_abort() {
    let vendor = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(query_param("uploadId", "phys-1"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"part-etag\""))
        .mount(&vendor)
        .await;
    Mock::given(method("GET"))
        .and(query_param("uploadId", "phys-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListPartsResult>
  <Bucket>pb-1</Bucket>
  <Key>v1/big.bin</Key>
  <UploadId>phys-1</UploadId>
  <PartNumberMarker>0</PartNumberMarker>
  <NextPartNumberMarker>2</NextPartNumberMarker>
  <MaxParts>1000</MaxParts>
  <IsTruncated>false</IsTruncated>
  <Part>
    <PartNumber>1</PartNumber>
    <ETag>"p1"</ETag>
    <Size>8</Size>
    <LastModified>2026-01-01T00:00:00.000Z</LastModified>
  </Part>
  <Part>
    <PartNumber>2</PartNumber>
    <ETag>"p2"</ETag>
    <Size>4</Size>
    <LastModified>2026-01-01T00:00:01.000Z</LastModified>
  </Part>
</ListPartsResult>"#,
        ))
        .mount(&vendor)
        .await;
    Mock::given(method("DELETE"))
        .and(query_param("uploadId", "phys-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&vendor)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult>
  <Bucket>pb-1</Bucket>
  <Key>v1/big.bin</Key>
  <UploadId>phys-1</UploadId>
</InitiateMultipartUploadResult>"#,
        ))
        .mount(&vendor)
        .await;
    mount_probe(&vendor).await;

    let fx = fixture(&vendor, &["pb-1"]).await;
    let upload_id = fx.store.new_multipart_upload("v1", "big.bin", &put_opts()).await.unwrap();
    assert_eq!(upload_id, "gw-upload-1");
    assert!(fx
        .mds
        .multiparts
        .lock()
        .contains_key(&("v1".to_string(), upload_id.clone())));

    let part = fx
        .store
        .put_object_part(
            "v1",
            "big.bin",
            &upload_id,
            1,
            PutStream::from_bytes(Bytes::from_static(b"12345678")),
            &put_opts(),
        )
        .await
        .unwrap();
    assert_eq!(part.part_number, 1);
    assert_eq!(part.etag, "part-etag");

    // Listings carry gateway-visible names, not the physical ones.
    let parts = fx
        .store
        .list_object_parts("v1", "big.bin", &upload_id, 0, 1000, &put_opts())
        .await
        .unwrap();
    assert_eq!(parts.bucket, "v1");
    assert_eq!(parts.object, "big.bin");
    assert_eq!(parts.upload_id, upload_id);
    assert_eq!(parts.parts.len(), 2);
    assert_eq!(parts.parts[0].etag, "p1");

    let echoed = fx
        .store
        .get_multipart_info("v1", "big.bin", &upload_id, &put_opts())
        .await
        .unwrap();
    assert_eq!(echoed.upload_id, upload_id);

    fx.store.abort_multipart_upload("v1", "big.bin", &upload_id, &put_opts()).await.unwrap();
    assert!(!fx
        .mds
        .multiparts
        .lock()
        .contains_key(&("v1".to_string(), upload_id.clone())));

    // The upload is gone; further parts are an error.
    let err = fx
        .store
        .put_object_part(
            "v1",
            "big.bin",
            &upload_id,
            2,
            PutStream::from_bytes(Bytes::from_static(b"st")),
            &put_opts(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UploadNotFound(_)));
}

#[tokio::test]
async fn test_complete_multipart_writes_object_record() {
    let vendor = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/pb-1/v1/big\.bin$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"agg-2\"")
                .insert_header("Content-Length", "12")
                .insert_header("Last-Modified", "Thu, 01 Jan 2026 00:00:02 GMT"),
        )
        .mount(&vendor)
        .await;
    Mock::given(method("POST"))
        .and(query_param("uploadId", "phys-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult>
  <Location>http://vendor/pb-1/v1/big.bin</Location>
  <Bucket>pb-1</Bucket>
  <Key>v1/big.bin</Key>
  <ETag>"agg-2"</ETag>
</CompleteMultipartUploadResult>"#,
        ))
        .mount(&vendor)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult>
  <Bucket>pb-1</Bucket>
  <Key>v1/big.bin</Key>
  <UploadId>phys-1</UploadId>
</InitiateMultipartUploadResult>"#,
        ))
        .mount(&vendor)
        .await;
    mount_probe(&vendor).await;

    let fx = fixture(&vendor, &["pb-1"]).await;
    let upload_id = fx.store.new_multipart_upload("v1", "big.bin", &put_opts()).await.unwrap();

    let parts = vec![
        CompletePart { part_number: 1, etag: "p1".to_string() },
        CompletePart { part_number: 2, etag: "p2".to_string() },
    ];
    let info = fx
        .store
        .complete_multipart_upload("v1", "big.bin", &upload_id, &parts, &put_opts())
        .await
        .unwrap();
    assert_eq!(info.etag, "agg-2");
    assert_eq!(info.size, 12);

    // Terminal state: multipart record gone, object record present.
    assert!(!fx
        .mds
        .multiparts
        .lock()
        .contains_key(&("v1".to_string(), upload_id)));
    let objects = fx.mds.objects.lock();
    let record = objects.get(&("v1".to_string(), "big.bin".to_string())).unwrap();
    assert_eq!(record.pool, "p-aws-1");
    assert_eq!(record.bucket, "pb-1");
    assert_eq!(record.etag, "agg-2");
}

#[tokio::test]
async fn test_delete_objects_reports_independent_results() {
    let vendor = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"e\""))
        .mount(&vendor)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&vendor)
        .await;
    mount_probe(&vendor).await;

    let fx = fixture(&vendor, &["pb-1"]).await;
    fx.store
        .put_object("v1", "docs/a.txt", PutStream::from_bytes(Bytes::from_static(b"x")), &put_opts())
        .await
        .unwrap();

    let objects = vec!["docs/a.txt".to_string(), "missing.txt".to_string()];
    let results = fx.store.delete_objects("v1", &objects, &put_opts()).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().object_name, "docs/a.txt");
    assert!(matches!(results[1], Err(Error::ObjectNotFound { .. })));
}

#[tokio::test]
async fn test_unknown_vendor_is_fatal_at_startup() {
    let mds = MockMds::default();
    let mds_addr = spawn_mds(mds).await;
    let mgs = MockMgs {
        pools: vec![pool("p-tape-1", "tape", "active", "http://localhost:1")],
        buckets: HashMap::new(),
        mds: vec![proto::Mds {
            id: "mds-a".to_string(),
            status: "active".to_string(),
            addrs: vec![mds_addr.to_string()],
            ..Default::default()
        }],
        vbuckets: Arc::new(Mutex::new(HashMap::new())),
    };
    let mgs_addr = spawn_mgs(mgs).await;
    let err = FusionStore::connect(&mgs_addr.to_string()).await.unwrap_err();
    assert!(err.to_string().contains("unknown vendor"));
}

#[tokio::test]
async fn test_inactive_pool_is_placement_unresolved() {
    // The pool is standby, so it is never loaded and no adapter exists;
    // the vbucket still references it.
    let mds = MockMds::default();
    let mds_addr = spawn_mds(mds).await;
    let mgs = MockMgs {
        pools: vec![pool("p-aws-1", "s3", "standby", "http://localhost:1")],
        buckets: HashMap::new(),
        mds: vec![proto::Mds {
            id: "mds-a".to_string(),
            status: "active".to_string(),
            addrs: vec![mds_addr.to_string()],
            ..Default::default()
        }],
        vbuckets: Arc::new(Mutex::new(HashMap::from([(
            "v1".to_string(),
            vbucket("v1", "p-aws-1", "mds-a"),
        )]))),
    };
    let mgs_addr = spawn_mgs(mgs).await;
    let store = FusionStore::connect(&mgs_addr.to_string()).await.unwrap();

    let err = store
        .put_object("v1", "k", PutStream::from_bytes(Bytes::from_static(b"x")), &put_opts())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PlacementUnresolved(_)));
}
