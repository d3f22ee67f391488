//! Bucket resource integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{provider_client, registry, s3_client, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_create_read_and_destroy_bucket() {
        let client = provider_client();
        let registry = registry();
        let bucket = test_bucket_name("bucket");

        let state = registry
            .create(
                &client,
                "aws_s3_bucket",
                json!({"bucket": bucket, "tags": {"team": "storage"}}),
            )
            .await
            .expect("create bucket");
        assert_eq!(state["id"], bucket.as_str());
        assert_eq!(state["tags"]["team"], "storage");

        let raw = s3_client();
        let head = raw.head_bucket().bucket(&bucket).send().await;
        assert!(head.is_ok(), "head_bucket should succeed");

        let refreshed = registry
            .read(&client, "aws_s3_bucket", state.clone())
            .await
            .expect("read bucket")
            .expect("bucket present");
        assert_eq!(refreshed["arn"], format!("arn:aws:s3:::{bucket}"));

        registry
            .delete(&client, "aws_s3_bucket", state.clone())
            .await
            .expect("delete bucket");
        let gone = registry
            .read(&client, "aws_s3_bucket", state)
            .await
            .expect("read deleted bucket");
        assert!(gone.is_none(), "deleted bucket should leave state");
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_force_destroy_versioned_bucket() {
        let client = provider_client();
        let registry = registry();
        let bucket = test_bucket_name("force");

        let state = registry
            .create(
                &client,
                "aws_s3_bucket",
                json!({"bucket": bucket, "force_destroy": true}),
            )
            .await
            .expect("create bucket");
        registry
            .create(
                &client,
                "aws_s3_bucket_versioning",
                json!({"bucket": bucket, "versioning_configuration": [{"status": "Enabled"}]}),
            )
            .await
            .expect("enable versioning");

        let raw = s3_client();
        for body in ["one", "two", "three"] {
            raw.put_object()
                .bucket(&bucket)
                .key("doc.txt")
                .body(body.as_bytes().to_vec().into())
                .send()
                .await
                .expect("put_object");
        }

        registry
            .delete(&client, "aws_s3_bucket", state)
            .await
            .expect("force destroy");
        assert!(raw.head_bucket().bucket(&bucket).send().await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_create_buckets_concurrently() {
        let client = provider_client();
        let registry = registry();
        let names: Vec<String> = (0..3).map(|i| test_bucket_name(&format!("par{i}"))).collect();

        let creates = names.iter().map(|name| {
            registry.create(&client, "aws_s3_bucket", json!({"bucket": name}))
        });
        let states = futures::future::join_all(creates).await;

        for state in states {
            let state = state.expect("create bucket");
            registry
                .delete(&client, "aws_s3_bucket", state)
                .await
                .expect("delete bucket");
        }
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_import_bucket_and_describe_it() {
        let client = provider_client();
        let registry = registry();
        let bucket = test_bucket_name("import");

        let state = registry
            .create(&client, "aws_s3_bucket", json!({"bucket": bucket}))
            .await
            .expect("create bucket");

        let imported = registry
            .import(&client, "aws_s3_bucket", &bucket)
            .await
            .expect("import bucket");
        assert_eq!(imported["bucket"], bucket.as_str());

        let data = registry
            .read_data(&client, "aws_s3_bucket", json!({"bucket": bucket}))
            .await
            .expect("bucket data source");
        assert_eq!(data["region"], "us-east-1");

        registry
            .delete(&client, "aws_s3_bucket", state)
            .await
            .expect("delete bucket");
    }
}
