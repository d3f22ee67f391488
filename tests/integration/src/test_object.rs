//! Object resource and data source integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{provider_client, registry, s3_client, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_upload_update_and_delete_object() {
        let client = provider_client();
        let registry = registry();
        let bucket = test_bucket_name("object");
        let bucket_state = registry
            .create(&client, "aws_s3_bucket", json!({"bucket": bucket}))
            .await
            .expect("create bucket");

        let plan = json!({
            "bucket": bucket,
            "key": "notes/hello.txt",
            "content": "hello",
            "content_type": "text/plain",
            "tags": {"env": "test"},
        });
        let state = registry
            .create(&client, "aws_s3_object", plan.clone())
            .await
            .expect("create object");
        assert_eq!(state["etag"], "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(state["tags"]["env"], "test");

        let mut retagged = plan.clone();
        retagged["tags"] = json!({"env": "prod"});
        let state = registry
            .update(&client, "aws_s3_object", state, retagged)
            .await
            .expect("retag object");
        assert_eq!(state["tags"]["env"], "prod");

        let data = registry
            .read_data(
                &client,
                "aws_s3_object",
                json!({"bucket": bucket, "key": "notes/hello.txt"}),
            )
            .await
            .expect("object data source");
        assert_eq!(data["body"], "hello");

        registry
            .delete(&client, "aws_s3_object", state)
            .await
            .expect("delete object");
        let head = s3_client()
            .head_object()
            .bucket(&bucket)
            .key("notes/hello.txt")
            .send()
            .await;
        assert!(head.is_err(), "object should be gone");

        registry
            .delete(&client, "aws_s3_bucket", bucket_state)
            .await
            .expect("delete bucket");
    }
}
