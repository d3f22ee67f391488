//! Integration tests for the standalone bucket sub-configuration resources.

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tfs3_provider::{AwsClient, ResourceRegistry};

    use crate::{provider_client, registry, test_bucket_name};

    async fn with_bucket(client: &AwsClient, registry: &ResourceRegistry, prefix: &str) -> Value {
        let bucket = test_bucket_name(prefix);
        registry
            .create(
                client,
                "aws_s3_bucket",
                json!({"bucket": bucket, "force_destroy": true}),
            )
            .await
            .expect("create bucket")
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_manage_website_configuration() {
        let client = provider_client();
        let registry = registry();
        let bucket_state = with_bucket(&client, &registry, "website").await;
        let bucket = bucket_state["id"].clone();

        let state = registry
            .create(
                &client,
                "aws_s3_bucket_website_configuration",
                json!({
                    "bucket": bucket,
                    "index_document": [{"suffix": "index.html"}],
                    "error_document": [{"key": "error.html"}],
                }),
            )
            .await
            .expect("create website");
        assert_eq!(state["index_document"][0]["suffix"], "index.html");
        assert!(
            state["website_endpoint"]
                .as_str()
                .is_some_and(|e| e.contains("s3-website"))
        );

        registry
            .delete(&client, "aws_s3_bucket_website_configuration", state.clone())
            .await
            .expect("delete website");
        let gone = registry
            .read(&client, "aws_s3_bucket_website_configuration", state)
            .await
            .expect("read website");
        assert!(gone.is_none());

        registry
            .delete(&client, "aws_s3_bucket", bucket_state)
            .await
            .expect("delete bucket");
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_manage_encryption_and_lifecycle() {
        let client = provider_client();
        let registry = registry();
        let bucket_state = with_bucket(&client, &registry, "config").await;
        let bucket = bucket_state["id"].clone();

        let encryption = registry
            .create(
                &client,
                "aws_s3_bucket_server_side_encryption_configuration",
                json!({
                    "bucket": bucket,
                    "rule": [{
                        "apply_server_side_encryption_by_default": [{"sse_algorithm": "AES256"}],
                    }],
                }),
            )
            .await
            .expect("create encryption");
        assert_eq!(
            encryption["rule"][0]["apply_server_side_encryption_by_default"][0]["sse_algorithm"],
            "AES256"
        );

        let lifecycle = registry
            .create(
                &client,
                "aws_s3_bucket_lifecycle_configuration",
                json!({
                    "bucket": bucket,
                    "rule": [{
                        "id": "expire-logs",
                        "status": "Enabled",
                        "filter": [{"prefix": "logs/"}],
                        "expiration": [{"days": 30}],
                    }],
                }),
            )
            .await
            .expect("create lifecycle");
        assert_eq!(lifecycle["rule"][0]["id"], "expire-logs");

        registry
            .delete(&client, "aws_s3_bucket_lifecycle_configuration", lifecycle)
            .await
            .expect("delete lifecycle");
        registry
            .delete(
                &client,
                "aws_s3_bucket_server_side_encryption_configuration",
                encryption,
            )
            .await
            .expect("delete encryption");
        registry
            .delete(&client, "aws_s3_bucket", bucket_state)
            .await
            .expect("delete bucket");
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_manage_policy_and_public_access_block() {
        let client = provider_client();
        let registry = registry();
        let bucket_state = with_bucket(&client, &registry, "policy").await;
        let bucket = bucket_state["id"].as_str().unwrap_or_default().to_owned();

        let pab = registry
            .create(
                &client,
                "aws_s3_bucket_public_access_block",
                json!({"bucket": bucket, "block_public_acls": true, "block_public_policy": false}),
            )
            .await
            .expect("create public access block");
        assert_eq!(pab["block_public_acls"], true);

        let document = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{bucket}/*"),
            }],
        });
        let policy = registry
            .create(
                &client,
                "aws_s3_bucket_policy",
                json!({"bucket": bucket, "policy": document.to_string()}),
            )
            .await
            .expect("create policy");
        assert_eq!(policy["id"], bucket.as_str());

        registry
            .delete(&client, "aws_s3_bucket_policy", policy)
            .await
            .expect("delete policy");
        registry
            .delete(&client, "aws_s3_bucket_public_access_block", pab)
            .await
            .expect("delete public access block");
        registry
            .delete(&client, "aws_s3_bucket", bucket_state)
            .await
            .expect("delete bucket");
    }
}
