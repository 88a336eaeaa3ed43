//! Bucket policy documents
//!
//! New buckets get an anonymous read/write policy so presigned and
//! public URLs handed to browsers work without further ACL setup.

use serde_json::json;

/// Anonymous read/write policy for a bucket
pub fn public_bucket_policy(bucket: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": [
                    "s3:GetBucketLocation",
                    "s3:ListBucket",
                    "s3:ListBucketMultipartUploads",
                ],
                "Resource": format!("arn:aws:s3:::{bucket}"),
            },
            {
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": [
                    "s3:GetObject",
                    "s3:PutObject",
                    "s3:DeleteObject",
                    "s3:ListMultipartUploadParts",
                    "s3:AbortMultipartUpload",
                ],
                "Resource": format!("arn:aws:s3:::{bucket}/*"),
            },
        ],
    })
    .to_string()
}
