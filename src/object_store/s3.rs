//! S3-compatible presigner backend. Issues time-limited PUT/GET URLs
//! (AWS SigV4) and otherwise leaves the actual bytes entirely to the
//! client talking directly to the object store.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

use super::{ObjectStore, ObjectStoreError, UploadSlot};

type HmacSha256 = Hmac<Sha256>;

pub struct S3Presigner {
    endpoint: String,
    bucket: String,
    region: String,
    access_key: String,
    secret_key: String,
    put_ttl_s: u64,
    get_ttl_s: u64,
}

impl S3Presigner {
    #[must_use]
    pub fn new(
        endpoint: String,
        bucket: String,
        region: String,
        access_key: String,
        secret_key: String,
        put_ttl_s: u64,
        get_ttl_s: u64,
    ) -> Self {
        Self { endpoint, bucket, region, access_key, secret_key, put_ttl_s, get_ttl_s }
    }

    fn presign(&self, method: &str, file_key: &str, ttl_s: u64, now: chrono::DateTime<Utc>) -> String {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let credential_scope = format!("{date_stamp}/{}/s3/aws4_request", self.region);
        let host = host_of(&self.endpoint);
        let canonical_uri = format!("/{}/{}", self.bucket, file_key);

        let mut query = vec![
            ("X-Amz-Algorithm".to_owned(), "AWS4-HMAC-SHA256".to_owned()),
            ("X-Amz-Credential".to_owned(), format!("{}/{credential_scope}", self.access_key)),
            ("X-Amz-Date".to_owned(), amz_date.clone()),
            ("X-Amz-Expires".to_owned(), ttl_s.to_string()),
            ("X-Amz-SignedHeaders".to_owned(), "host".to_owned()),
        ];
        query.sort();
        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_headers = format!("host:{host}\n");
        let canonical_request = format!(
            "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\nhost\nUNSIGNED-PAYLOAD"
        );
        let hashed_canonical_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));

        let string_to_sign =
            format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{hashed_canonical_request}");

        let signing_key = self.derive_signing_key(&date_stamp);
        let signature = hex::encode(hmac_sign(&signing_key, string_to_sign.as_bytes()));

        format!(
            "https://{host}{canonical_uri}?{canonical_query}&X-Amz-Signature={signature}",
        )
    }

    fn derive_signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_date = hmac_sign(format!("AWS4{}", self.secret_key).as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sign(&k_date, self.region.as_bytes());
        let k_service = hmac_sign(&k_region, b"s3");
        hmac_sign(&k_service, b"aws4_request")
    }
}

fn hmac_sign(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts key of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn host_of(endpoint: &str) -> String {
    endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint)
        .to_owned()
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn mint_file_key(filename: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: u64 = rng.gen();
    let safe_name: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{suffix:016x}-{safe_name}")
}

#[async_trait]
impl ObjectStore for S3Presigner {
    async fn issue_upload_slot(&self, filename: &str, _content_type: &str) -> Result<UploadSlot, ObjectStoreError> {
        let file_key = mint_file_key(filename);
        let now = Utc::now();
        Ok(UploadSlot {
            upload_url: self.presign("PUT", &file_key, self.put_ttl_s, now),
            download_url: self.presign("GET", &file_key, self.get_ttl_s, now),
            file_key,
            expires_in_s: self.put_ttl_s,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presigner() -> S3Presigner {
        S3Presigner::new(
            "https://s3.example.com".into(),
            "pairsync-bucket".into(),
            "us-east-1".into(),
            "AKIDEXAMPLE".into(),
            "secretkey".into(),
            300,
            3600,
        )
    }

    #[tokio::test]
    async fn issues_distinct_put_and_get_urls() {
        let slot = presigner().issue_upload_slot("clip.txt", "text/plain").await.unwrap();
        assert!(slot.upload_url.contains("X-Amz-Signature="));
        assert!(slot.download_url.contains("X-Amz-Signature="));
        assert_ne!(slot.upload_url, slot.download_url);
        assert_eq!(slot.expires_in_s, 300);
    }
}
