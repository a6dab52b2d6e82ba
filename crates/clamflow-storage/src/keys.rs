//! Shared key validation for storage backends.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::traits::{StorageError, StorageResult};

/// Characters left as-is in an S3 copy source; everything else is escaped.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Validate a bucket name and object key before touching a backend.
pub fn validate_location(bucket: &str, key: &str) -> StorageResult<()> {
    if bucket.is_empty() || bucket.contains('/') || bucket.contains("..") {
        return Err(StorageError::InvalidKey(format!(
            "invalid bucket name: {:?}",
            bucket
        )));
    }

    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\0')
        || key.split('/').any(|segment| segment == "..")
    {
        return Err(StorageError::InvalidKey(format!("invalid object key: {:?}", key)));
    }

    Ok(())
}

/// `bucket/key` with the key URL-encoded, as required by S3 CopyObject.
#[cfg_attr(not(feature = "storage-s3"), allow(dead_code))]
pub fn copy_source(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, utf8_percent_encode(key, COPY_SOURCE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_keys() {
        assert!(validate_location("staging", "a/b/c.txt").is_ok());
        assert!(validate_location("staging", "report..final.pdf").is_ok());
    }

    #[test]
    fn rejects_traversal_and_absolute_keys() {
        assert!(validate_location("staging", "../etc/passwd").is_err());
        assert!(validate_location("staging", "a/../../b").is_err());
        assert!(validate_location("staging", "/etc/passwd").is_err());
        assert!(validate_location("staging", "").is_err());
        assert!(validate_location("../staging", "a.txt").is_err());
        assert!(validate_location("", "a.txt").is_err());
    }

    #[test]
    fn copy_source_escapes_key_but_keeps_separators() {
        assert_eq!(
            copy_source("staging", "dir/my file+1.txt"),
            "staging/dir/my%20file%2B1.txt"
        );
    }
}
