use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024; // 8 MiB
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://www.googleapis.com/upload/drive/v3/files";
pub const DEFAULT_FIELDS: &str =
    "id,name,size,md5Checksum,trashed,modifiedTime,createdTime,mimeType,parents,webViewLink";
pub const STATUS_RESUME_INCOMPLETE: u16 = 308; // chunk accepted, more data expected
pub const LOW_LEVEL_RETRIES: u32 = 10; // attempts per call under the pacer
pub const MIN_SLEEP: Duration = Duration::from_millis(100);
pub const MAX_SLEEP: Duration = Duration::from_secs(2);
pub const DECAY_CONSTANT: u32 = 2; // bigger for slower decay
pub const MAX_CONNECTIONS: usize = 0; // 0 = unlimited concurrent calls
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const USER_AGENT: &str = concat!("resumable-upload/", env!("CARGO_PKG_VERSION"));
