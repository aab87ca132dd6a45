use std::env;
use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::{eyre, Result};
use resumable_upload::{get_http_client, Backoff, NewUpload, UploadConfig, Uploader};
use serde_json::json;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = env::args().skip(1);
    let file_path = args
        .next()
        .ok_or_else(|| eyre!("usage: resumable-upload <file> [content-type] [file-id]"))?;
    let content_type = args
        .next()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file_id = args.next();

    let token = env::var("UPLOAD_ACCESS_TOKEN").ok();
    let client = get_http_client(token.as_deref())?;
    let config = UploadConfig::from_env()?;
    let uploader = Uploader::new(Arc::new(client), Arc::new(Backoff::default()), config);

    let file = File::open(&file_path).await?;
    let size = file.metadata().await?.len();
    let name = Path::new(&file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.clone());
    let metadata = json!({ "name": name, "mimeType": content_type });

    let new = NewUpload {
        remote: &file_path,
        size,
        content_type: &content_type,
        file_id: file_id.as_deref(),
        metadata: &metadata,
    };
    let mut source = BufReader::new(file);
    let object = uploader.upload_object(&new, &mut source).await?;

    println!("{}", serde_json::to_string_pretty(&object)?);
    Ok(())
}
