use anyhow::{Context, Result};
use log::info;
use reqwest::blocking::{
    multipart::{Form, Part},
    Client,
};
use std::{fs::File, path::Path, time::Instant};

use crate::send::SendOptions;

/// Posts `path` to `{server}/upload` the way the upload form does and returns
/// the server's reply, e.g. `File uploaded: 1700000000000-report.pdf`.
pub fn send_file(options: &SendOptions, path: &Path) -> Result<String> {
    let (file, filename, length) = open_upload(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    let part = Part::reader_with_length(file, length)
        .file_name(filename.clone())
        .mime_str(mime.as_ref())
        .context("Invalid MIME type")?;
    let form = Form::new().part(options.field.clone(), part);

    let client = Client::builder()
        .timeout(options.timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let url = format!("{}/upload", normalize_server(&options.server));

    info!("Uploading {} ({} bytes, {}) to {}", filename, length, mime, url);
    let start = Instant::now();
    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .context("Failed to send upload request")?;

    let status = response.status();
    let body = response.text().context("Failed to read upload response")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("Upload failed: {}: {}", status, body.trim()));
    }

    info!("Upload finished in {:.2}s", start.elapsed().as_secs_f64());
    Ok(body)
}

fn open_upload(path: &Path) -> Result<(File, String, u64)> {
    if path.is_dir() {
        return Err(anyhow::anyhow!(
            "{} is a directory, only single files can be uploaded",
            path.display()
        ));
    }
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let length = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    Ok((file, filename, length))
}

fn normalize_server(server: &str) -> String {
    server.trim_end_matches('/').to_string()
}
