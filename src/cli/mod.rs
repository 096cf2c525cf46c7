pub mod data;
pub mod doctor;
pub mod notes;
pub mod re_embed;
pub mod recall;
pub mod reset;
pub mod run;
pub mod traces;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use moat::config::{EmbeddingConfig, MoatConfig};
use moat::embedding::local::{MODEL_FILE, TOKENIZER_FILE};
use moat::embedding::{self, EmbeddingProvider};

const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx";
const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

/// Print the effective configuration with secrets redacted.
pub fn show_config(config: &MoatConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    match config.ensure_required() {
        Ok(()) => eprintln!("Required settings: OK"),
        Err(e) => eprintln!("Required settings: {e}"),
    }
    Ok(())
}

/// Build the configured embedding provider behind an `Arc` for `spawn_blocking`.
pub(crate) fn embedding_provider(config: &MoatConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = embedding::create_provider(&config.embedding)
        .context("failed to create embedding provider")?;
    Ok(Arc::from(provider))
}

/// Embed one text off the async runtime.
pub(crate) async fn embed_one(provider: &Arc<dyn EmbeddingProvider>, text: &str) -> Result<Vec<f32>> {
    let provider = Arc::clone(provider);
    let text = text.to_string();
    tokio::task::spawn_blocking(move || provider.embed(&text)).await?
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let cache_dir = moat::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    for (name, url, note) in [
        (MODEL_FILE, MODEL_URL, " (~90MB)"),
        (TOKENIZER_FILE, TOKENIZER_URL, ""),
    ] {
        let dest = cache_dir.join(name);
        if dest.exists() {
            println!("{name} already exists at {}", dest.display());
            continue;
        }
        println!("Downloading {name}{note}...");
        download_file(url, &dest).await?;
        println!("Saved to {}", dest.display());
    }

    println!("Model download complete. Ready for use.");
    Ok(())
}

/// Download a file with a progress bar, chunk by chunk. Writes to a temp
/// file then renames. Returns the number of bytes written.
async fn download_file(url: &str, dest: &Path) -> Result<u64> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk).await.context("error writing to file")?;
        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve one HTTP response whose body arrives in separate writes.
    async fn serve_once(status: &'static str, parts: Vec<&'static [u8]>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await.unwrap();
            let len: usize = parts.iter().map(|p| p.len()).sum();
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n"
            );
            sock.write_all(head.as_bytes()).await.unwrap();
            for part in parts {
                sock.write_all(part).await.unwrap();
                sock.flush().await.unwrap();
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        });
        format!("http://{addr}/file")
    }

    #[tokio::test]
    async fn download_streams_body_to_destination() {
        let url = serve_once("200 OK", vec![&b"first chunk|"[..], &b"second chunk"[..]]).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");

        let written = download_file(&url, &dest).await.unwrap();

        assert_eq!(written, 24);
        assert_eq!(std::fs::read(&dest).unwrap(), b"first chunk|second chunk");
        assert!(!dest.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn failed_download_leaves_no_file() {
        let url = serve_once("404 Not Found", vec![&b"missing"[..]]).await;
        let tmp = tempfile::TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");

        let err = download_file(&url, &dest).await.unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(!dest.exists());
    }
}
