//! End-to-end tests of `Processor::process`.

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use rendition_core::error::StoreResult;
use rendition_core::pipeline::decode::{Probe, RecoveryCodec, StrictCodec, TolerantCodec};
use rendition_core::{
    BadImage, BlobStore, CodecError, Codecs, ImageInfo, MemoryBlobStore, ProcessingError,
    Processor, ProcessorConfig, RenditionError, StoreError,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + 2 * y) % 256) as u8])
    }))
}

/// Baseline JPEG from the `image` encoder, so truncation cuts scan data.
fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut buffer, format)
        .unwrap();
    buffer.into_inner()
}

/// Insert an EXIF APP1 segment with only an orientation tag.
fn with_orientation(jpeg: &[u8], code: u8) -> Vec<u8> {
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00]);
    app1.extend_from_slice(&[0x01, 0x00]);
    app1.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
    app1.extend_from_slice(&[code, 0x00, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn dims(bytes: &[u8]) -> (u32, u32) {
    image::load_from_memory(bytes).unwrap().dimensions()
}

fn unsaved() -> ProcessorConfig {
    ProcessorConfig {
        save_blob: false,
        ..Default::default()
    }
}

#[derive(Default)]
struct CountingFallback {
    recodes: AtomicUsize,
}

impl RecoveryCodec for CountingFallback {
    fn probe(&self, raw: &[u8]) -> Result<Probe, CodecError> {
        TolerantCodec.probe(raw)
    }

    fn recode(&self, raw: &[u8], quality: u8) -> Result<Vec<u8>, CodecError> {
        self.recodes.fetch_add(1, Ordering::SeqCst);
        TolerantCodec.recode(raw, quality)
    }
}

struct FailingStore;

#[async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, _key: &str, _data: Vec<u8>, _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        Err(StoreError::NotFound(key.to_string()))
    }
}

#[tokio::test]
async fn test_default_sizes_for_landscape_jpeg() {
    let processed = Processor::new(unsaved())
        .process(jpeg(1000, 750))
        .await
        .unwrap();

    assert_eq!(processed.results.len(), 3);
    assert_eq!(dims(&processed.results["50x50c"]), (50, 50));
    assert_eq!(dims(&processed.results["300x300"]), (300, 225));
    assert_eq!(dims(&processed.results["600x450"]), (600, 450));

    let info = &processed.info;
    assert_eq!(info.get("width"), Some("1000"));
    assert_eq!(info.get("height"), Some("750"));
    assert_eq!(info.get("format"), Some("JPEG"));
    assert_eq!(info.get("mode"), Some("RGB"));
    assert_eq!(info.get("checksum").map(str::len), Some(64));
}

#[tokio::test]
async fn test_exif_orientation_rotates_output() {
    let raw = with_orientation(&jpeg(1000, 750), 6);
    let processed = Processor::new(unsaved()).process(raw).await.unwrap();

    assert_eq!(processed.info.get("exif_orientation"), Some("6"));
    assert_eq!(dims(&processed.results["300x300"]), (225, 300));
    assert_eq!(dims(&processed.results["600x450"]), (337, 450));
    assert_eq!(dims(&processed.results["50x50c"]), (50, 50));
}

#[tokio::test]
async fn test_truncated_jpeg_recovers_exactly_once() {
    let raw = jpeg(1000, 750);
    let truncated = raw[..raw.len() - 100].to_vec();
    let fallback = Arc::new(CountingFallback::default());
    let codecs = Codecs {
        primary: Arc::new(StrictCodec),
        fallback: fallback.clone(),
    };

    let processed = Processor::new(unsaved())
        .with_codecs(codecs)
        .process(truncated.clone())
        .await
        .unwrap();

    assert_eq!(processed.results.len(), 3);
    assert_eq!(dims(&processed.results["50x50c"]), (50, 50));
    assert_eq!(fallback.recodes.load(Ordering::SeqCst), 1);
    assert!(processed.stats.recovered_size.is_some());
    // Checksum covers the bytes as received
    assert_eq!(
        processed.checksum,
        rendition_core::Checksum::of(&truncated)
    );
}

#[tokio::test]
async fn test_truncated_png_recovers_exactly_once() {
    let raw = encoded(800, 600, ImageFormat::Png);
    let truncated = raw[..raw.len() * 3 / 5].to_vec();
    let fallback = Arc::new(CountingFallback::default());
    let codecs = Codecs {
        primary: Arc::new(StrictCodec),
        fallback: fallback.clone(),
    };

    let processed = Processor::new(unsaved())
        .with_codecs(codecs)
        .process(truncated)
        .await
        .unwrap();

    assert_eq!(processed.results.len(), 3);
    assert_eq!(dims(&processed.results["50x50c"]), (50, 50));
    assert_eq!(dims(&processed.results["300x300"]), (300, 225));
    assert_eq!(dims(&processed.results["600x450"]), (600, 450));
    assert_eq!(fallback.recodes.load(Ordering::SeqCst), 1);
    assert_eq!(processed.info.get("format"), Some("PNG"));
}

#[tokio::test]
async fn test_format_outside_whitelist_fails_job() {
    let err = Processor::new(unsaved())
        .process(encoded(40, 30, ImageFormat::Pnm))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RenditionError::BadImage(BadImage::InvalidFormat(ref format)) if format == "PPM"
    ));
}

#[tokio::test]
async fn test_png_input_is_accepted() {
    let processed = Processor::new(unsaved())
        .process(encoded(400, 300, ImageFormat::Png))
        .await
        .unwrap();
    assert_eq!(processed.info.get("format"), Some("PNG"));
    assert_eq!(dims(&processed.results["300x300"]), (300, 225));
}

#[tokio::test]
async fn test_undecodable_bytes_fail_job() {
    let err = Processor::new(unsaved())
        .process(b"definitely not an image".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, RenditionError::BadImage(_)));
}

#[tokio::test]
async fn test_empty_sizes_still_fill_info() {
    let config = ProcessorConfig {
        sizes: vec![],
        ..unsaved()
    };
    let processed = Processor::new(config).process(jpeg(120, 90)).await.unwrap();
    assert!(processed.results.is_empty());
    assert_eq!(
        processed.info.get("checksum"),
        Some(processed.checksum.as_hex())
    );
    assert_eq!(processed.info.get("width"), Some("120"));
}

#[tokio::test]
async fn test_invalid_size_is_processing_error() {
    let config = ProcessorConfig {
        sizes: vec!["300x300".into(), "x300".into()],
        ..unsaved()
    };
    let err = Processor::new(config)
        .process(jpeg(10, 10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RenditionError::Processing(ProcessingError::InvalidSize(ref s)) if s == "x300"
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_size_does_not_change_output() {
    let raw = with_orientation(&jpeg(640, 480), 8);
    let mut outputs = Vec::new();
    for pool_size in [0, 1, 8] {
        let config = ProcessorConfig {
            pool_size,
            sizes: vec![
                "64x64c".into(),
                "200x200".into(),
                "320x240".into(),
                "100x30c".into(),
            ],
            ..unsaved()
        };
        let processed = Processor::new(config).process(raw.clone()).await.unwrap();
        outputs.push((processed.results, processed.info));
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[tokio::test]
async fn test_checksum_is_deterministic() {
    let processor = Processor::new(unsaved());
    let a = processor.process(jpeg(50, 40)).await.unwrap();
    let b = processor.process(jpeg(50, 40)).await.unwrap();
    assert_eq!(a.checksum, b.checksum);
    assert_eq!(a.checksum.storage_key(), b.checksum.storage_key());
}

#[tokio::test]
async fn test_persisted_blobs_round_trip() {
    let store = Arc::new(MemoryBlobStore::new());
    let config = ProcessorConfig {
        filename: Some("beach.jpg".into()),
        ..Default::default()
    };
    let processed = Processor::new(config)
        .with_store(store.clone())
        .process(jpeg(800, 600))
        .await
        .unwrap();

    let info_key = processed.info.blob_info_name.clone().unwrap();
    let stored: ImageInfo = serde_json::from_slice(&store.get(&info_key).await.unwrap()).unwrap();
    assert_eq!(stored.get("filename"), Some("beach.jpg"));
    assert_eq!(stored.get("checksum"), processed.info.get("checksum"));
    assert!(stored.blob_names.is_empty());

    for (size, bytes) in &processed.results {
        let key = &processed.info.blob_names[size];
        assert!(key.ends_with(&format!("_{size}.jpg")));
        assert_eq!(&store.get(key).await.unwrap(), bytes);
    }
}

#[tokio::test]
async fn test_store_failure_is_not_wrapped() {
    let err = Processor::new(ProcessorConfig::default())
        .with_store(Arc::new(FailingStore))
        .process(jpeg(100, 100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RenditionError::Storage(StoreError::Unavailable(_))
    ));
}
