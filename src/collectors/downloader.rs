//! 图片下载与分辨率过滤

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, warn};

use crate::config::{CollectionConfig, Resolution};
use crate::error::{AppError, AppResult, CollectionError};
use crate::utils::sanitize_component;

/// 单个 URL 的下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// 已保存到磁盘
    Saved { filename: String, path: PathBuf },
    /// 分辨率不在范围内，未保存
    OutOfBounds { width: u32, height: u32 },
}

/// 图片下载器
pub struct ImageDownloader {
    client: reqwest::Client,
    min_resolution: Resolution,
    max_resolution: Resolution,
}

impl ImageDownloader {
    pub fn new(config: &CollectionConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.download_timeout())
            .build()
            .map_err(|e| AppError::Other(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            min_resolution: config.min_resolution,
            max_resolution: config.max_resolution,
        })
    }

    /// 下载并保存为 `{keyword}{sequence}.{format}`
    ///
    /// 返回 Err 表示这个 URL 被跳过（状态码、网络、解码或写盘失败），不重试
    pub async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        keyword: &str,
        sequence: usize,
    ) -> AppResult<DownloadOutcome> {
        let bytes = self.fetch(url).await?;

        let format = image::guess_format(&bytes).map_err(|e| CollectionError::DecodeFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let img = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            CollectionError::DecodeFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let (width, height) = img.dimensions();
        if !within_bounds((width, height), self.min_resolution, self.max_resolution) {
            return Ok(DownloadOutcome::OutOfBounds { width, height });
        }

        let filename = image_filename(keyword, sequence, format);
        let path = output_dir.join(&filename);
        save_image(&img, &path, format).map_err(|reason| CollectionError::DownloadFailed {
            url: url.to_string(),
            reason,
        })?;

        Ok(DownloadOutcome::Saved { filename, path })
    }

    async fn fetch(&self, url: &str) -> AppResult<Vec<u8>> {
        let download_err = |reason: String| CollectionError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("状态码 {}", status.as_u16())).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(e.to_string()))?;
        debug!("下载完成: {} ({} 字节)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}

/// `{keyword}{sequence}.{format}`，关键词中的分隔符会被替换，文件始终落在输出目录内
pub fn image_filename(keyword: &str, sequence: usize, format: ImageFormat) -> String {
    format!("{}{}.{}", sanitize_component(keyword), sequence, format_name(format))
}

/// 宽高都在 [min, max] 闭区间内
pub fn within_bounds(size: Resolution, min: Resolution, max: Resolution) -> bool {
    let (width, height) = size;
    width >= min.0 && height >= min.1 && width <= max.0 && height <= max.1
}

/// 文件扩展名取解码出的格式名
pub fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        other => other.extensions_str().first().copied().unwrap_or("img"),
    }
}

/// 先按原格式保存，编码器不支持当前像素格式时转成 RGB 再保存
fn save_image(img: &DynamicImage, path: &Path, format: ImageFormat) -> Result<(), String> {
    match img.save_with_format(path, format) {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!("按原格式保存失败，转换为 RGB 后重试: {}", first);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .save_with_format(path, format)
                .map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_bounds_inclusive() {
        let min = (400, 400);
        let max = (8000, 8000);
        assert!(within_bounds((400, 400), min, max));
        assert!(within_bounds((8000, 8000), min, max));
        assert!(!within_bounds((399, 500), min, max));
        assert!(!within_bounds((500, 399), min, max));
        assert!(!within_bounds((8001, 500), min, max));
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_name(ImageFormat::Png), "png");
        assert_eq!(format_name(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_image_filename_stays_in_directory() {
        assert_eq!(image_filename("yurt", 3, ImageFormat::Png), "yurt3.png");
        assert_eq!(image_filename("AC/DC", 0, ImageFormat::Png), "AC_DC0.png");
        assert_eq!(image_filename("../x", 1, ImageFormat::Jpeg), ".._x1.jpeg");
        assert_eq!(image_filename("..", 0, ImageFormat::Gif), "_0.gif");
    }

    #[test]
    fn test_save_rgba_as_jpeg_falls_back_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat0.jpeg");
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));

        save_image(&img, &path, ImageFormat::Jpeg).unwrap();
        assert!(path.exists());
    }
}
