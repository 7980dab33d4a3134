//! Best-effort OpenGraph thumbnails for the detail popup.
//!
//! For a headline link: fetch the page, find its `og:image` meta tag, fetch
//! that image (only if the server says it is one), decode it and shrink it
//! into a 40×40 box.  Any step can fail; the popup just shows the row
//! without a picture.

use std::time::Duration;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ratatui::style::Color;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::ThumbnailError;

/// Bounding box a decoded image is scaled into.
pub const THUMB_BOX: u32 = 40;

/// Meta tags that name a page's preview image, most specific first.
const OG_SELECTORS: [&str; 3] = [
    r#"meta[property="og:image"]"#,
    r#"meta[property="og:image:url"]"#,
    r#"meta[name="og:image"]"#,
];

/// A decoded, downscaled preview image.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    image: RgbImage,
}

impl Thumbnail {
    /// Shrink `image` into [`THUMB_BOX`], keeping its aspect ratio.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image: image.thumbnail(THUMB_BOX, THUMB_BOX).to_rgb8(),
        }
    }

    /// Sample the image for a `cols`×`rows` grid of `▀` cells: each cell is
    /// `(top, bottom)` colour.  The picture is fitted and centred; padding is
    /// [`Color::Reset`].
    pub fn half_blocks(&self, cols: u16, rows: u16) -> Vec<Vec<(Color, Color)>> {
        let (grid_w, grid_h) = (u32::from(cols), u32::from(rows) * 2);
        let mut grid = vec![vec![(Color::Reset, Color::Reset); usize::from(cols)]; usize::from(rows)];
        let (w, h) = self.image.dimensions();
        if grid_w == 0 || grid_h == 0 || w == 0 || h == 0 {
            return grid;
        }

        let scale = (grid_w as f64 / w as f64).min(grid_h as f64 / h as f64);
        let fit_w = ((w as f64 * scale).round() as u32).clamp(1, grid_w);
        let fit_h = ((h as f64 * scale).round() as u32).clamp(1, grid_h);
        let scaled = imageops::resize(&self.image, fit_w, fit_h, FilterType::Triangle);
        let (off_x, off_y) = ((grid_w - fit_w) / 2, (grid_h - fit_h) / 2);

        for (x, y, pixel) in scaled.enumerate_pixels() {
            let (gx, gy) = ((x + off_x) as usize, (y + off_y) as usize);
            let color = Color::Rgb(pixel[0], pixel[1], pixel[2]);
            let cell = &mut grid[gy / 2][gx];
            if gy % 2 == 0 {
                cell.0 = color;
            } else {
                cell.1 = color;
            }
        }
        grid
    }
}

/// Find the page's preview image URL, resolved against `base`.
pub fn og_image_url(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);

    OG_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty())
                .and_then(|content| base.join(content).ok())
        })
}

/// Fetches thumbnails over a blocking client with its own timeout.
pub struct Enricher {
    client: reqwest::blocking::Client,
}

impl Enricher {
    /// Must be called outside an async context.
    pub fn new(timeout: Duration) -> Result<Self, ThumbnailError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("liveline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Page → `og:image` → image bytes → [`Thumbnail`].
    pub fn thumbnail_for(&self, link: &str) -> Result<Thumbnail, ThumbnailError> {
        let page_url = Url::parse(link).map_err(|e| ThumbnailError::BadUrl(format!("{link}: {e}")))?;

        let page = self.client.get(page_url.clone()).send()?;
        if !page.status().is_success() {
            return Err(ThumbnailError::HttpStatus(page.status().as_u16()));
        }
        let html = page.text()?;
        let image_url = og_image_url(&html, &page_url).ok_or(ThumbnailError::MissingTag)?;

        let response = self.client.get(image_url).send()?;
        if !response.status().is_success() {
            return Err(ThumbnailError::HttpStatus(response.status().as_u16()));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(ThumbnailError::NotAnImage(content_type));
        }

        let bytes = response.bytes()?;
        let image = image::load_from_memory(&bytes)?;
        Ok(Thumbnail::from_image(image))
    }

    /// [`thumbnail_for`](Self::thumbnail_for), with failures logged and
    /// dropped.
    pub fn enrich(&self, link: &str) -> Option<Thumbnail> {
        match self.thumbnail_for(link) {
            Ok(thumb) => Some(thumb),
            Err(e) => {
                debug!(link, error = %e, "no thumbnail");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base() -> Url {
        Url::parse("https://news.example.com/story/1").unwrap()
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb([200, 10, 10]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn page_with_og(image: &str) -> String {
        format!(
            r#"<html><head><meta property="og:image" content="{image}"><title>t</title></head><body></body></html>"#
        )
    }

    #[test]
    fn finds_absolute_og_image() {
        let html = page_with_og("https://cdn.example.com/a.jpg");
        let url = og_image_url(&html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn resolves_relative_og_image() {
        let html = page_with_og("/img/lead.png");
        let url = og_image_url(&html, &base()).unwrap();
        assert_eq!(url.as_str(), "https://news.example.com/img/lead.png");
    }

    #[test]
    fn name_attribute_is_accepted() {
        let html = r#"<html><head><meta name="og:image" content="https://cdn.example.com/n.png"></head></html>"#;
        assert!(og_image_url(html, &base()).is_some());
    }

    #[test]
    fn missing_or_empty_tag_is_none() {
        assert!(og_image_url("<html><head><title>x</title></head></html>", &base()).is_none());
        assert!(og_image_url(&page_with_og("  "), &base()).is_none());
    }

    #[test]
    fn thumbnail_keeps_aspect_ratio() {
        let wide = DynamicImage::ImageRgb8(RgbImage::new(200, 100));
        assert_eq!(Thumbnail::from_image(wide).image.dimensions(), (40, 20));

        let tall = DynamicImage::ImageRgb8(RgbImage::new(30, 120));
        assert_eq!(Thumbnail::from_image(tall).image.dimensions(), (10, 40));
    }

    #[test]
    fn half_blocks_fill_requested_grid() {
        let thumb = Thumbnail::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            40,
            Rgb([1, 2, 3]),
        )));

        let grid = thumb.half_blocks(4, 2);

        assert_eq!(grid.len(), 2);
        assert!(grid.iter().all(|row| row.len() == 4));
        assert_eq!(grid[0][0], (Color::Rgb(1, 2, 3), Color::Rgb(1, 2, 3)));
    }

    #[test]
    fn half_blocks_pad_wide_images() {
        let thumb = Thumbnail::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            10,
            Rgb([9, 9, 9]),
        )));

        let grid = thumb.half_blocks(4, 2);

        // 4x1 picture centred in a 4x4 sub-pixel grid lands on sub-row 1
        assert!(grid[0].iter().all(|&(top, bottom)| top == Color::Reset && bottom != Color::Reset));
        assert!(grid[1].iter().all(|&cell| cell == (Color::Reset, Color::Reset)));
    }

    async fn enrich_blocking(link: String) -> (Option<Thumbnail>, Result<(), String>) {
        tokio::task::spawn_blocking(move || {
            let enricher = Enricher::new(Duration::from_secs(5)).unwrap();
            let detailed = enricher.thumbnail_for(&link).map(|_| ()).map_err(|e| e.to_string());
            (enricher.enrich(&link), detailed)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_scales_og_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(page_with_og("/lead.png"), "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lead.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(png_bytes(120, 60), "image/png"))
            .mount(&server)
            .await;

        let (thumb, detailed) = enrich_blocking(format!("{}/story", server.uri())).await;

        assert!(detailed.is_ok());
        assert_eq!(thumb.unwrap().image.dimensions(), (40, 20));
    }

    #[tokio::test]
    async fn page_without_og_image_has_no_thumbnail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><head></head><body>plain</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let (thumb, detailed) = enrich_blocking(format!("{}/plain", server.uri())).await;

        assert!(thumb.is_none());
        assert_eq!(detailed.unwrap_err(), "page has no og:image tag");
    }

    #[tokio::test]
    async fn non_image_content_type_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page_with_og("/fake.png"), "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fake.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
            .mount(&server)
            .await;

        let (thumb, detailed) = enrich_blocking(format!("{}/story", server.uri())).await;

        assert!(thumb.is_none());
        assert!(detailed.unwrap_err().starts_with("not an image"));
    }

    #[tokio::test]
    async fn undecodable_image_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page_with_og("/bad.png"), "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"not really a png".to_vec(), "image/png"))
            .mount(&server)
            .await;

        let (thumb, detailed) = enrich_blocking(format!("{}/story", server.uri())).await;

        assert!(thumb.is_none());
        assert!(detailed.unwrap_err().starts_with("decode failed"));
    }

    #[test]
    fn bad_link_is_rejected_without_network() {
        let enricher = Enricher::new(Duration::from_secs(1)).unwrap();
        assert!(matches!(
            enricher.thumbnail_for("not a url"),
            Err(ThumbnailError::BadUrl(_))
        ));
    }
}
