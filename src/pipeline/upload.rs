use std::io::Cursor;

use fast_image_resize as fir;
use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};
use rayon::prelude::*;
use reqwest::blocking::{
    Client,
    multipart::{Form, Part},
};

use super::protocol::ResponseSchema;
use crate::{
    config::Config,
    error::UploadError,
    types::{DepthSample, Frame, Skeleton},
};

const IMAGE_FILENAME: &str = "frame.jpg";
const DEPTH_FILENAME: &str = "depth.txt";
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Posts one frame (and optionally the latest depth map) to the pose backend.
#[derive(Clone, Debug)]
pub struct Uploader {
    client: Client,
    endpoint: String,
    schema: ResponseSchema,
    jpeg_quality: u8,
    max_upload_side: Option<u32>,
}

impl Uploader {
    pub fn new(config: &Config) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint().to_string(),
            schema: config.schema(),
            jpeg_quality: config.jpeg_quality(),
            max_upload_side: config.max_upload_side(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn schema(&self) -> ResponseSchema {
        self.schema
    }

    /// Encodes `frame` to JPEG and uploads it. Blocks until the backend
    /// answers; callers run this off the capture thread.
    pub fn process(
        &self,
        frame: &Frame,
        depth: Option<&DepthSample>,
    ) -> Result<Skeleton, UploadError> {
        let jpeg = encode_jpeg(frame, self.jpeg_quality, self.max_upload_side)?;
        self.upload(jpeg, depth)
    }

    pub fn upload(
        &self,
        jpeg: Vec<u8>,
        depth: Option<&DepthSample>,
    ) -> Result<Skeleton, UploadError> {
        let form = self.build_form(jpeg, depth)?;

        let response = self.client.post(&self.endpoint).multipart(form).send()?;
        let status = response.status();
        let body = response.bytes()?;

        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(UploadError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        self.schema.decode(&body)
    }

    fn build_form(&self, jpeg: Vec<u8>, depth: Option<&DepthSample>) -> Result<Form, UploadError> {
        let image_part = Part::bytes(jpeg)
            .file_name(IMAGE_FILENAME)
            .mime_str("image/jpeg")
            .map_err(|err| UploadError::Encode(err.to_string()))?;
        let mut form = Form::new().part(self.schema.image_field(), image_part);

        if let Some(depth) = depth {
            let depth_part = Part::text(depth.to_payload())
                .file_name(DEPTH_FILENAME)
                .mime_str("text/plain")
                .map_err(|err| UploadError::Encode(err.to_string()))?;
            form = form.part(self.schema.depth_field(), depth_part);
        }

        Ok(form)
    }
}

/// JPEG-encodes an RGBA frame, downscaling first when its longer side
/// exceeds `max_side`.
pub fn encode_jpeg(frame: &Frame, quality: u8, max_side: Option<u32>) -> Result<Vec<u8>, UploadError> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.width == 0 || frame.height == 0 || frame.rgba.len() != expected_len {
        return Err(UploadError::Encode(format!(
            "frame buffer size mismatch: got {}, expected {} for {}x{}",
            frame.rgba.len(),
            expected_len,
            frame.width,
            frame.height
        )));
    }

    let (rgba, width, height) = match max_side {
        Some(side) if frame.width.max(frame.height) > side => downscale(frame, side)?,
        _ => (frame.rgba.clone(), frame.width, frame.height),
    };

    let rgb: Vec<u8> = rgba
        .par_chunks_exact(4)
        .flat_map_iter(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality).encode(
        &rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out.into_inner())
}

fn downscale(frame: &Frame, max_side: u32) -> Result<(Vec<u8>, u32, u32), UploadError> {
    let scale = max_side as f32 / frame.width.max(frame.height) as f32;
    let new_w = (frame.width as f32 * scale).round().max(1.0) as u32;
    let new_h = (frame.height as f32 * scale).round().max(1.0) as u32;

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| UploadError::Encode(err.to_string()))?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .map_err(|err| UploadError::Encode(format!("resize failed: {err}")))?;

    Ok((dst_image.into_vec(), new_w, new_h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn solid_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![200u8; (width * height * 4) as usize], width, height)
    }

    fn jpeg_dimensions(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn encodes_valid_jpeg() {
        let jpeg = encode_jpeg(&solid_frame(32, 16), 80, None).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(jpeg_dimensions(&jpeg), (32, 16));
    }

    #[test]
    fn downscales_to_max_side() {
        let jpeg = encode_jpeg(&solid_frame(64, 32), 80, Some(16)).unwrap();
        assert_eq!(jpeg_dimensions(&jpeg), (16, 8));
    }

    #[test]
    fn small_frames_are_not_upscaled() {
        let jpeg = encode_jpeg(&solid_frame(8, 8), 80, Some(64)).unwrap();
        assert_eq!(jpeg_dimensions(&jpeg), (8, 8));
    }

    #[test]
    fn mismatched_buffer_is_an_encode_error() {
        let frame = Frame::new(vec![0u8; 10], 4, 4);
        let err = encode_jpeg(&frame, 80, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodeError);
    }
}
