//! Test fixtures: image bytes and multipart parts.

use axum_test::multipart::{MultipartForm, Part};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Real PNG with an alpha channel.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 128]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encode png");
    buffer
}

/// Minimal PDF-looking payload of exactly `len` bytes.
pub fn create_test_pdf(len: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.resize(len.max(data.len()), b' ');
    data
}

pub fn file_part(name: &str, data: Vec<u8>) -> Part {
    Part::bytes(data)
        .file_name(name.to_string())
        .mime_type("application/octet-stream")
}

/// Form with one `files` part per `(name, bytes)` pair.
pub fn upload_form(files: Vec<(&str, Vec<u8>)>) -> MultipartForm {
    files
        .into_iter()
        .fold(MultipartForm::new(), |form, (name, data)| {
            form.add_part("files", file_part(name, data))
        })
}
