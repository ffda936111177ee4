// src/services/qrcode_service.rs

use image::{DynamicImage, ImageOutputFormat, Luma};
use qrcode::QrCode;

use crate::common::error::AppError;

// Endereço lido pelo leitor da portaria: {base}/{token}
pub fn checkin_url(base_url: &str, token: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), token)
}

/// Renderiza o conteúdo como um QR Code PNG em tons de cinza.
pub fn render_png(content: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::new(content.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    let image_buffer = code
        .render::<Luma<u8>>()
        .min_dimensions(256, 256)
        .build();

    let mut buffer = Vec::new();
    DynamicImage::ImageLuma8(image_buffer)
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_token_once() {
        assert_eq!(
            checkin_url("http://localhost:3000/api/gestao/checkin/", "abc"),
            "http://localhost:3000/api/gestao/checkin/abc"
        );
        assert_eq!(checkin_url("https://evento.org/c", "x1"), "https://evento.org/c/x1");
    }

    #[test]
    fn renders_png_bytes() {
        let png = render_png("http://localhost:3000/api/gestao/checkin/0f1e2d").unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }
}
