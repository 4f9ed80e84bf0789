use base64::{Engine, engine::general_purpose::STANDARD};
use qrcode::{QrCode, render::svg};

const MIN_SIZE: u32 = 200;

// QR code of the prompt as SVG, base64 encoded for JSON
pub fn render_base64(prompt: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(prompt.as_bytes())?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(MIN_SIZE, MIN_SIZE)
        .build();
    Ok(STANDARD.encode(image))
}
