use image::imageops::{self, FilterType};
use tch::Tensor;

use super::model::InferenceError;

pub const INPUT_SIZE: u32 = 128;

/// Normalizes an uploaded raster image into the tensor shape the
/// classifiers expect: single channel, 128x128, intensities scaled to
/// [0, 1], laid out as (batch, height, width, channel).
pub fn prepare(image_data: &[u8]) -> Result<Tensor, InferenceError> {
    let decoded = image::load_from_memory(image_data)?;
    let gray = decoded.to_luma8();
    let resized = imageops::resize(&gray, INPUT_SIZE, INPUT_SIZE, FilterType::Nearest);

    let pixels: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|intensity| f32::from(intensity) / 255.0)
        .collect();

    let side = i64::from(INPUT_SIZE);
    Ok(Tensor::from_slice(&pixels).view([1, side, side, 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn tensor_values(tensor: &Tensor) -> Vec<f32> {
        let flat = tensor.view([-1]);
        let count = flat.size()[0] as usize;
        let mut values = vec![0.0f32; count];
        flat.copy_data(&mut values, count);
        values
    }

    #[test]
    fn prepare_yields_single_channel_128_square() {
        for (width, height) in [(64, 64), (200, 131), (128, 128), (1, 1)] {
            let tensor = prepare(&encoded_png(width, height)).unwrap();
            assert_eq!(tensor.size(), vec![1, 128, 128, 1]);
        }
    }

    #[test]
    fn prepare_scales_intensities_to_unit_interval() {
        let tensor = prepare(&encoded_png(300, 170)).unwrap();
        let values = tensor_values(&tensor);
        assert_eq!(values.len(), 128 * 128);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn prepare_rejects_undecodable_input() {
        let result = prepare(b"definitely not an image");
        assert!(matches!(result, Err(InferenceError::Decode(_))));
    }
}
