/// 1D Gaussian kernel of odd `kernel_size`, normalized to sum to one.
///
/// Sigma follows OpenCV's `sigma = 0` convention:
/// `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`, which for a 3-tap kernel gives
/// roughly `[0.24, 0.52, 0.24]`.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let sigma = 0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (kernel_size / 2) as f64;
    let weights: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|&w| (w / sum) as f32).collect()
}

/// Separable blur of an interleaved `width x height x channels` buffer.
///
/// Edges are clamped. `temp` is reused between calls to avoid reallocating
/// per frame.
pub fn separable_blur(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
    temp: &mut Vec<f32>,
) {
    if kernel.len() <= 1 || width == 0 || height == 0 {
        return;
    }
    let half = (kernel.len() / 2) as isize;
    let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;

    temp.clear();
    temp.resize(width * height * channels, 0.0);

    for y in 0..height {
        let row = y * width;
        for x in 0..width {
            for c in 0..channels {
                temp[(row + x) * channels + c] = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &w)| {
                        let sx = clamp(x as isize + k as isize - half, width);
                        data[(row + sx) * channels + c] as f32 * w
                    })
                    .sum();
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let sum: f32 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &w)| {
                        let sy = clamp(y as isize + k as isize - half, height);
                        temp[(sy * width + x) * channels + c] * w
                    })
                    .sum();
                data[(y * width + x) * channels + c] = sum.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_sums_to_one_and_is_symmetric() {
        let k = gaussian_kernel_1d(5);
        assert_relative_eq!(k.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(k[0], k[4]);
        assert_relative_eq!(k[1], k[3]);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn test_three_tap_kernel_weights() {
        let k = gaussian_kernel_1d(3);
        assert_relative_eq!(k[0], 0.25, epsilon = 0.03);
        assert_relative_eq!(k[1], 0.5, epsilon = 0.03);
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let mut data = vec![128u8; 6 * 5 * 3];
        let mut temp = Vec::new();
        separable_blur(&mut data, 6, 5, 3, &gaussian_kernel_1d(3), &mut temp);
        assert!(data.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_single_bright_pixel_is_spread() {
        let mut data = vec![0u8; 5 * 5];
        data[2 * 5 + 2] = 255;
        let mut temp = Vec::new();
        separable_blur(&mut data, 5, 5, 1, &gaussian_kernel_1d(3), &mut temp);
        assert!(data[2 * 5 + 2] < 255);
        assert!(data[2 * 5 + 3] > 0);
        assert!(data[5 + 2] > 0);
        assert_eq!(data[0], 0);
    }

    #[test]
    fn test_single_tap_kernel_is_identity() {
        let mut data: Vec<u8> = (0..27).collect();
        let original = data.clone();
        let mut temp = Vec::new();
        separable_blur(&mut data, 3, 3, 3, &[1.0], &mut temp);
        assert_eq!(data, original);
    }
}
