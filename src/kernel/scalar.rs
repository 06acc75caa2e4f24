//! Scalar reference ZNCC kernel.
//!
//! The score at a placement is `sum(t' * I) / sqrt(var_t * var_i)` where `t'`
//! is the zero-mean template, `var_t` its sum of squared deviations and
//! `var_i` the same quantity for the covered image window. Because `t'` sums
//! to zero the image mean cancels out of the numerator. Window statistics come
//! from the frame's integral image.

use crate::image::integral::IntegralImage;
use crate::image::ImageView;
use crate::kernel::Peak;
use crate::template::TemplatePlan;
use crate::util::{ClickMatchError, ClickMatchResult};

/// Returns the global maximum of the ZNCC response over all full placements.
///
/// Ties keep the first placement in row-major order. Windows without variance
/// have no defined score and are skipped; if every window is flat the result
/// is `None`.
pub(crate) fn best_peak(
    image: ImageView<'_, u8>,
    integral: &IntegralImage,
    tpl: &TemplatePlan,
) -> ClickMatchResult<Option<Peak>> {
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = tpl.width();
    let tpl_height = tpl.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(ClickMatchError::InvalidDimensions {
            width: tpl_width,
            height: tpl_height,
        });
    }
    let t_prime = tpl.zero_mean();
    if t_prime.len() != tpl_width * tpl_height {
        return Err(ClickMatchError::BufferTooSmall {
            needed: tpl_width * tpl_height,
            got: t_prime.len(),
        });
    }

    let var_t = f64::from(tpl.var_t());
    let n = (tpl_width * tpl_height) as u128;
    let max_x = img_width - tpl_width;
    let max_y = img_height - tpl_height;

    let mut rows = Vec::with_capacity(tpl_height);
    let mut best: Option<Peak> = None;
    for y in 0..=max_y {
        rows.clear();
        for ty in 0..tpl_height {
            rows.push(image.row_or_err(y + ty)?);
        }
        for x in 0..=max_x {
            let (sum_i, sum_i2) = integral.window(x, y, tpl_width, tpl_height);
            let var_n = n * u128::from(sum_i2) - u128::from(sum_i) * u128::from(sum_i);
            if var_n == 0 {
                continue;
            }
            let var_i = var_n as f64 / n as f64;

            let mut dot = 0.0f32;
            for (ty, img_row) in rows.iter().enumerate() {
                let tpl_row = &t_prime[ty * tpl_width..(ty + 1) * tpl_width];
                let window = &img_row[x..x + tpl_width];
                for (&t, &v) in tpl_row.iter().zip(window) {
                    dot += t * f32::from(v);
                }
            }

            let score = (f64::from(dot) / (var_t * var_i).sqrt()) as f32;
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(Peak { x, y, score });
            }
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::best_peak;
    use crate::image::integral::IntegralImage;
    use crate::image::ImageView;
    use crate::template::TemplatePlan;

    #[test]
    fn zncc_scan_matches_bruteforce() {
        let img_width = 6;
        let img_height = 5;
        let mut image = Vec::with_capacity(img_width * img_height);
        for y in 0..img_height {
            for x in 0..img_width {
                image.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        let tpl_width = 3;
        let tpl_height = 2;
        let mut tpl = Vec::with_capacity(tpl_width * tpl_height);
        for y in 0..tpl_height {
            for x in 0..tpl_width {
                tpl.push(((x * 5 + y * 11 + x * y) & 0xFF) as u8);
            }
        }

        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let tpl_view = ImageView::from_slice(&tpl, tpl_width, tpl_height).unwrap();
        let plan = TemplatePlan::from_view(tpl_view).unwrap();
        let integral = IntegralImage::build(image_view).unwrap();
        let best = best_peak(image_view, &integral, &plan).unwrap().unwrap();

        let t_mean = tpl.iter().map(|&v| v as f64).sum::<f64>() / tpl.len() as f64;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_x = 0;
        let mut best_y = 0;
        for y in 0..=(img_height - tpl_height) {
            for x in 0..=(img_width - tpl_width) {
                let mut window = Vec::new();
                for ty in 0..tpl_height {
                    let row = image_view.row(y + ty).unwrap();
                    window.extend(row[x..x + tpl_width].iter().map(|&v| v as f64));
                }
                let i_mean = window.iter().sum::<f64>() / window.len() as f64;
                let mut num = 0.0;
                let mut den_t = 0.0;
                let mut den_i = 0.0;
                for (t, i) in tpl.iter().zip(&window) {
                    let dt = *t as f64 - t_mean;
                    let di = i - i_mean;
                    num += dt * di;
                    den_t += dt * dt;
                    den_i += di * di;
                }
                if den_i <= 1e-12 {
                    continue;
                }
                let score = num / (den_t * den_i).sqrt();
                if score > best_score {
                    best_score = score;
                    best_x = x;
                    best_y = y;
                }
            }
        }

        assert_eq!(best.x, best_x);
        assert_eq!(best.y, best_y);
        assert!((best.score - best_score as f32).abs() < 1e-5);
    }

    fn texel(i: u32) -> u8 {
        let mut h = i.wrapping_mul(0x9E37_79B1);
        h ^= h >> 15;
        h = h.wrapping_mul(0x85EB_CA6B);
        h ^= h >> 13;
        h as u8
    }

    #[test]
    fn exact_patch_scores_one() {
        let width = 12;
        let height = 9;
        let image: Vec<u8> = (0..width * height)
            .map(|i| texel(i as u32))
            .collect();
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let mut patch = Vec::new();
        for y in 4..8 {
            patch.extend_from_slice(&view.row(y).unwrap()[5..10]);
        }
        let plan = TemplatePlan::from_view(ImageView::from_slice(&patch, 5, 4).unwrap()).unwrap();
        let integral = IntegralImage::build(view).unwrap();

        let best = best_peak(view, &integral, &plan).unwrap().unwrap();
        assert_eq!((best.x, best.y), (5, 4));
        assert!((best.score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn flat_image_has_no_peak() {
        let image = vec![9u8; 64];
        let view = ImageView::from_slice(&image, 8, 8).unwrap();
        let tpl: Vec<u8> = (0u8..9).collect();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 3).unwrap()).unwrap();
        let integral = IntegralImage::build(view).unwrap();
        assert!(best_peak(view, &integral, &plan).unwrap().is_none());
    }

    #[test]
    fn oversized_template_is_an_error() {
        let image = vec![0u8; 4];
        let view = ImageView::from_slice(&image, 2, 2).unwrap();
        let tpl: Vec<u8> = (0u8..9).collect();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 3).unwrap()).unwrap();
        let integral = IntegralImage::build(view).unwrap();
        assert!(best_peak(view, &integral, &plan).is_err());
    }
}
