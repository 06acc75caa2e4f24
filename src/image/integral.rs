//! Summed-area tables for O(1) window statistics.

use crate::image::ImageView;
use crate::util::ClickMatchResult;

/// Integral image of pixel values and squared values.
///
/// Tables have one extra leading row and column of zeros so a window sum is
/// four lookups without bounds special cases. Integer sums keep the variance
/// test exact.
pub(crate) struct IntegralImage {
    width: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    pub(crate) fn build(image: ImageView<'_, u8>) -> ClickMatchResult<Self> {
        let w = image.width() + 1;
        let h = image.height() + 1;
        let mut sum = vec![0u64; w * h];
        let mut sum_sq = vec![0u64; w * h];
        for y in 0..image.height() {
            let row = image.row_or_err(y)?;
            let mut acc = 0u64;
            let mut acc_sq = 0u64;
            for (x, &value) in row.iter().enumerate() {
                let v = u64::from(value);
                acc += v;
                acc_sq += v * v;
                let idx = (y + 1) * w + x + 1;
                sum[idx] = sum[idx - w] + acc;
                sum_sq[idx] = sum_sq[idx - w] + acc_sq;
            }
        }
        Ok(Self {
            width: w,
            sum,
            sum_sq,
        })
    }

    /// Returns `(sum, sum of squares)` over the window at `(x, y)`.
    pub(crate) fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (u64, u64) {
        let a = y * self.width + x;
        let b = a + w;
        let c = (y + h) * self.width + x;
        let d = c + w;
        (
            self.sum[d] + self.sum[a] - self.sum[b] - self.sum[c],
            self.sum_sq[d] + self.sum_sq[a] - self.sum_sq[b] - self.sum_sq[c],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::IntegralImage;
    use crate::image::ImageView;

    #[test]
    fn window_sums_match_direct_sums() {
        let data: Vec<u8> = (0u8..20).map(|v| v.wrapping_mul(37)).collect();
        let view = ImageView::from_slice(&data, 5, 4).unwrap();
        let integral = IntegralImage::build(view).unwrap();

        for (x, y, w, h) in [(0, 0, 5, 4), (1, 1, 3, 2), (4, 3, 1, 1), (2, 0, 2, 4)] {
            let mut sum = 0u64;
            let mut sum_sq = 0u64;
            for yy in y..y + h {
                for xx in x..x + w {
                    let v = u64::from(*view.get(xx, yy).unwrap());
                    sum += v;
                    sum_sq += v * v;
                }
            }
            assert_eq!(integral.window(x, y, w, h), (sum, sum_sq));
        }
    }
}
