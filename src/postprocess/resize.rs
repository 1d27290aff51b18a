//! Aspect-preserving resize

use crate::postprocess::ProcessError;

/// Computes the size that fits a source image into a target box
///
/// The source aspect ratio is kept: a source wider than the target box is
/// fitted to the target width, anything else to the target height.
///
/// # Example
///
/// ```
/// use tankobon::postprocess::fit_dimensions;
///
/// assert_eq!(fit_dimensions(1000, 500, 300, 300).unwrap(), (300, 150));
/// ```
pub fn fit_dimensions(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> Result<(u32, u32), ProcessError> {
    if source_width == 0 || source_height == 0 || target_width == 0 || target_height == 0 {
        return Err(ProcessError::InvalidDimensions {
            width: target_width,
            height: target_height,
        });
    }

    let source_ratio = source_width as f64 / source_height as f64;
    let target_ratio = target_width as f64 / target_height as f64;

    let (width, height) = if source_ratio > target_ratio {
        (target_width as f64, (target_width as f64 / source_ratio).round())
    } else {
        ((target_height as f64 * source_ratio).round(), target_height as f64)
    };

    if width < 1.0 || height < 1.0 {
        return Err(ProcessError::InvalidDimensions {
            width: width as u32,
            height: height as u32,
        });
    }

    Ok((width as u32, height as u32))
}
