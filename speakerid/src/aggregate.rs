use crate::error::IdentifyError;

/// Added to the squared norm before the square root so an all-zero sum
/// does not divide by zero.
pub const NORM_EPSILON: f64 = 1e-10;

/// Sums segment embeddings and scales the sum to norm `alpha`.
///
/// Output is `S / sqrt(|S|^2 + 1e-10) * alpha` where `S` is the elementwise
/// sum. Its L2 norm is `alpha` whenever `S` is non-zero. An all-zero `S`
/// produces a near-zero vector instead; callers should check
/// [`is_degenerate`] on [`sum_embeddings`] when that matters.
///
/// Uses f64 intermediate precision.
pub fn aggregate(raw: &[Vec<f32>], alpha: f32) -> Result<Vec<f32>, IdentifyError> {
    check_alpha(alpha)?;
    let sum = sum_embeddings(raw)?;
    Ok(scale_to_norm(&sum, alpha))
}

/// Elementwise sum of equally sized embeddings.
pub fn sum_embeddings(raw: &[Vec<f32>]) -> Result<Vec<f64>, IdentifyError> {
    let Some(first) = raw.first() else {
        return Err(IdentifyError::InvalidInput("no embeddings to aggregate".into()));
    };
    let dim = first.len();
    let mut sum = vec![0.0f64; dim];
    for emb in raw {
        if emb.len() != dim {
            return Err(IdentifyError::ShapeMismatch {
                expected: dim,
                got: emb.len(),
            });
        }
        for (acc, &v) in sum.iter_mut().zip(emb) {
            *acc += v as f64;
        }
    }
    Ok(sum)
}

/// Reports whether an embedding sum carries no usable direction: every
/// component is exactly zero, or any component is infinite or NaN.
pub fn is_degenerate(sum: &[f64]) -> bool {
    sum.iter().all(|&v| v == 0.0) || sum.iter().any(|v| !v.is_finite())
}

/// Scales `v` to L2 norm `alpha` (epsilon-guarded).
pub fn l2_norm(v: &[f32], alpha: f32) -> Vec<f32> {
    let wide: Vec<f64> = v.iter().map(|&x| x as f64).collect();
    scale_to_norm(&wide, alpha)
}

pub(crate) fn scale_to_norm(v: &[f64], alpha: f32) -> Vec<f32> {
    let sq: f64 = v.iter().map(|x| x * x).sum();
    let norm = (sq + NORM_EPSILON).sqrt();
    let scale = alpha as f64 / norm;
    v.iter().map(|&x| (x * scale) as f32).collect()
}

pub(crate) fn check_alpha(alpha: f32) -> Result<(), IdentifyError> {
    if alpha.is_finite() && alpha > 0.0 {
        Ok(())
    } else {
        Err(IdentifyError::InvalidInput(format!("alpha must be positive, got {alpha}")))
    }
}
