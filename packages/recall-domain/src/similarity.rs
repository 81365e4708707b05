/// Cosine similarity of two vectors, or `None` when it is undefined.
///
/// Undefined covers empty or mismatched lengths, non-finite components and zero magnitude on
/// either side, so callers never rank a NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
	if a.is_empty() || a.len() != b.len() {
		return None;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b) {
		if !x.is_finite() || !y.is_finite() {
			return None;
		}

		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return None;
	}

	let score = dot / (norm_a.sqrt() * norm_b.sqrt());

	score.is_finite().then_some(score.clamp(-1.0, 1.0) as f32)
}
