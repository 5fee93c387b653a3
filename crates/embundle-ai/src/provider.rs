/// A text encoder that maps a batch of texts to fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// all of length [`dim`](Self::dim). When [`normalized`](Self::normalized) is
/// true every returned vector has unit L2 norm.
pub trait EmbeddingProvider {
    /// Identifier recorded in the bundle metadata.
    fn model_id(&self) -> &str;

    fn dim(&self) -> usize;

    fn normalized(&self) -> bool;

    fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<P> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn normalized(&self) -> bool {
        (**self).normalized()
    }

    fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// L2-normalize a vector in place.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector_untouched() {
        let mut v = vec![0.0; 3];
        normalize(&mut v);
        assert_eq!(v, vec![0.0; 3]);
    }
}
