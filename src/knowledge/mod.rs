pub mod extract;
pub mod gaps;
pub mod graph;
pub mod judge;
pub mod search;
pub mod state;
pub mod stats;
pub mod store;
pub mod timeline;
pub mod types;

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Recover cosine similarity from an L2 distance between unit vectors,
/// clamped to `[0, 1]`.
pub fn l2_to_cosine(distance: f64) -> f64 {
    (1.0 - distance * distance / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_to_cosine_endpoints() {
        assert!((l2_to_cosine(0.0) - 1.0).abs() < 1e-9);
        // orthogonal unit vectors sit at distance sqrt(2)
        assert!(l2_to_cosine(std::f64::consts::SQRT_2) < 1e-9);
        // opposite vectors clamp to zero rather than going negative
        assert_eq!(l2_to_cosine(2.0), 0.0);
    }

    #[test]
    fn embedding_bytes_length() {
        let v = vec![0.0f32; 384];
        assert_eq!(embedding_to_bytes(&v).len(), 384 * 4);
    }
}
