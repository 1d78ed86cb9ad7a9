use sha1::{Digest, Sha1};

/// Incremental SHA-1 over a sequence of fields.
///
/// Every field is length-prefixed so that `["ab", "c"]` and `["a", "bc"]`
/// produce different digests.
#[derive(Clone, Default)]
pub struct Sha1Accumulator {
    hasher: Sha1,
}

impl Sha1Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, value: &str) -> &mut Self {
        self.hasher.update((value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator_is_the_empty_digest() {
        assert_eq!(Sha1Accumulator::new().finish(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn accumulator_separates_field_boundaries() {
        let mut a = Sha1Accumulator::new();
        a.field("ab").field("c");
        let mut b = Sha1Accumulator::new();
        b.field("a").field("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn accumulator_is_stable() {
        let mut a = Sha1Accumulator::new();
        a.field("para").field("hello");
        let mut b = Sha1Accumulator::new();
        b.field("para").field("hello");
        assert_eq!(a.finish(), b.finish());
    }
}
