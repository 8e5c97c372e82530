//! Short code generation
//!
//! Codes are random alphanumeric strings. Uniqueness is not checked here: the
//! storage layer's unique index rejects a duplicate and the caller retries with
//! a fresh code, up to [`MAX_GENERATION_ATTEMPTS`].

pub const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const MAX_GENERATION_ATTEMPTS: usize = 8;

pub fn random_alphanumeric(len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Source of candidate short codes
pub trait ShortCodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl ShortCodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        random_alphanumeric(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_codes_use_alphabet_and_length() {
        let generator = RandomCodeGenerator::new(7);
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.len(), 7);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn generated_codes_rarely_repeat() {
        let generator = RandomCodeGenerator::new(7);
        let codes: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(codes.len(), 1000);
    }
}
