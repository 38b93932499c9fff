use rand::Rng;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

use crate::error::Error;

const LOWER_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGIT_CHARSET: &str = "0123456789";

/// Longest password the generator produces.
pub const MAX_PASSWORD_LENGTH: usize = 1024;

/// Largest entropy request accepted by [`Generator::generate`].
pub const MAX_ENTROPY_BITS: u32 = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorPolicy {
    pub min_length: usize,
    pub bits_per_character: f64,
    pub special_charset: String,
}

/// Generates random passwords from the OS CSPRNG.
///
/// Every password contains at least one lowercase letter, uppercase letter, digit and
/// special character.
#[derive(Debug, Clone)]
pub struct Generator {
    policy: GeneratorPolicy,
    required: [Vec<char>; 4],
    charset: Vec<char>,
}

impl Generator {
    pub fn new(policy: GeneratorPolicy) -> Result<Self, Error> {
        if policy.min_length == 0 {
            return Err(Error::Validation("minimum length must be greater than zero".into()));
        }
        if policy.min_length > MAX_PASSWORD_LENGTH {
            return Err(Error::Validation(format!(
                "minimum length cannot exceed {MAX_PASSWORD_LENGTH} characters"
            )));
        }
        if policy.bits_per_character.is_nan() || policy.bits_per_character <= 0.0 {
            return Err(Error::Validation("bits per character must be greater than zero".into()));
        }
        if policy.special_charset.is_empty() {
            return Err(Error::Validation("special character set cannot be empty".into()));
        }

        let required: [Vec<char>; 4] = [
            LOWER_CHARSET.chars().collect(),
            UPPER_CHARSET.chars().collect(),
            DIGIT_CHARSET.chars().collect(),
            policy.special_charset.chars().collect(),
        ];
        let charset: Vec<char> = required.iter().flatten().copied().collect();

        Ok(Self { policy, required, charset })
    }

    /// The length of a password carrying at least `bits` of entropy under this policy.
    pub fn length_for(&self, bits: u32) -> usize {
        let length = (f64::from(bits) / self.policy.bits_per_character).ceil() as usize;
        length.max(self.policy.min_length)
    }

    /// Returns a password with at least `bits` of entropy.
    pub fn generate(&self, bits: u32) -> Result<String, Error> {
        if bits == 0 {
            return Err(Error::Validation("bits must be greater than zero".into()));
        }
        if bits > MAX_ENTROPY_BITS {
            return Err(Error::Validation(format!("bits cannot exceed {MAX_ENTROPY_BITS}")));
        }

        let length = self.length_for(bits);
        if length > MAX_PASSWORD_LENGTH {
            return Err(Error::Validation(format!(
                "password length {length} exceeds the maximum of {MAX_PASSWORD_LENGTH}"
            )));
        }
        if length < self.required.len() {
            return Err(Error::Validation(format!(
                "password length {length} is too short to include every character class"
            )));
        }

        let mut rng = OsRng;
        let mut password: Vec<char> = Vec::with_capacity(length);
        for set in &self.required {
            password.push(set[rng.gen_range(0..set.len())]);
        }
        while password.len() < length {
            password.push(self.charset[rng.gen_range(0..self.charset.len())]);
        }
        // move the guaranteed characters away from the front
        password.shuffle(&mut rng);

        Ok(password.into_iter().collect())
    }
}
