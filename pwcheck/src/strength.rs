use serde::Serialize;

use crate::error::Error;

/// Passwords that are rejected outright regardless of their composition.
const COMMON_PASSWORDS: &[&str] = &[
    "123456",
    "password",
    "123456789",
    "12345678",
    "qwerty",
    "abc123",
    "password1",
    "111111",
    "123123",
    "letmein",
    "welcome",
    "admin",
    "dragon",
    "football",
    "iloveyou",
    "monkey",
    "sunshine",
    "princess",
    "qwerty123",
    "login",
];

/// Extra length beyond the minimum required for a `Strong` rating.
const STRONG_LENGTH_MARGIN: usize = 4;

pub fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.contains(&lowered.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    /// Violates at least one mandatory requirement.
    Weak,
    /// Meets the mandatory requirements but could be improved.
    Moderate,
    /// Comfortably exceeds the requirements.
    Strong,
}

impl Strength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::Weak => "weak",
            Strength::Moderate => "moderate",
            Strength::Strong => "strong",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
        }
    }
}

/// A policy violation or recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub code: &'static str,
    pub message: &'static str,
    pub severity: Severity,
    pub requirement: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub min_length: usize,
}

/// Rates passwords against a [`Policy`].
#[derive(Debug, Clone)]
pub struct Evaluator {
    policy: Policy,
}

impl Evaluator {
    pub fn new(policy: Policy) -> Result<Self, Error> {
        if policy.min_length == 0 {
            return Err(Error::Validation("minimum length must be greater than zero".into()));
        }
        Ok(Self { policy })
    }

    pub fn evaluate(&self, password: &str) -> (Strength, Vec<Finding>) {
        let mut findings = Vec::with_capacity(4);

        let length = password.chars().count();
        if length < self.policy.min_length {
            findings.push(Finding {
                code: "length.minimum",
                message: "password is shorter than the minimum required length",
                severity: Severity::Error,
                requirement: "length",
            });
        }

        let classes = CharClasses::of(password);
        for (present, code, message) in [
            (classes.upper, "charset.uppercase", "add at least one uppercase character"),
            (classes.lower, "charset.lowercase", "add at least one lowercase character"),
            (classes.digit, "charset.numeric", "add at least one numeric character"),
            (classes.special, "charset.special", "add at least one special character"),
        ] {
            if !present {
                findings.push(Finding {
                    code,
                    message,
                    severity: Severity::Warn,
                    requirement: "character_sets",
                });
            }
        }

        if is_common_password(password) {
            findings.push(Finding {
                code: "password.common",
                message: "password is commonly used and easily guessable",
                severity: Severity::Error,
                requirement: "common_passwords",
            });
        }

        let strength = if findings.iter().any(|f| f.severity == Severity::Error) {
            Strength::Weak
        } else if findings.is_empty()
            && length >= self.policy.min_length + STRONG_LENGTH_MARGIN
            && classes.all()
        {
            Strength::Strong
        } else {
            Strength::Moderate
        };

        (strength, findings)
    }
}

#[derive(Debug, Default)]
struct CharClasses {
    upper: bool,
    lower: bool,
    digit: bool,
    special: bool,
}

impl CharClasses {
    fn of(password: &str) -> Self {
        let mut classes = Self::default();
        for c in password.chars() {
            if c.is_uppercase() {
                classes.upper = true;
            } else if c.is_lowercase() {
                classes.lower = true;
            } else if c.is_numeric() {
                classes.digit = true;
            } else if !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control() {
                classes.special = true;
            }
        }
        classes
    }

    fn all(&self) -> bool {
        self.upper && self.lower && self.digit && self.special
    }
}
