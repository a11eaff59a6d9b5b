//! Random password generation and strength scoring.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "!@#$%^&*()-_=+[{]}|;:,<.>/?";

/// Which alphabets a generated password draws from.
///
/// Lowercase letters are always included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
  pub length: usize,
  pub uppercase: bool,
  pub digits: bool,
  pub symbols: bool,
}

impl Default for GeneratorOptions {
  fn default() -> Self {
    Self {
      length: 12,
      uppercase: true,
      digits: true,
      symbols: true,
    }
  }
}

impl GeneratorOptions {
  /// Number of characters that are always force-inserted.
  pub fn seed_count(&self) -> usize {
    1 + self.uppercase as usize + self.digits as usize + self.symbols as usize
  }

  fn alphabet(&self) -> Vec<char> {
    let mut chars: Vec<char> = LOWERCASE.chars().collect();
    if self.uppercase {
      chars.extend(UPPERCASE.chars());
    }
    if self.digits {
      chars.extend(DIGITS.chars());
    }
    if self.symbols {
      chars.extend(SYMBOLS.chars());
    }
    chars
  }
}

/// Generate a password using the thread-local CSPRNG.
pub fn generate_password(options: GeneratorOptions) -> String {
  generate_password_with(&mut rand::rng(), options)
}

/// Generate a password with a caller-supplied RNG.
///
/// The result holds at least one character of every enabled class. If
/// `options.length` is smaller than [`GeneratorOptions::seed_count`] the
/// result is `seed_count` long; it is never truncated.
pub fn generate_password_with<R: Rng + ?Sized>(rng: &mut R, options: GeneratorOptions) -> String {
  let alphabet = options.alphabet();

  let mut password: Vec<char> = Vec::with_capacity(options.length.max(options.seed_count()));
  if options.uppercase {
    password.push(pick(rng, UPPERCASE));
  }
  if options.digits {
    password.push(pick(rng, DIGITS));
  }
  if options.symbols {
    password.push(pick(rng, SYMBOLS));
  }
  password.push(pick(rng, LOWERCASE));

  while password.len() < options.length {
    if let Some(c) = alphabet.choose(rng) {
      password.push(*c);
    }
  }

  password.shuffle(rng);
  password.into_iter().collect()
}

fn pick<R: Rng + ?Sized>(rng: &mut R, set: &str) -> char {
  let chars: Vec<char> = set.chars().collect();
  chars[rng.random_range(0..chars.len())]
}

/// Score and label for a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strength {
  pub score: u8,
  pub label: &'static str,
}

/// Maximum score [`check_strength`] can award.
pub const MAX_STRENGTH: u8 = 8;

/// Score a password by counting satisfied criteria.
pub fn check_strength(password: &str) -> Strength {
  let len = password.chars().count();
  let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
  let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
  let has_digit = password.chars().any(|c| c.is_ascii_digit());
  let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

  let criteria = [
    len >= 8,
    len >= 12,
    len >= 16,
    has_upper,
    has_lower,
    has_digit,
    has_symbol,
    len >= 10 && has_upper && has_lower && has_digit && has_symbol,
  ];
  let score = criteria.iter().filter(|met| **met).count() as u8;

  let label = match score {
    0..=2 => "Weak",
    3..=4 => "Fair",
    5..=6 => "Good",
    7..=8 => "Strong",
    _ => "Very Strong",
  };

  Strength { score, label }
}
