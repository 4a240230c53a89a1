use std::{fmt, str::FromStr};

use anyhow::bail;
use rand::Rng;
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Dice-notation value, eg. "1d20+2".
///
/// A bare integer parses as a constant roll ("3" is zero dice plus 3), the
/// empty string as a constant zero.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct Dice {
    pub count: i32,
    pub sides: i32,
    pub modifier: i32,
}

impl Dice {
    pub fn new(count: i32, sides: i32, modifier: i32) -> Dice {
        Dice {
            count,
            sides,
            modifier,
        }
    }

    /// Constant-value dice with no random component.
    pub fn flat(modifier: i32) -> Dice {
        Dice {
            count: 0,
            sides: 0,
            modifier,
        }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        let mut total = self.modifier;
        for _ in 0..self.count {
            if self.sides > 0 {
                total += rng.gen_range(1..=self.sides);
            }
        }
        total
    }

    /// Expected value of a roll.
    pub fn average(&self) -> f32 {
        self.count as f32 * (self.sides as f32 + 1.0) / 2.0
            + self.modifier as f32
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 || self.sides == 0 {
            return write!(f, "{}", self.modifier);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

impl FromStr for Dice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Dice::default());
        }

        let Some(d) = s.find(['d', 'D']) else {
            // Constant roll.
            return Ok(Dice::flat(s.parse()?));
        };

        let count: i32 = if d == 0 { 1 } else { s[..d].parse()? };

        let rest = &s[d + 1..];
        let (sides, modifier) = match rest.find(['+', '-']) {
            Some(m) => (rest[..m].parse()?, rest[m..].parse()?),
            None => (rest.parse()?, 0),
        };

        if count < 0 || sides < 0 {
            bail!("negative dice");
        }

        Ok(Dice {
            count,
            sides,
            modifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn parsing() {
        assert_eq!("1d20+2".parse::<Dice>().unwrap(), Dice::new(1, 20, 2));
        assert_eq!("2d6".parse::<Dice>().unwrap(), Dice::new(2, 6, 0));
        assert_eq!("d8-1".parse::<Dice>().unwrap(), Dice::new(1, 8, -1));
        assert_eq!("3".parse::<Dice>().unwrap(), Dice::flat(3));
        assert_eq!("-2".parse::<Dice>().unwrap(), Dice::flat(-2));
        assert_eq!("".parse::<Dice>().unwrap(), Dice::default());

        assert!("xd6".parse::<Dice>().is_err());
        assert!("1d".parse::<Dice>().is_err());
    }

    #[test]
    fn display_round_trip() {
        for s in ["1d20+2", "2d6", "1d8-1", "3", "0"] {
            let d: Dice = s.parse().unwrap();
            assert_eq!(d.to_string().parse::<Dice>().unwrap(), d);
        }
    }

    #[test]
    fn averages() {
        assert_eq!("1d20".parse::<Dice>().unwrap().average(), 10.5);
        assert_eq!("2d6+1".parse::<Dice>().unwrap().average(), 8.0);
        assert_eq!(Dice::flat(4).average(), 4.0);
    }

    #[test]
    fn roll_bounds() {
        let mut rng = crate::GameRng::seed_from_u64(123);
        let d: Dice = "2d6+1".parse().unwrap();
        for _ in 0..1000 {
            let r = d.roll(&mut rng);
            assert!((3..=13).contains(&r));
        }
    }
}
