// SPDX-License-Identifier: MPL-2.0

use std::convert::TryFrom;
use std::str::FromStr;
use thiserror::Error;

/// PTU pointing given on the command line, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointing {
    pub azimuth: f64,
    pub elevation: f64,
}

#[derive(Error, Debug)]
pub enum PointingError {
    #[error("Not enough arguments: expected 2 but got only {0}")]
    NotEnoughArgs(usize),
    #[error("Too many arguments: expected 2 but got more")]
    TooManyArgs,
    #[error("Non finite angle: {0}")]
    NonFinite(f64),
    #[error("Error parsing pointing angles")]
    Parse(#[from] std::num::ParseFloatError),
}

impl TryFrom<Vec<&str>> for Pointing {
    type Error = PointingError;
    fn try_from(vs: Vec<&str>) -> Result<Self, Self::Error> {
        let mut vs = vs.iter();
        match (vs.next(), vs.next(), vs.next()) {
            (None, _, _) => Err(PointingError::NotEnoughArgs(0)),
            (_, None, _) => Err(PointingError::NotEnoughArgs(1)),
            (_, _, Some(_)) => Err(PointingError::TooManyArgs),
            (Some(az), Some(el), None) => {
                let azimuth: f64 = az.trim().parse()?;
                let elevation: f64 = el.trim().parse()?;
                for angle in [azimuth, elevation].iter() {
                    if !angle.is_finite() {
                        return Err(PointingError::NonFinite(*angle));
                    }
                }
                Ok(Pointing { azimuth, elevation })
            }
        }
    }
}

impl FromStr for Pointing {
    type Err = PointingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PointingError::NotEnoughArgs(0));
        }
        Self::try_from(s.split(',').collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn az_el_pair() {
        let p: Pointing = "-90,25.5".parse().unwrap();
        assert_eq!(
            p,
            Pointing {
                azimuth: -90.0,
                elevation: 25.5
            }
        );
    }

    #[test]
    fn wrong_arity() {
        assert!(matches!(
            "".parse::<Pointing>(),
            Err(PointingError::NotEnoughArgs(0))
        ));
        assert!(matches!(
            "90".parse::<Pointing>(),
            Err(PointingError::NotEnoughArgs(1))
        ));
        assert!(matches!(
            "90,0,1".parse::<Pointing>(),
            Err(PointingError::TooManyArgs)
        ));
    }

    #[test]
    fn not_a_number() {
        assert!(matches!(
            "90,up".parse::<Pointing>(),
            Err(PointingError::Parse(_))
        ));
        assert!(matches!(
            "inf,0".parse::<Pointing>(),
            Err(PointingError::NonFinite(_))
        ));
    }
}
