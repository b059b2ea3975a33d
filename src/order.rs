use crate::Error;

/// Order of the Gaussian derivative computed along one axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerivativeOrder {
    /// Plain smoothing.
    #[default]
    Zero,
    First,
    Second,
}

/// Parity of an impulse response about its centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    /// `h(-x) == h(x)`: smoothing and even derivatives.
    Symmetric,
    /// `h(-x) == -h(x)`: odd derivatives.
    Antisymmetric,
}

impl DerivativeOrder {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::First => 1,
            Self::Second => 2,
        }
    }

    pub fn symmetry(self) -> Symmetry {
        match self {
            Self::First => Symmetry::Antisymmetric,
            Self::Zero | Self::Second => Symmetry::Symmetric,
        }
    }
}

impl TryFrom<u32> for DerivativeOrder {
    type Error = Error;

    fn try_from(order: u32) -> Result<Self, Error> {
        match order {
            0 => Ok(Self::Zero),
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            order => Err(Error::UnsupportedOrder { order }),
        }
    }
}
