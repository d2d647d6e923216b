use serde::{Deserialize, Serialize};

/// Tesseract page segmentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PSMMode {
    OsdOnly = 0,
    AutoOsd = 1,
    AutoOnly = 2,
    Auto = 3,
    SingleColumn = 4,
    SingleBlockVertical = 5,
    SingleBlock = 6,
    SingleLine = 7,
    SingleWord = 8,
    CircleWord = 9,
    SingleChar = 10,
    SparseText = 11,
    SparseTextOsd = 12,
    RawLine = 13,
}

impl PSMMode {
    pub fn from_u8(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(PSMMode::OsdOnly),
            1 => Ok(PSMMode::AutoOsd),
            2 => Ok(PSMMode::AutoOnly),
            3 => Ok(PSMMode::Auto),
            4 => Ok(PSMMode::SingleColumn),
            5 => Ok(PSMMode::SingleBlockVertical),
            6 => Ok(PSMMode::SingleBlock),
            7 => Ok(PSMMode::SingleLine),
            8 => Ok(PSMMode::SingleWord),
            9 => Ok(PSMMode::CircleWord),
            10 => Ok(PSMMode::SingleChar),
            11 => Ok(PSMMode::SparseText),
            12 => Ok(PSMMode::SparseTextOsd),
            13 => Ok(PSMMode::RawLine),
            _ => Err(format!("Invalid PSM mode value: {}", value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psm_mode_from_u8_valid() {
        for value in 0..=13u8 {
            let mode = PSMMode::from_u8(value).unwrap();
            assert_eq!(mode.as_u8(), value);
        }
        assert_eq!(PSMMode::from_u8(6).unwrap(), PSMMode::SingleBlock);
    }

    #[test]
    fn test_psm_mode_from_u8_invalid() {
        assert!(PSMMode::from_u8(14).is_err());
        assert!(PSMMode::from_u8(255).is_err());
    }
}
