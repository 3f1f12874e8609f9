//! Unit Conversion Functions
//!
//! Conversions between the monitor's raw readings and physical units:
//! - ADC code ↔ volts (12-bit converter referenced to VDD)
//! - Clock cycles → seconds

/// Full-scale count of the monitor's 12-bit ADC
pub const ADC_FULL_SCALE: f64 = 4096.0;

/// Convert a 12-bit ADC code to volts
pub fn adc_to_volts(code: u16, vdd: f64) -> f64 {
    f64::from(code) / ADC_FULL_SCALE * vdd
}

/// Convert a voltage to the ADC code the monitor compares against
///
/// Rounds up, and saturates at the ends of the `u16` range.
pub fn volts_to_adc(volts: f64, vdd: f64) -> u16 {
    let code = (volts * ADC_FULL_SCALE / vdd).ceil();
    code.clamp(0.0, f64::from(u16::MAX)) as u16
}

/// Convert a cycle count to seconds
pub fn cycles_to_seconds(cycles: u64, clk_period: f64) -> f64 {
    cycles as f64 * clk_period
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_midscale() {
        assert_eq!(adc_to_volts(2048, 3.3), 1.65);
        assert_eq!(adc_to_volts(0, 3.35), 0.0);
    }

    #[test]
    fn test_adc_monotonic() {
        let mut last = -1.0;
        for code in 0..4096u16 {
            let v = adc_to_volts(code, 3.35);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn test_volts_to_adc_rounds_up() {
        // 2.2 V at 3.35 V reference is 2689.91 counts
        assert_eq!(volts_to_adc(2.2, 3.35), 2690);
        assert_eq!(volts_to_adc(-1.0, 3.35), 0);
    }

    #[test]
    fn test_cycles_to_seconds() {
        assert_eq!(cycles_to_seconds(0, 1e-6), 0.0);
        assert!((cycles_to_seconds(1_000_000, 1e-6) - 1.0).abs() < 1e-12);
    }
}
