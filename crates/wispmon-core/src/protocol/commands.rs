//! Protocol commands
//!
//! Defines the command descriptors accepted by the monitor and the response
//! descriptors it sends back.

use serde::{Deserialize, Serialize};

/// Commands the host can send to the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Sample Vcap once
    GetVcap,
    /// Sample Vboost once
    GetVboost,
    /// Sample Vreg once
    GetVreg,
    /// Sample Vrect once
    GetVrect,
    /// Hold Vcap at a target ADC level
    SetVcap,
    /// Hold Vboost at a target ADC level
    SetVboost,
    /// Hold Vreg at a target ADC level
    SetVreg,
    /// Hold Vrect at a target ADC level
    SetVrect,
    /// Release a previously set power level
    ReleasePower,
    /// Put the target into active debug mode
    EnterActiveDebug,
    /// Leave active debug mode
    ExitActiveDebug,
    /// Read the target program counter
    GetWispPc,
    /// Read target memory
    ExamineMemory,
    /// Begin streaming Vcap samples interleaved with time packets
    LogVcapBegin,
    /// Stop streaming Vcap samples
    LogVcapEnd,
    /// Begin streaming Vboost samples
    LogVboostBegin,
    /// Stop streaming Vboost samples
    LogVboostEnd,
    /// Begin streaming Vreg samples
    LogVregBegin,
    /// Stop streaming Vreg samples
    LogVregEnd,
    /// Begin streaming Vrect samples
    LogVrectBegin,
    /// Stop streaming Vrect samples
    LogVrectEnd,
    /// Begin logging RFID reader-to-tag traffic
    LogRfRxBegin,
    /// Stop logging RFID reader-to-tag traffic
    LogRfRxEnd,
    /// Begin logging RFID tag-to-reader traffic
    LogRfTxBegin,
    /// Stop logging RFID tag-to-reader traffic
    LogRfTxEnd,
    /// Send RF TX data
    SendRfTxData,
    /// Begin forwarding the target UART
    LogWispUartBegin,
    /// Stop forwarding the target UART
    LogWispUartEnd,
    /// Enable the tag-power port interrupt
    EnablePortIntTagPwr,
    /// Disable the tag-power port interrupt
    DisablePortIntTagPwr,
    /// Start the calibration PWM output
    PwmOn,
    /// Stop the calibration PWM output
    PwmOff,
    /// Set the PWM period in clock cycles
    SetPwmFrequency,
    /// Set the PWM duty cycle in clock cycles
    SetPwmDutyCycle,
    /// Begin streaming the injected voltage
    LogVinjBegin,
    /// Stop streaming the injected voltage
    LogVinjEnd,
    /// Drive the PWM pin high
    PwmHigh,
    /// Drive the PWM pin low
    PwmLow,
    /// Start a monitor marker region
    MonitorMarkerBegin,
    /// End a monitor marker region
    MonitorMarkerEnd,
    /// Pulse the AUX3 line
    PulseAux3,
    /// Charge the capacitor to a target level
    Charge,
    /// Discharge the capacitor to a target level
    Discharge,
}

impl Command {
    /// Get the descriptor byte sent on the wire
    pub fn code(&self) -> u8 {
        match self {
            Command::GetVcap => 0x00,
            Command::GetVboost => 0x01,
            Command::GetVreg => 0x02,
            Command::GetVrect => 0x03,
            Command::SetVcap => 0x04,
            Command::SetVboost => 0x05,
            Command::SetVreg => 0x06,
            Command::SetVrect => 0x07,
            Command::ReleasePower => 0x08,
            Command::EnterActiveDebug => 0x09,
            Command::ExitActiveDebug => 0x0A,
            Command::GetWispPc => 0x0B,
            Command::ExamineMemory => 0x0C,
            Command::LogVcapBegin => 0x0D,
            Command::LogVcapEnd => 0x0E,
            Command::LogVboostBegin => 0x0F,
            Command::LogVboostEnd => 0x10,
            Command::LogVregBegin => 0x11,
            Command::LogVregEnd => 0x12,
            Command::LogVrectBegin => 0x13,
            Command::LogVrectEnd => 0x14,
            Command::LogRfRxBegin => 0x15,
            Command::LogRfRxEnd => 0x16,
            Command::LogRfTxBegin => 0x17,
            Command::LogRfTxEnd => 0x18,
            Command::SendRfTxData => 0x19,
            Command::LogWispUartBegin => 0x1A,
            Command::LogWispUartEnd => 0x1B,
            Command::EnablePortIntTagPwr => 0x1C,
            Command::DisablePortIntTagPwr => 0x1D,
            Command::PwmOn => 0x1E,
            Command::PwmOff => 0x1F,
            Command::SetPwmFrequency => 0x20,
            Command::SetPwmDutyCycle => 0x21,
            Command::LogVinjBegin => 0x22,
            Command::LogVinjEnd => 0x23,
            Command::PwmHigh => 0x24,
            Command::PwmLow => 0x25,
            Command::MonitorMarkerBegin => 0x26,
            Command::MonitorMarkerEnd => 0x27,
            Command::PulseAux3 => 0x28,
            Command::Charge => 0x29,
            // The firmware skips 0x2A-0x2F
            Command::Discharge => 0x30,
        }
    }
}

/// Response descriptors the monitor sends to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    /// Vcap ADC sample
    Vcap,
    /// Vboost ADC sample
    Vboost,
    /// Vreg ADC sample
    Vreg,
    /// Vrect ADC sample
    Vrect,
    /// A set-power command has taken effect
    SetPowerComplete,
    /// A release-power command has taken effect
    ReleasePowerComplete,
    /// Target program counter
    WispPc,
    /// Target memory contents
    WispMemory,
    /// Decoded reader-to-tag RFID traffic
    RfRx,
    /// Tag-to-reader RFID event
    RfTx,
    /// Bytes the target sent to the monitor
    UartWispToMonitor,
    /// Bytes the monitor sent to the target
    UartMonitorToWisp,
    /// Tag power event
    TagPwr,
    /// Free-running cycle counter snapshot
    Time,
    /// Injected voltage sample
    Vinj,
}

impl Response {
    /// Decode a descriptor byte, returning `None` for unknown descriptors
    pub fn from_byte(byte: u8) -> Option<Self> {
        let response = match byte {
            0x00 => Response::Vcap,
            0x01 => Response::Vboost,
            0x02 => Response::Vreg,
            0x03 => Response::Vrect,
            0x04 => Response::SetPowerComplete,
            0x05 => Response::ReleasePowerComplete,
            0x06 => Response::WispPc,
            0x07 => Response::WispMemory,
            0x08 => Response::RfRx,
            0x09 => Response::RfTx,
            0x0A => Response::UartWispToMonitor,
            0x0B => Response::UartMonitorToWisp,
            0x0C => Response::TagPwr,
            0x0D => Response::Time,
            0x0E => Response::Vinj,
            _ => return None,
        };
        Some(response)
    }

    /// Get the descriptor byte
    pub fn code(&self) -> u8 {
        match self {
            Response::Vcap => 0x00,
            Response::Vboost => 0x01,
            Response::Vreg => 0x02,
            Response::Vrect => 0x03,
            Response::SetPowerComplete => 0x04,
            Response::ReleasePowerComplete => 0x05,
            Response::WispPc => 0x06,
            Response::WispMemory => 0x07,
            Response::RfRx => 0x08,
            Response::RfTx => 0x09,
            Response::UartWispToMonitor => 0x0A,
            Response::UartMonitorToWisp => 0x0B,
            Response::TagPwr => 0x0C,
            Response::Time => 0x0D,
            Response::Vinj => 0x0E,
        }
    }

    /// Whether the frame carries a length byte and payload after the descriptor
    pub fn has_payload(&self) -> bool {
        !matches!(
            self,
            Response::SetPowerComplete
                | Response::ReleasePowerComplete
                | Response::RfTx
                | Response::TagPwr
        )
    }

    /// Payload length the host relies on, for descriptors with a fixed layout
    pub fn fixed_payload_len(&self) -> Option<usize> {
        match self {
            Response::Time => Some(4),
            Response::Vcap => Some(2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_command_codes() {
        assert_eq!(Command::LogVcapBegin.code(), 0x0D);
        assert_eq!(Command::LogVcapEnd.code(), 0x0E);
        assert_eq!(Command::Discharge.code(), 0x30);
    }

    #[test]
    fn test_response_descriptor_roundtrip() {
        for byte in 0x00..=0x0E {
            let response = Response::from_byte(byte).expect("known descriptor");
            assert_eq!(response.code(), byte);
        }
        assert_eq!(Response::from_byte(0x0F), None);
        assert_eq!(Response::from_byte(0xF0), None);
    }

    #[test]
    fn test_payload_layout() {
        assert!(!Response::TagPwr.has_payload());
        assert!(!Response::RfTx.has_payload());
        assert!(Response::Time.has_payload());
        assert_eq!(Response::Time.fixed_payload_len(), Some(4));
        assert_eq!(Response::Vcap.fixed_payload_len(), Some(2));
        assert_eq!(Response::WispMemory.fixed_payload_len(), None);
    }
}
