//! PWM calibration table
//!
//! Measured Vcap produced by the monitor's calibration PWM output for each
//! (period, duty cycle) pair, both in SMCLK cycles. Values are measurements,
//! not a model: a pair that was not measured has no voltage.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// One measured row: PWM period and its (duty, volts) pairs
type MeasuredRow = (u16, &'static [(u16, f64)]);

#[rustfmt::skip]
static MEASURED: &[MeasuredRow] = &[
    (
        8,
        &[
            (1, 0.299),
            (2, 0.704),
            (3, 1.12),
            (4, 1.53),
            (5, 1.96),
            (6, 2.27),
            (7, 2.68),
            (8, 3.10),
        ],
    ),
    (
        9,
        &[
            (1, 0.259),
            (2, 0.613),
            (3, 0.985),
            (4, 1.35),
            (5, 1.73),
            (6, 2.11),
            (7, 2.37),
            (8, 2.72),
            (9, 3.10),
        ],
    ),
    (
        10,
        &[
            (1, 0.223),
            (2, 0.543),
            (3, 0.874),
            (4, 1.21),
            (5, 1.54),
            (6, 1.88),
            (7, 2.22),
            (8, 2.44),
            (9, 2.76),
            (10, 3.10),
        ],
    ),
    (
        11,
        &[
            (1, 0.194),
            (2, 0.482),
            (3, 0.780),
            (4, 1.09),
            (5, 1.39),
            (6, 1.70),
            (7, 2.00),
            (8, 2.31),
            (9, 2.49),
            (10, 2.79),
            (11, 3.09),
        ],
    ),
    (
        12,
        &[
            (1, 0.174),
            (2, 0.436),
            (3, 0.705),
            (4, 0.986),
            (5, 1.26),
            (6, 1.54),
            (7, 1.83),
            (8, 2.11),
            (9, 2.27),
            (10, 2.55),
            (11, 2.82),
            (12, 3.10),
        ],
    ),
    (
        13,
        &[
            (1, 0.158),
            (2, 0.403),
            (3, 0.647),
            (4, 0.904),
            (5, 1.17),
            (6, 1.41),
            (7, 1.68),
            (8, 1.94),
            (9, 2.20),
            (10, 2.34),
            (11, 2.59),
            (12, 2.84),
            (13, 3.10),
        ],
    ),
    (
        14,
        &[
            (1, 0.145),
            (2, 0.368),
            (3, 0.596),
            (4, 0.830),
            (5, 1.07),
            (6, 1.30),
            (7, 1.54),
            (8, 1.79),
            (9, 2.03),
            (10, 2.27),
            (11, 2.39),
            (12, 2.62),
            (13, 2.86),
            (14, 3.10),
        ],
    ),
    (
        15,
        &[
            (1, 0.123),
            (2, 0.332),
            (3, 0.545),
            (4, 0.762),
            (5, 0.992),
            (6, 1.21),
            (7, 1.43),
            (8, 1.66),
            (9, 1.89),
            (10, 2.11),
            (11, 2.34),
            (12, 2.44),
            (13, 2.65),
            (14, 2.87),
            (15, 3.10),
        ],
    ),
    (
        16,
        &[
            (1, 0.115),
            (2, 0.306),
            (3, 0.512),
            (4, 0.711),
            (5, 0.924),
            (6, 1.13),
            (7, 1.33),
            (8, 1.54),
            (9, 1.75),
            (10, 1.96),
            (11, 2.18),
            (12, 2.27),
            (13, 2.48),
            (14, 2.67),
            (15, 2.88),
            (16, 3.10),
        ],
    ),
    (
        512,
        &[
            (10, 0.007),
            (20, 0.057),
            (50, 0.286),
            (55, 0.309),
            (60, 0.346),
            (65, 0.378),
            (70, 0.421),
            (75, 0.453),
            (80, 0.491),
            (85, 0.521),
            (90, 0.563),
            (95, 0.592),
            (100, 0.638),
            (105, 0.663),
            (110, 0.699),
            (115, 0.732),
            (120, 0.771),
            (125, 0.805),
            (130, 0.844),
            (135, 0.878),
            (140, 0.916),
            (145, 0.948),
            (150, 0.993),
            (200, 1.33),
            (250, 1.66),
            (256, 1.70),
            (300, 1.98),
            (350, 2.29),
            (400, 2.42),
            (450, 2.71),
            (500, 3.03),
            (512, 3.11),
        ],
    ),
];

/// A single measured calibration point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationPoint {
    /// PWM period in clock cycles
    pub period: u16,
    /// PWM duty cycle in clock cycles
    pub duty: u16,
    /// Measured Vcap in volts
    pub volts: f64,
}

/// Immutable period -> duty -> volts mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationTable {
    entries: BTreeMap<u16, BTreeMap<u16, f64>>,
}

impl CalibrationTable {
    /// The measured table, built on first use
    pub fn measured() -> &'static CalibrationTable {
        static TABLE: OnceLock<CalibrationTable> = OnceLock::new();
        TABLE.get_or_init(|| Self::from_rows(MEASURED))
    }

    fn from_rows(rows: &[MeasuredRow]) -> Self {
        let entries = rows
            .iter()
            .map(|(period, duties)| (*period, duties.iter().copied().collect()))
            .collect();
        Self { entries }
    }

    /// Measured voltage for an exact (period, duty) pair
    pub fn lookup(&self, period: u16, duty: u16) -> Option<f64> {
        self.entries.get(&period)?.get(&duty).copied()
    }

    /// Measured PWM periods, ascending
    pub fn periods(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }

    /// Measured (duty, volts) pairs for a period, ascending by duty
    pub fn duties(&self, period: u16) -> Option<impl Iterator<Item = (u16, f64)> + '_> {
        self.entries
            .get(&period)
            .map(|row| row.iter().map(|(d, v)| (*d, *v)))
    }

    /// All measured points
    pub fn points(&self) -> impl Iterator<Item = CalibrationPoint> + '_ {
        self.entries.iter().flat_map(|(period, row)| {
            row.iter().map(move |(duty, volts)| CalibrationPoint {
                period: *period,
                duty: *duty,
                volts: *volts,
            })
        })
    }

    /// Number of measured points
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Whether the table has no points
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The measured point whose voltage is nearest `target_volts`.
    ///
    /// Ties go to the shorter period, then the smaller duty.
    pub fn closest(&self, target_volts: f64) -> Option<CalibrationPoint> {
        if !target_volts.is_finite() {
            return None;
        }
        self.points().fold(None, |best: Option<CalibrationPoint>, p| match best {
            Some(b) if (b.volts - target_volts).abs() <= (p.volts - target_volts).abs() => Some(b),
            _ => Some(p),
        })
    }
}

/// Look up a pair in the measured table
pub fn lookup(period: u16, duty: u16) -> Option<f64> {
    CalibrationTable::measured().lookup(period, duty)
}
