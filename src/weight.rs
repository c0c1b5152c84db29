//! OpenType `usWeightClass` ↔ fontconfig weight conversion.

// (OpenType, fontconfig) anchor points, interpolated linearly in between
const WEIGHT_MAP: [(f64, f64); 13] = [
    (0.0, 0.0),      // thin
    (100.0, 0.0),    // thin
    (200.0, 40.0),   // extralight
    (300.0, 50.0),   // light
    (350.0, 55.0),   // demilight
    (380.0, 75.0),   // book
    (400.0, 80.0),   // regular
    (500.0, 100.0),  // medium
    (600.0, 180.0),  // demibold
    (700.0, 200.0),  // bold
    (800.0, 205.0),  // extrabold
    (900.0, 210.0),  // black
    (1000.0, 215.0), // extrablack
];

fn lerp(x: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx == 0.0 {
        return y1;
    }
    y1 + (dy * (x - x1)) / dx
}

/// Maps an OpenType weight onto the fontconfig scale; -1 when out of range.
pub fn FcWeightFromOpenTypeDouble(ot_weight: f64) -> f64 {
    if ot_weight < 0.0 {
        return -1.0;
    }
    let ot_weight = ot_weight.min(WEIGHT_MAP[WEIGHT_MAP.len() - 1].0);
    let mut i = 1;
    while ot_weight > WEIGHT_MAP[i].0 {
        i += 1;
    }
    if ot_weight == WEIGHT_MAP[i].0 {
        return WEIGHT_MAP[i].1;
    }
    lerp(
        ot_weight,
        WEIGHT_MAP[i - 1].0,
        WEIGHT_MAP[i].0,
        WEIGHT_MAP[i - 1].1,
        WEIGHT_MAP[i].1,
    )
}

/// Inverse of [`FcWeightFromOpenTypeDouble`]; -1 when out of range.
pub fn FcWeightToOpenTypeDouble(fc_weight: f64) -> f64 {
    let last = WEIGHT_MAP[WEIGHT_MAP.len() - 1];
    if !(0.0..=last.1).contains(&fc_weight) {
        return -1.0;
    }
    let mut i = 1;
    while fc_weight > WEIGHT_MAP[i].1 {
        i += 1;
    }
    if fc_weight == WEIGHT_MAP[i].1 {
        return WEIGHT_MAP[i].0;
    }
    lerp(
        fc_weight,
        WEIGHT_MAP[i - 1].1,
        WEIGHT_MAP[i].1,
        WEIGHT_MAP[i - 1].0,
        WEIGHT_MAP[i].0,
    )
}

pub fn FcWeightFromOpenType(ot_weight: i32) -> i32 {
    (FcWeightFromOpenTypeDouble(ot_weight as f64) + 0.5) as i32
}

pub fn FcWeightToOpenType(fc_weight: i32) -> i32 {
    (FcWeightToOpenTypeDouble(fc_weight as f64) + 0.5) as i32
}
