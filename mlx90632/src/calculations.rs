// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Temperature compensation for DSPv5 sensors.
//!
//! Everything in here is a pure function of the raw RAM values, the calibration constants from
//! EEPROM and (for object temperatures) the emissivity of the object being measured. Nothing in
//! this module talks to the sensor.
use num_traits::Float;

use crate::eeprom::CalibrationConstants;

const KELVINS_TO_CELSIUS: f64 = 273.15;

/// Reference divisor for the ambient channel.
const REF_3: f64 = 12.0;

/// Reference divisor for the object channel.
const REF_12: f64 = 12.0;

/// Preprocessed values are scaled by 2^19.
const PREPROCESS_SCALE: f64 = 524288.0;

/// Scale used to keep precision while computing the sensitivity correction.
const POW10: f64 = 1e10;

/// The number of refinement passes for object temperatures.
const OBJECT_ITERATIONS: usize = 5;

/// The initial guess for object temperatures, in degrees Celsius.
const OBJECT_SEED: f64 = 25.0;

/// The emissivity of the object being measured.
///
/// A stored value of exactly 0.0 means the emissivity hasn't been set, and is read back as 1.0.
/// This is also the default.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Emissivity(f64);

impl Emissivity {
    /// Store an emissivity. Any value is accepted; sensible values are in (0, 1].
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// The effective emissivity.
    pub fn value(&self) -> f64 {
        if self.0 == 0.0 {
            1.0
        } else {
            self.0
        }
    }
}

impl From<f64> for Emissivity {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Normalize the raw ambient values. The result is the `AMB` value used by the rest of the
/// ambient and object calculations.
pub fn preprocess_ambient(ambient_new: i16, ambient_old: i16, gb: i16) -> f64 {
    let k_gb = f64::from(gb) / 1024.0;
    let ambient_new = f64::from(ambient_new) / REF_3;
    let vr_ta = f64::from(ambient_old) + k_gb * ambient_new;
    (ambient_new / vr_ta) * PREPROCESS_SCALE
}

/// Normalize the raw object values of a medical range measurement.
///
/// The new and old object values are averaged with integer division before normalizing.
pub fn preprocess_object(
    object_new: i16,
    object_old: i16,
    ambient_new: i16,
    ambient_old: i16,
    ka: i16,
) -> f64 {
    let average = (i32::from(object_new) + i32::from(object_old)) / 2;
    normalize_object(f64::from(average), ambient_new, ambient_old, ka)
}

/// Normalize the combined raw object value of an extended range measurement.
pub fn preprocess_object_extended(
    object: i16,
    ambient_new: i16,
    ambient_old: i16,
    ka: i16,
) -> f64 {
    normalize_object(f64::from(object), ambient_new, ambient_old, ka)
}

fn normalize_object(object: f64, ambient_new: i16, ambient_old: i16, ka: i16) -> f64 {
    let k_ka = f64::from(ka) / 1024.0;
    let vr_ir = f64::from(ambient_old) + k_ka * (f64::from(ambient_new) / REF_3);
    ((object / REF_12) / vr_ir) * PREPROCESS_SCALE
}

/// Calculate the ambient (sensor) temperature in degrees Celsius.
///
/// This is the same for both the medical and extended ranges.
pub fn ambient_temperature(
    ambient_new: i16,
    ambient_old: i16,
    calibration: &CalibrationConstants,
) -> f64 {
    let amb = preprocess_ambient(ambient_new, ambient_old, calibration.gb);
    // 2^44
    let a_sub = f64::from(calibration.p_t) / 17592186044416.0;
    let b_sub = amb - f64::from(calibration.p_r) / 256.0;
    let a_block = a_sub * (b_sub * b_sub);
    // 2^20
    let b_block = (b_sub / f64::from(calibration.p_g)) * 1048576.0;
    let c_block = f64::from(calibration.p_o) / 256.0;
    b_block + a_block + c_block
}

/// The sensor temperature derived from the preprocessed ambient value.
fn t_a_dut(ambient: f64, calibration: &CalibrationConstants) -> f64 {
    // The device works with integers, so the preprocessed value is truncated first.
    let ambient = f64::from(ambient as i32);
    let k_ea = f64::from(calibration.ea) / 65536.0;
    let k_eb = f64::from(calibration.eb) / 256.0;
    (ambient - k_eb) / k_ea + 25.0
}

fn fourth_power(celsius: f64) -> f64 {
    let kelvin = celsius + KELVINS_TO_CELSIUS;
    let squared = kelvin * kelvin;
    squared * squared
}

/// Blend the reflected temperature with the sensor temperature, weighted by emissivity.
fn reflected_term(t_a_dut: f64, reflected: f64, emissivity: f64) -> f64 {
    let t_r4 = fourth_power(reflected);
    let t_a4 = fourth_power(t_a_dut);
    t_r4 - (t_r4 - t_a4) / emissivity
}

/// The parts of the object calculation that don't change between iterations.
struct ObjectInputs {
    object: f64,
    t_a_dut: f64,
    /// Either `TAdut^4`, or the reflected temperature term.
    t_a_t_r4: f64,
    ga: i32,
    fa: i32,
    fb: i32,
    ha: i16,
    hb: i16,
    emissivity: f64,
}

impl ObjectInputs {
    fn iterate(&self, previous: f64) -> f64 {
        let ha_customer = f64::from(self.ha) / 16384.0;
        let hb_customer = f64::from(self.hb) / 1024.0;
        // 2^36
        let calced_ga = (f64::from(self.ga) * (previous - 25.0)) / 68719476736.0;
        let calced_gb = (f64::from(self.fb) * (self.t_a_dut - 25.0)) / 68719476736.0;
        // 2^46
        let alpha_corr = (f64::from(self.fa) * POW10
            * ha_customer
            * (1.0 + calced_ga + calced_gb))
            / 70368744177664.0;
        let calced_fa = self.object / (self.emissivity * (alpha_corr / POW10));
        let first_sqrt = Float::sqrt(calced_fa + self.t_a_t_r4);
        Float::sqrt(first_sqrt) - KELVINS_TO_CELSIUS - hb_customer
    }

    fn solve(&self) -> f64 {
        (0..OBJECT_ITERATIONS).fold(OBJECT_SEED, |temperature, _| self.iterate(temperature))
    }
}

fn object_inputs(
    object: f64,
    ambient: f64,
    calibration: &CalibrationConstants,
    emissivity: Emissivity,
) -> ObjectInputs {
    let t_a_dut = t_a_dut(ambient, calibration);
    ObjectInputs {
        object: f64::from(object as i32),
        t_a_dut,
        t_a_t_r4: fourth_power(t_a_dut),
        ga: calibration.ga,
        fa: calibration.fa,
        fb: calibration.fb,
        ha: calibration.ha,
        hb: calibration.hb,
        emissivity: emissivity.value(),
    }
}

/// Calculate the object temperature in degrees Celsius.
///
/// `object` and `ambient` are the preprocessed values from [`preprocess_object`] and
/// [`preprocess_ambient`]. The sensor's own temperature is used as the temperature of the
/// surroundings.
pub fn object_temperature(
    object: f64,
    ambient: f64,
    calibration: &CalibrationConstants,
    emissivity: Emissivity,
) -> f64 {
    object_inputs(object, ambient, calibration, emissivity).solve()
}

/// Calculate the object temperature, compensating for a `reflected` temperature (in degrees
/// Celsius) measured by some other means.
///
/// With an emissivity of 1.0 the reflected temperature has no effect.
pub fn object_temperature_reflected(
    object: f64,
    ambient: f64,
    reflected: f64,
    calibration: &CalibrationConstants,
    emissivity: Emissivity,
) -> f64 {
    let mut inputs = object_inputs(object, ambient, calibration, emissivity);
    inputs.t_a_t_r4 = reflected_term(inputs.t_a_dut, reflected, inputs.emissivity);
    inputs.solve()
}

/// Calculate the object temperature for an extended range measurement.
///
/// `object` is the preprocessed value from [`preprocess_object_extended`]. The extended range
/// always compensates for a reflected temperature, and uses half of `Fa`.
pub fn object_temperature_extended(
    object: f64,
    ambient: f64,
    reflected: f64,
    calibration: &CalibrationConstants,
    emissivity: Emissivity,
) -> f64 {
    let mut inputs = object_inputs(object, ambient, calibration, emissivity);
    inputs.t_a_t_r4 = reflected_term(inputs.t_a_dut, reflected, inputs.emissivity);
    inputs.fa = calibration.fa / 2;
    inputs.solve()
}
