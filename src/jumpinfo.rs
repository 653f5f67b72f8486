//! `JumpInfo` (component C2): compact per-message metadata extracted from a
//! GRIB message, sufficient to answer range queries against the message's
//! raw bytes without ever decoding the full field.
//!
//! Grounded on `original_source/src/metkit/gribjump/GribInfo.h`/`.cc`.

use crate::error::JumpError;

/// The current sidecar record version (§6). Bump this, and
/// [`crate::sidecar`]'s fixed layout, together.
pub const CURRENT_VERSION: u8 = 1;

/// Default missing-value sentinel used by [`crate::extract`] when the
/// caller does not supply one (§9 design note: kept configurable rather
/// than hard-coded).
pub const DEFAULT_MISSING_VALUE: f64 = 9999.0;

/// The subset of a GRIB message's keyed metadata that [`JumpInfo::update`]
/// needs. An external GRIB codec library implements this trait; `metkit`
/// never decodes full field values itself. Mirrors the capability set
/// listed in spec §6: open-from-offset is the caller's responsibility (a
/// `GribMessage` is already positioned at one message), the rest is
/// key/value and key/array-size lookups.
pub trait GribMessage {
    /// Reads a named key as a signed integer.
    fn get_long(&self, key: &str) -> Result<i64, JumpError>;
    /// Reads a named key as a double.
    fn get_double(&self, key: &str) -> Result<f64, JumpError>;
    /// Reads a named key as a string.
    fn get_string(&self, key: &str) -> Result<String, JumpError>;
    /// Reads a named key as an unsigned integer. Default implementation
    /// delegates to [`Self::get_long`]; codecs with a genuine unsigned
    /// accessor may override it.
    fn get_unsigned(&self, key: &str) -> Result<u64, JumpError> {
        Ok(self.get_long(key)?.max(0) as u64)
    }
    /// Reads a named key as a boolean (non-zero long).
    fn get_bool(&self, key: &str) -> Result<bool, JumpError> {
        Ok(self.get_long(key)? != 0)
    }
    /// Lists the names of every key in the given namespace (e.g. `"mars"`),
    /// used by [`crate::grib_to_request`] to build an unexpanded `Request`
    /// from a message. Codecs that do not support namespace iteration may
    /// leave this at its default empty implementation.
    fn namespace_keys(&self, _namespace: &str) -> Result<Vec<String>, JumpError> {
        Ok(Vec::new())
    }
}

/// Compact per-message metadata (§3). One `JumpInfo` per GRIB message.
#[derive(Debug, Clone, PartialEq)]
pub struct JumpInfo {
    pub version: u8,
    pub edition_number: i64,
    pub binary_scale_factor: i64,
    pub decimal_scale_factor: i64,
    pub binary_multiplier: f64,
    pub decimal_multiplier: f64,
    pub reference_value: f64,
    pub bits_per_value: u64,
    pub offset_before_data: u64,
    pub offset_before_bitmap: u64,
    pub number_of_data_points: u64,
    pub number_of_values: u64,
    pub total_length: u64,
    pub msg_start_offset: u64,
    pub spherical_harmonics: i64,
    pub grid_hash: String,
    pub packing_type: String,
}

impl Default for JumpInfo {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            edition_number: 0,
            binary_scale_factor: 0,
            decimal_scale_factor: 0,
            binary_multiplier: 1.0,
            decimal_multiplier: 1.0,
            reference_value: 0.0,
            bits_per_value: 0,
            offset_before_data: 0,
            offset_before_bitmap: 0,
            number_of_data_points: 0,
            number_of_values: 0,
            total_length: 0,
            msg_start_offset: 0,
            spherical_harmonics: 0,
            grid_hash: String::new(),
            packing_type: String::new(),
        }
    }
}

impl JumpInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this record has been populated by [`Self::update`].
    pub fn ready(&self) -> bool {
        self.number_of_values > 0 || self.bits_per_value == 0 && self.number_of_data_points > 0
    }

    /// Populates every field by querying `msg` for the named keys listed
    /// in spec §4.2, validating the edition number, and precomputing the
    /// binary/decimal multipliers. Rejects unsupported editions and
    /// unsupported bit widths (§9 open question: `bits_per_value > 64` is
    /// rejected explicitly rather than silently truncated).
    pub fn update(&mut self, msg: &dyn GribMessage) -> Result<(), JumpError> {
        let edition_number = msg.get_long("editionNumber")?;
        if edition_number != 1 && edition_number != 2 {
            return Err(JumpError::UnsupportedEdition(edition_number));
        }

        let binary_scale_factor = msg.get_long("binaryScaleFactor")?;
        let decimal_scale_factor = msg.get_long("decimalScaleFactor")?;
        let bits_per_value = msg.get_unsigned("bitsPerValue")?;
        if bits_per_value > 64 {
            return Err(JumpError::UnsupportedPacking(format!(
                "bitsPerValue {bits_per_value} exceeds 64"
            )));
        }
        let reference_value = msg.get_double("referenceValue")?;
        let offset_before_data = msg.get_unsigned("offsetBeforeData")?;
        let number_of_data_points = msg.get_unsigned("numberOfDataPoints")?;
        let number_of_values = msg.get_unsigned("numberOfValues")?;
        let spherical_harmonics = msg.get_long("sphericalHarmonics")?;
        let total_length = msg.get_unsigned("totalLength")?;
        let grid_hash = msg.get_string("md5GridSection")?;
        let packing_type = msg.get_string("packingType")?;

        let bitmap_present = msg.get_bool("bitmapPresent")?;
        let offset_before_bitmap = if bitmap_present {
            if edition_number == 1 {
                msg.get_unsigned("offsetBeforeBitmap")?
            } else {
                msg.get_unsigned("offsetBSection6")?
            }
        } else {
            0
        };

        self.version = CURRENT_VERSION;
        self.edition_number = edition_number;
        self.binary_scale_factor = binary_scale_factor;
        self.decimal_scale_factor = decimal_scale_factor;
        self.binary_multiplier = crate::bitcodec::pow_long(2, binary_scale_factor);
        self.decimal_multiplier = crate::bitcodec::pow_long(10, -decimal_scale_factor);
        self.reference_value = reference_value;
        self.bits_per_value = bits_per_value;
        self.offset_before_data = offset_before_data;
        self.offset_before_bitmap = offset_before_bitmap;
        self.number_of_data_points = number_of_data_points;
        self.number_of_values = number_of_values;
        self.total_length = total_length;
        self.spherical_harmonics = spherical_harmonics;
        self.grid_hash = grid_hash;
        self.packing_type = packing_type;

        Ok(())
    }

    /// Records where this message begins within its containing stream.
    /// All subsequent reads performed by [`crate::extract`] add this
    /// offset.
    pub fn set_msg_start_offset(&mut self, offset: u64) {
        self.msg_start_offset = offset;
    }

    /// Whether a bitmap is present for this message.
    pub fn has_bitmap(&self) -> bool {
        self.offset_before_bitmap != 0
    }
}
