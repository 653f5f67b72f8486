//! The metadata sidecar file format (component C4): a fixed-record binary
//! encoding of [`JumpInfo`], one record per GRIB message, with no index or
//! framing beyond the records themselves.
//!
//! Grounded on `original_source/src/metkit/gribjump/GribInfo.cc`'s
//! `toFile`/`fromFile`, which writes `sizeof(GribInfo)`'s worth of raw
//! struct bytes per message and checks a leading version byte on read.
//! Following that design, this format is host-native-endian and is meant
//! to be read back on the machine that wrote it (or one sharing its
//! endianness), not exchanged across architectures — fields are written
//! with [`u64::to_ne_bytes`]/friends rather than a portable wire codec.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::JumpError;
use crate::jumpinfo::{JumpInfo, CURRENT_VERSION};

/// Bytes reserved for the grid hash (an MD5 hex digest fits in 32).
pub const GRID_HASH_LEN: usize = 32;
/// Bytes reserved for the packing type string.
pub const PACKING_TYPE_LEN: usize = 16;

/// Total size in bytes of one on-disk record.
pub const RECORD_SIZE: usize = 1 // version
    + 8 * 3 // edition_number, binary_scale_factor, decimal_scale_factor
    + 8 * 3 // binary_multiplier, decimal_multiplier, reference_value
    + 8 * 7 // bits_per_value, offset_before_data, offset_before_bitmap,
            // number_of_data_points, number_of_values, total_length, msg_start_offset
    + 8 // spherical_harmonics
    + GRID_HASH_LEN
    + PACKING_TYPE_LEN;

fn pack_fixed(s: &str, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

fn unpack_fixed(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Writes a single [`JumpInfo`] record.
pub fn write_record<W: Write>(info: &JumpInfo, w: &mut W) -> Result<(), JumpError> {
    w.write_all(&[info.version])?;
    w.write_all(&info.edition_number.to_ne_bytes())?;
    w.write_all(&info.binary_scale_factor.to_ne_bytes())?;
    w.write_all(&info.decimal_scale_factor.to_ne_bytes())?;
    w.write_all(&info.binary_multiplier.to_ne_bytes())?;
    w.write_all(&info.decimal_multiplier.to_ne_bytes())?;
    w.write_all(&info.reference_value.to_ne_bytes())?;
    w.write_all(&info.bits_per_value.to_ne_bytes())?;
    w.write_all(&info.offset_before_data.to_ne_bytes())?;
    w.write_all(&info.offset_before_bitmap.to_ne_bytes())?;
    w.write_all(&info.number_of_data_points.to_ne_bytes())?;
    w.write_all(&info.number_of_values.to_ne_bytes())?;
    w.write_all(&info.total_length.to_ne_bytes())?;
    w.write_all(&info.msg_start_offset.to_ne_bytes())?;
    w.write_all(&info.spherical_harmonics.to_ne_bytes())?;
    w.write_all(&pack_fixed(&info.grid_hash, GRID_HASH_LEN))?;
    w.write_all(&pack_fixed(&info.packing_type, PACKING_TYPE_LEN))?;
    Ok(())
}

/// Reads a single [`JumpInfo`] record, rejecting anything not written by
/// the current [`CURRENT_VERSION`] of this format.
pub fn read_record<R: Read>(r: &mut R) -> Result<JumpInfo, JumpError> {
    let mut version = [0u8; 1];
    r.read_exact(&mut version)?;
    let version = version[0];
    if version != CURRENT_VERSION {
        return Err(JumpError::VersionMismatch {
            found: version,
            expected: CURRENT_VERSION,
        });
    }

    let mut i64_buf = [0u8; 8];
    let mut u64_buf = [0u8; 8];
    let mut f64_buf = [0u8; 8];

    let mut read_i64 = |r: &mut R| -> Result<i64, JumpError> {
        r.read_exact(&mut i64_buf)?;
        Ok(i64::from_ne_bytes(i64_buf))
    };
    let edition_number = read_i64(r)?;
    let binary_scale_factor = read_i64(r)?;
    let decimal_scale_factor = read_i64(r)?;

    let mut read_f64 = |r: &mut R| -> Result<f64, JumpError> {
        r.read_exact(&mut f64_buf)?;
        Ok(f64::from_ne_bytes(f64_buf))
    };
    let binary_multiplier = read_f64(r)?;
    let decimal_multiplier = read_f64(r)?;
    let reference_value = read_f64(r)?;

    let mut read_u64 = |r: &mut R| -> Result<u64, JumpError> {
        r.read_exact(&mut u64_buf)?;
        Ok(u64::from_ne_bytes(u64_buf))
    };
    let bits_per_value = read_u64(r)?;
    let offset_before_data = read_u64(r)?;
    let offset_before_bitmap = read_u64(r)?;
    let number_of_data_points = read_u64(r)?;
    let number_of_values = read_u64(r)?;
    let total_length = read_u64(r)?;
    let msg_start_offset = read_u64(r)?;

    let spherical_harmonics = read_i64(r)?;

    let mut grid_hash_buf = [0u8; GRID_HASH_LEN];
    r.read_exact(&mut grid_hash_buf)?;
    let mut packing_type_buf = [0u8; PACKING_TYPE_LEN];
    r.read_exact(&mut packing_type_buf)?;

    Ok(JumpInfo {
        version,
        edition_number,
        binary_scale_factor,
        decimal_scale_factor,
        binary_multiplier,
        decimal_multiplier,
        reference_value,
        bits_per_value,
        offset_before_data,
        offset_before_bitmap,
        number_of_data_points,
        number_of_values,
        total_length,
        msg_start_offset,
        spherical_harmonics,
        grid_hash: unpack_fixed(&grid_hash_buf),
        packing_type: unpack_fixed(&packing_type_buf),
    })
}

/// Writes every record in `infos` back to back.
pub fn write_all<W: Write>(infos: &[JumpInfo], w: &mut W) -> Result<(), JumpError> {
    for info in infos {
        write_record(info, w)?;
    }
    Ok(())
}

/// Reads records until the underlying reader is exhausted. A trailing
/// partial record (fewer than [`RECORD_SIZE`] bytes remaining) is
/// reported as [`JumpError::ShortRead`] rather than silently dropped.
pub fn read_all<R: Read>(r: &mut R) -> Result<Vec<JumpInfo>, JumpError> {
    let mut out = Vec::new();
    let mut lead = [0u8; 1];
    loop {
        let n = r.read(&mut lead)?;
        if n == 0 {
            break;
        }
        let mut rest = vec![0u8; RECORD_SIZE - 1];
        match r.read_exact(&mut rest) {
            Ok(()) => {}
            Err(_) => {
                return Err(JumpError::ShortRead {
                    expected: RECORD_SIZE,
                    actual: 1,
                })
            }
        }
        let mut record_bytes = Vec::with_capacity(RECORD_SIZE);
        record_bytes.push(lead[0]);
        record_bytes.extend_from_slice(&rest);
        out.push(read_record(&mut &record_bytes[..])?);
    }
    Ok(out)
}

/// Appends (or, if `append` is `false`, truncates the file and writes)
/// a single record at `path` (spec.md §4.4: `write(path, record, append)`).
pub fn write(path: impl AsRef<Path>, info: &JumpInfo, append: bool) -> Result<(), JumpError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    write_record(info, &mut file)
}

/// Reads the `msg_index`-th fixed-size record from `path` without any
/// index or framing beyond the caller-supplied ordinal (spec.md §4.4).
/// Fails with [`JumpError::Truncated`] if the record would run past the
/// end of the file.
pub fn read(path: impl AsRef<Path>, msg_index: u64) -> Result<JumpInfo, JumpError> {
    let mut file = std::fs::File::open(path)?;
    let offset = msg_index * RECORD_SIZE as u64;
    let file_len = file.metadata()?.len();
    if offset + RECORD_SIZE as u64 > file_len {
        return Err(JumpError::Truncated {
            needed: offset + RECORD_SIZE as u64,
            available: file_len,
        });
    }
    file.seek(SeekFrom::Start(offset))?;
    read_record(&mut file)
}
