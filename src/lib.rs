#![cfg_attr(docsrs, feature(doc_cfg))]

//! `metkit` — random-access GRIB range extraction ("GribJump") and the MARS
//! request symbolic algebra that drives request routing and matching.
//!
//! See `README.md` for a quick tour and `DESIGN.md`/`SPEC_FULL.md` for the
//! grounding ledger and full requirements this crate implements.

pub mod bitcodec;
pub mod byte_source;
mod error;
pub mod extract;
pub mod grib_to_request;
pub mod jumpinfo;
pub mod mars;
pub mod sidecar;

pub use crate::{
    byte_source::ByteSource,
    error::{JumpError, MarsError},
    extract::{extract_ranges, extract_value, Range},
    grib_to_request::grib_to_request,
    jumpinfo::{GribMessage, JumpInfo, CURRENT_VERSION, DEFAULT_MISSING_VALUE},
};

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
