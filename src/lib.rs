//! A read-only query layer over flattened device tree (FDT) blobs.
//!
//! Includes the following pieces:
//!
//! * [A zero-copy, validated view of a device tree image](blob)
//! * [An owning handle resolving nodes by path, alias, `compatible`
//!   string, or phandle, with libfdt style error reporting](fdt)
//! * [Heuristic classification of raw property bytes into strings and
//!   cells](value)
//!
//! ## Features
//!
//! This crate can be used without the standard library (`#![no_std]`) by disabling
//! the default `std` feature. To use `no-std` place the following in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies.fdt-query]
//! version = "x"
//! default-features = false
//! ```
//!
//! Without `std`, images can no longer be opened from a filesystem path.
//! The `alloc` feature alone keeps the owning handle and value
//! classification; with neither feature the zero-copy [`blob`] layer and
//! the [`error`] tables remain.
#![deny(clippy::all, clippy::cargo)]
#![allow(clippy::as_conversions)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate core;
extern crate endian_type_rs as endian_type;
#[macro_use]
extern crate memoffset;
#[macro_use]
extern crate static_assertions;

pub mod blob;
pub mod error;
pub mod prelude;
pub mod spec;

#[cfg(feature = "alloc")]
pub mod fdt;
#[cfg(feature = "alloc")]
pub mod value;

pub(crate) mod priv_util;
