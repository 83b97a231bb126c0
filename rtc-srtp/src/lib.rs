#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod config;
pub mod option;
pub mod protection_profile;
pub mod session;
